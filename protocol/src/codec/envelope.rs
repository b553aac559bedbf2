//! Envelope encoding: the fields every transaction shares, plus dispatch
//! to the type's asset codec.

use tracing::debug;

use super::wire::{WireReader, WireWriter};
use super::CodecError;
use crate::config::{
    CORE_TYPE_GROUP, CURRENT_VERSION, LEGACY_VERSION, MAX_VENDOR_FIELD_LENGTH, WIRE_HEADER,
};
use crate::crypto::{sha256_hex, PublicKey, Signature};
use crate::registry::{TypeDescriptor, TypeRegistry};
use crate::transaction::address::Address;
use crate::transaction::builder::Transaction;
use crate::transaction::types::TypeKey;

/// Typical encoded size of a transfer; avoids regrowing the buffer for
/// the common case.
const ENVELOPE_CAPACITY: usize = 192;

/// Full wire encoding, signature included if present.
pub fn encode(tx: &Transaction, registry: &TypeRegistry) -> Result<Vec<u8>, CodecError> {
    let descriptor = registry.resolve(tx.key())?;
    write_envelope(tx, &descriptor, true)
}

/// The bytes a signature covers: the encoding with the signature section
/// left off entirely.
pub fn signing_bytes(tx: &Transaction, registry: &TypeRegistry) -> Result<Vec<u8>, CodecError> {
    let descriptor = registry.resolve(tx.key())?;
    write_envelope(tx, &descriptor, false)
}

/// Hex SHA-256 of the full encoding.
pub fn transaction_id(tx: &Transaction, registry: &TypeRegistry) -> Result<String, CodecError> {
    encode(tx, registry).map(|bytes| sha256_hex(&bytes))
}

fn write_envelope(
    tx: &Transaction,
    descriptor: &TypeDescriptor,
    include_signature: bool,
) -> Result<Vec<u8>, CodecError> {
    if !descriptor.supports_version(tx.version) {
        return Err(CodecError::UnsupportedVersion(tx.version));
    }

    let mut out = WireWriter::with_capacity(ENVELOPE_CAPACITY);
    out.put_u8(WIRE_HEADER);
    out.put_u8(tx.version);

    match tx.version {
        CURRENT_VERSION => {
            if tx.timestamp.is_some() {
                return Err(CodecError::FieldOutsideLayout {
                    field: "timestamp",
                    version: tx.version,
                });
            }
            out.put_u16(tx.tx_type);
            out.put_u32(tx.type_group);
            // An absent nonce encodes as zero.
            out.put_u64(tx.nonce.unwrap_or_default());
        }
        LEGACY_VERSION => {
            if tx.nonce.is_some() {
                return Err(CodecError::FieldOutsideLayout {
                    field: "nonce",
                    version: tx.version,
                });
            }
            if tx.type_group != CORE_TYPE_GROUP {
                return Err(CodecError::UnknownDiscriminator {
                    field: "typeGroup",
                    value: u64::from(tx.type_group),
                });
            }
            let tx_type = u8::try_from(tx.tx_type).map_err(|_| CodecError::UnknownDiscriminator {
                field: "type",
                value: u64::from(tx.tx_type),
            })?;
            out.put_u8(tx_type);
            out.put_u32(tx.timestamp.unwrap_or_default());
        }
        other => return Err(CodecError::UnsupportedVersion(other)),
    }

    out.put_u64(tx.amount);
    out.put_u64(tx.fee);
    out.put_bytes(tx.sender_public_key.as_bytes());

    // A zero length prefix means no memo, so an empty one has no encoding.
    match tx.vendor_field.as_deref() {
        Some("") => {
            return Err(CodecError::BadLengthPrefix {
                field: "vendorField",
                length: 0,
            })
        }
        Some(memo) => out.put_prefixed("vendorField", memo.as_bytes())?,
        None => out.put_u8(0),
    }

    descriptor
        .handler()
        .encode_asset(tx.asset.as_ref(), &mut out)?;

    match &tx.recipient_id {
        Some(address) => {
            out.put_u8(1);
            out.put_bytes(address.as_bytes());
        }
        None => out.put_u8(0),
    }

    if include_signature {
        match &tx.signature {
            Some(signature) => {
                out.put_u8(1);
                out.put_bytes(signature.as_bytes());
            }
            None => out.put_u8(0),
        }
    }

    Ok(out.into_vec())
}

/// Decodes one transaction occupying the whole of `bytes`.
///
/// The type is resolved as soon as the envelope prefix has been read, and
/// its handler decodes the asset in place. `id` is set for signed
/// transactions only.
pub fn decode(bytes: &[u8], registry: &TypeRegistry) -> Result<Transaction, CodecError> {
    let mut r = WireReader::new(bytes);

    let header = r.u8()?;
    if header != WIRE_HEADER {
        return Err(CodecError::UnknownDiscriminator {
            field: "header",
            value: u64::from(header),
        });
    }

    let version = r.u8()?;
    let (key, nonce, timestamp) = match version {
        CURRENT_VERSION => {
            let tx_type = r.u16()?;
            let type_group = r.u32()?;
            let nonce = r.u64()?;
            (TypeKey::new(type_group, tx_type), Some(nonce), None)
        }
        LEGACY_VERSION => {
            let tx_type = r.u8()?;
            let timestamp = r.u32()?;
            (
                TypeKey::new(CORE_TYPE_GROUP, u16::from(tx_type)),
                None,
                Some(timestamp),
            )
        }
        other => return Err(CodecError::UnsupportedVersion(other)),
    };

    let descriptor = registry.resolve(key)?;
    if !descriptor.supports_version(version) {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let amount = r.u64()?;
    let fee = r.u64()?;
    let sender_public_key = PublicKey::from_bytes(r.array()?);

    let memo = r.prefixed("vendorField", 0, MAX_VENDOR_FIELD_LENGTH)?;
    let vendor_field = if memo.is_empty() {
        None
    } else {
        let text = std::str::from_utf8(memo)
            .map_err(|_| CodecError::InvalidUtf8 { field: "vendorField" })?;
        Some(text.to_string())
    };

    let asset = descriptor.handler().decode_asset(&mut r)?;

    let recipient_id = if r.flag("recipient")? {
        Some(Address::from_bytes(r.array()?))
    } else {
        None
    };
    let signature = if r.flag("signature")? {
        Some(Signature::from_bytes(r.array()?))
    } else {
        None
    };
    r.finish()?;

    debug!(%key, version, len = bytes.len(), "decoded transaction");

    Ok(Transaction {
        id: signature.is_some().then(|| sha256_hex(bytes)),
        version,
        type_group: key.type_group,
        tx_type: key.tx_type,
        nonce,
        timestamp,
        amount,
        fee,
        sender_public_key,
        recipient_id,
        vendor_field,
        asset,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEVNET_PUB_KEY_HASH;
    use crate::crypto::Keypair;
    use crate::registry::RegistryError;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::signing::sign_transaction;
    use crate::transaction::types::CoreType;

    fn registry() -> TypeRegistry {
        TypeRegistry::new().unwrap()
    }

    fn keypair() -> Keypair {
        Keypair::from_secret_bytes(&[5; 32]).unwrap()
    }

    fn transfer(registry: &TypeRegistry) -> Transaction {
        let kp = keypair();
        let to = Address::from_public_key(&kp.public_key(), DEVNET_PUB_KEY_HASH);
        TransactionBuilder::new(registry, CoreType::Transfer.key(), kp.public_key())
            .unwrap()
            .nonce(9)
            .amount(250_000)
            .fee(10_000_000)
            .recipient(to)
            .vendor_field("rent")
            .build()
            .unwrap()
    }

    #[test]
    fn signed_transfer_survives_the_wire() {
        let registry = registry();
        let mut tx = transfer(&registry);
        sign_transaction(&mut tx, &keypair(), &registry).unwrap();

        let bytes = encode(&tx, &registry).unwrap();
        assert_eq!(&bytes[..2], &[WIRE_HEADER, CURRENT_VERSION]);

        let decoded = decode(&bytes, &registry).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.id.as_deref(), Some(sha256_hex(&bytes).as_str()));
    }

    #[test]
    fn unsigned_decode_has_no_id() {
        let registry = registry();
        let tx = transfer(&registry);
        let decoded = decode(&encode(&tx, &registry).unwrap(), &registry).unwrap();
        assert_eq!(decoded.id, None);
        assert_eq!(decoded.signature, None);
        assert_eq!(decoded.nonce, Some(9));
    }

    #[test]
    fn signing_bytes_are_the_encoding_minus_signature() {
        let registry = registry();
        let mut tx = transfer(&registry);
        sign_transaction(&mut tx, &keypair(), &registry).unwrap();

        let signing = signing_bytes(&tx, &registry).unwrap();
        let full = encode(&tx, &registry).unwrap();
        assert_eq!(&full[..signing.len()], signing.as_slice());
        assert_eq!(full[signing.len()], 1);
        assert_eq!(full.len(), signing.len() + 1 + 64);
    }

    #[test]
    fn legacy_vote_uses_narrow_type_and_timestamp() {
        let registry = registry();
        let kp = keypair();
        let delegate = Keypair::from_secret_bytes(&[6; 32]).unwrap().public_key();
        let tx = TransactionBuilder::new(&registry, CoreType::Vote.key(), kp.public_key())
            .unwrap()
            .version(LEGACY_VERSION)
            .timestamp(77)
            .vote(delegate)
            .build()
            .unwrap();

        let bytes = encode(&tx, &registry).unwrap();
        assert_eq!(bytes[1], LEGACY_VERSION);
        assert_eq!(bytes[2], 3);
        assert_eq!(&bytes[3..7], &77u32.to_le_bytes());

        let decoded = decode(&bytes, &registry).unwrap();
        assert_eq!(decoded.timestamp, Some(77));
        assert_eq!(decoded.nonce, None);
        assert_eq!(decoded.asset, tx.asset);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let registry = registry();
        let mut bytes = encode(&transfer(&registry), &registry).unwrap();
        bytes.push(0);
        assert_eq!(decode(&bytes, &registry), Err(CodecError::TrailingBytes(1)));
    }

    #[test]
    fn truncation_is_reported_not_panicked() {
        let registry = registry();
        let bytes = encode(&transfer(&registry), &registry).unwrap();
        for len in 0..bytes.len() {
            assert!(decode(&bytes[..len], &registry).is_err(), "prefix of {} decoded", len);
        }
    }

    #[test]
    fn bad_header_and_version() {
        let registry = registry();
        let mut bytes = encode(&transfer(&registry), &registry).unwrap();

        bytes[1] = 9;
        assert_eq!(decode(&bytes, &registry), Err(CodecError::UnsupportedVersion(9)));

        bytes[0] = 0xfe;
        assert!(matches!(
            decode(&bytes, &registry),
            Err(CodecError::UnknownDiscriminator { field: "header", value: 0xfe })
        ));
    }

    #[test]
    fn unregistered_type_fails_resolution() {
        let registry = registry();
        let mut bytes = encode(&transfer(&registry), &registry).unwrap();
        bytes[2] = 99;
        assert_eq!(
            decode(&bytes, &registry),
            Err(CodecError::Registry(RegistryError::UnknownType(TypeKey::new(1, 99))))
        );
    }

    #[test]
    fn non_utf8_memo_is_rejected() {
        let registry = registry();
        let tx = transfer(&registry);
        let mut bytes = encode(&tx, &registry).unwrap();
        // header, version, type, group, nonce, amount, fee, key, then the memo length
        let memo_at = 2 + 2 + 4 + 8 + 8 + 8 + 33 + 1;
        bytes[memo_at] = 0xff;
        assert_eq!(
            decode(&bytes, &registry),
            Err(CodecError::InvalidUtf8 { field: "vendorField" })
        );
    }

    #[test]
    fn legacy_layout_refuses_late_types() {
        let registry = registry();
        let mut tx = transfer(&registry);
        tx.tx_type = CoreType::Ipfs.type_id();
        tx.recipient_id = None;
        tx.version = LEGACY_VERSION;
        assert_eq!(
            encode(&tx, &registry),
            Err(CodecError::UnsupportedVersion(LEGACY_VERSION))
        );
    }

    #[test]
    fn empty_memo_has_no_encoding() {
        let registry = registry();
        let mut tx = transfer(&registry);
        tx.vendor_field = Some(String::new());
        assert_eq!(
            encode(&tx, &registry),
            Err(CodecError::BadLengthPrefix {
                field: "vendorField",
                length: 0
            })
        );
    }

    #[test]
    fn counters_of_the_other_layout_are_refused() {
        let registry = registry();
        let mut tx = transfer(&registry);
        tx.timestamp = Some(42);
        assert_eq!(
            encode(&tx, &registry),
            Err(CodecError::FieldOutsideLayout {
                field: "timestamp",
                version: CURRENT_VERSION
            })
        );

        tx.version = LEGACY_VERSION;
        assert_eq!(
            signing_bytes(&tx, &registry),
            Err(CodecError::FieldOutsideLayout {
                field: "nonce",
                version: LEGACY_VERSION
            })
        );
    }
}
