//! Schemas, asset codecs, and extra checks for the core transaction types.
//!
//! Core types are dispatched with a `match` on [`CoreType`] rather than
//! through the registry's trait objects. All of them are priced from the
//! milestone fee table.

use primitive_types::U256;
use serde_json::{json, Value};

use super::address::Address;
use super::amount::parse_units;
use super::asset::{Asset, ContentHash, DelegateAsset, Payment, SecondSignatureAsset, VoteEntry};
use super::types::CoreType;
use crate::codec::{CodecError, WireReader, WireWriter};
use crate::config::{
    ADDRESS_LENGTH, CORE_TYPE_GROUP, CURRENT_VERSION, LEGACY_VERSION, MAX_CONTENT_HASH_LENGTH,
    MAX_MULTI_PAYMENTS, MAX_USERNAME_LENGTH, MAX_VOTES, MIN_CONTENT_HASH_LENGTH,
    MIN_MULTI_PAYMENTS, PUBLIC_KEY_LENGTH,
};
use crate::crypto::PublicKey;
use crate::milestone::Milestone;
use crate::registry::FeePolicy;
use crate::schema::{Rule, Schema, SchemaViolation};

impl CoreType {
    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy::Milestone
    }

    /// Types introduced together with typeGroups have no legacy layout.
    pub fn supports_version(&self, version: u8) -> bool {
        match self {
            Self::Ipfs | Self::MultiPayment | Self::DelegateResignation => {
                version == CURRENT_VERSION
            }
            _ => version == CURRENT_VERSION || version == LEGACY_VERSION,
        }
    }

    pub fn schema(&self) -> Schema {
        let fragment = Schema::new()
            .required("type", Rule::Const(json!(self.type_id())))
            .optional("typeGroup", Rule::Const(json!(CORE_TYPE_GROUP)));

        match self {
            Self::Transfer => fragment
                .required("amount", Rule::amount_at_least(1))
                .require("recipientId"),
            Self::SecondSignature => fragment
                .required("amount", Rule::zero_amount())
                .required(
                    "asset",
                    object("signature", object("publicKey", Rule::PublicKey)),
                ),
            Self::DelegateRegistration => fragment
                .required("amount", Rule::zero_amount())
                .required(
                    "asset",
                    object(
                        "delegate",
                        object(
                            "username",
                            Rule::Username {
                                max_len: MAX_USERNAME_LENGTH,
                            },
                        ),
                    ),
                ),
            Self::Vote => fragment.required("amount", Rule::zero_amount()).required(
                "asset",
                object(
                    "votes",
                    Rule::Array {
                        items: Box::new(Rule::VoteEntry),
                        min_items: 1,
                        max_items: MAX_VOTES,
                        unique: true,
                    },
                ),
            ),
            Self::Ipfs => fragment.required("amount", Rule::zero_amount()).required(
                "asset",
                object(
                    "ipfs",
                    Rule::Base58 {
                        min_bytes: MIN_CONTENT_HASH_LENGTH,
                        max_bytes: MAX_CONTENT_HASH_LENGTH,
                    },
                ),
            ),
            Self::MultiPayment => fragment.required("amount", Rule::zero_amount()).required(
                "asset",
                object(
                    "payments",
                    Rule::Array {
                        items: Box::new(Rule::Object(
                            Schema::new()
                                .required("amount", Rule::amount_at_least(1))
                                .required("recipientId", Rule::Address),
                        )),
                        min_items: MIN_MULTI_PAYMENTS,
                        max_items: MAX_MULTI_PAYMENTS,
                        unique: false,
                    },
                ),
            ),
            Self::DelegateResignation => fragment.required("amount", Rule::zero_amount()),
        }
    }

    pub fn validate_with(&self, candidate: &Value, _milestone: &Milestone) -> Vec<SchemaViolation> {
        let mut out = Vec::new();
        match self {
            Self::Vote => {
                let votes = asset_array(candidate, "votes");
                let casts = votes
                    .iter()
                    .filter(|v| v.as_str().is_some_and(|s| s.starts_with('+')))
                    .count();
                let withdrawals = votes
                    .iter()
                    .filter(|v| v.as_str().is_some_and(|s| s.starts_with('-')))
                    .count();
                if casts > 1 || withdrawals > 1 {
                    out.push(SchemaViolation::new("asset.votes", "singleVote"));
                }
            }
            Self::MultiPayment => {
                let total = asset_array(candidate, "payments")
                    .iter()
                    .filter_map(|p| p.get("amount").map(parse_units))
                    .filter_map(Result::ok)
                    .try_fold(U256::zero(), |acc, a| acc.checked_add(a));
                if total.map_or(true, |t| t > U256::from(u64::MAX)) {
                    out.push(SchemaViolation::new("asset.payments", "totalOverflow"));
                }
            }
            _ => {}
        }
        out
    }

    pub fn encode_asset(&self, asset: Option<&Asset>, out: &mut WireWriter) -> Result<(), CodecError> {
        match (self, asset) {
            (Self::Transfer | Self::DelegateResignation, None) => Ok(()),
            (Self::SecondSignature, Some(Asset::SecondSignature { signature })) => {
                out.put_bytes(signature.public_key.as_bytes());
                Ok(())
            }
            (Self::DelegateRegistration, Some(Asset::DelegateRegistration { delegate })) => {
                out.put_prefixed("username", delegate.username.as_bytes())
            }
            (Self::Vote, Some(Asset::Vote { votes })) => {
                let count = u8::try_from(votes.len()).map_err(|_| CodecError::BadLengthPrefix {
                    field: "votes",
                    length: votes.len(),
                })?;
                out.put_u8(count);
                for vote in votes {
                    vote.write(out);
                }
                Ok(())
            }
            (Self::Ipfs, Some(Asset::Ipfs { ipfs })) => ipfs.write("ipfs", out),
            (Self::MultiPayment, Some(Asset::MultiPayment { payments })) => {
                let count =
                    u16::try_from(payments.len()).map_err(|_| CodecError::BadLengthPrefix {
                        field: "payments",
                        length: payments.len(),
                    })?;
                out.put_u16(count);
                for payment in payments {
                    out.put_u64(payment.amount);
                    out.put_bytes(payment.recipient_id.as_bytes());
                }
                Ok(())
            }
            _ => Err(CodecError::AssetMismatch {
                expected: self.name().to_string(),
            }),
        }
    }

    pub fn decode_asset(&self, reader: &mut WireReader<'_>) -> Result<Option<Asset>, CodecError> {
        let asset = match self {
            Self::Transfer | Self::DelegateResignation => return Ok(None),
            Self::SecondSignature => Asset::SecondSignature {
                signature: SecondSignatureAsset {
                    public_key: PublicKey::from_bytes(reader.array::<PUBLIC_KEY_LENGTH>()?),
                },
            },
            Self::DelegateRegistration => {
                let raw = reader.prefixed("username", 1, MAX_USERNAME_LENGTH)?;
                let username = std::str::from_utf8(raw)
                    .map_err(|_| CodecError::InvalidUtf8 { field: "username" })?;
                Asset::DelegateRegistration {
                    delegate: DelegateAsset {
                        username: username.to_string(),
                    },
                }
            }
            Self::Vote => {
                let count = usize::from(reader.u8()?);
                if count == 0 || count > MAX_VOTES {
                    return Err(CodecError::BadLengthPrefix {
                        field: "votes",
                        length: count,
                    });
                }
                let votes = (0..count)
                    .map(|_| VoteEntry::read(reader))
                    .collect::<Result<Vec<_>, _>>()?;
                Asset::Vote { votes }
            }
            Self::Ipfs => Asset::Ipfs {
                ipfs: ContentHash::read("ipfs", reader)?,
            },
            Self::MultiPayment => {
                let count = usize::from(reader.u16()?);
                if !(MIN_MULTI_PAYMENTS..=MAX_MULTI_PAYMENTS).contains(&count) {
                    return Err(CodecError::BadLengthPrefix {
                        field: "payments",
                        length: count,
                    });
                }
                let mut payments = Vec::with_capacity(count);
                for _ in 0..count {
                    let amount = reader.u64()?;
                    let recipient_id = Address::from_bytes(reader.array::<ADDRESS_LENGTH>()?);
                    payments.push(Payment {
                        amount,
                        recipient_id,
                    });
                }
                Asset::MultiPayment { payments }
            }
        };
        Ok(Some(asset))
    }
}

fn object(name: &str, rule: Rule) -> Rule {
    Rule::Object(Schema::new().required(name, rule))
}

fn asset_array<'a>(candidate: &'a Value, name: &str) -> &'a [Value] {
    candidate
        .get("asset")
        .and_then(|a| a.get(name))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEVNET_PUB_KEY_HASH;
    use crate::crypto::Keypair;

    fn pk(seed: u8) -> PublicKey {
        Keypair::from_secret_bytes(&[seed; 32]).unwrap().public_key()
    }

    fn roundtrip(core: CoreType, asset: Option<Asset>) {
        let mut w = WireWriter::new();
        core.encode_asset(asset.as_ref(), &mut w).unwrap();
        let bytes = w.into_vec();
        let mut r = WireReader::new(&bytes);
        assert_eq!(core.decode_asset(&mut r).unwrap(), asset);
        r.finish().unwrap();
    }

    #[test]
    fn every_core_asset_roundtrips() {
        let address = Address::from_public_key(&pk(3), DEVNET_PUB_KEY_HASH);
        roundtrip(CoreType::Transfer, None);
        roundtrip(CoreType::DelegateResignation, None);
        roundtrip(
            CoreType::SecondSignature,
            Some(Asset::SecondSignature {
                signature: SecondSignatureAsset { public_key: pk(1) },
            }),
        );
        roundtrip(
            CoreType::DelegateRegistration,
            Some(Asset::DelegateRegistration {
                delegate: DelegateAsset {
                    username: "genesis_7".to_string(),
                },
            }),
        );
        roundtrip(
            CoreType::Vote,
            Some(Asset::Vote {
                votes: vec![VoteEntry::Unvote(pk(1)), VoteEntry::Vote(pk(2))],
            }),
        );
        roundtrip(
            CoreType::Ipfs,
            Some(Asset::Ipfs {
                ipfs: ContentHash::new(vec![0x12, 0x20, 0, 1, 2, 3]),
            }),
        );
        roundtrip(
            CoreType::MultiPayment,
            Some(Asset::MultiPayment {
                payments: vec![
                    Payment {
                        amount: 1,
                        recipient_id: address,
                    },
                    Payment {
                        amount: u64::MAX,
                        recipient_id: address,
                    },
                ],
            }),
        );
    }

    #[test]
    fn wrong_asset_for_type_is_a_mismatch() {
        let asset = Asset::Ipfs {
            ipfs: ContentHash::new(vec![1, 2]),
        };
        let err = CoreType::Vote
            .encode_asset(Some(&asset), &mut WireWriter::new())
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::AssetMismatch {
                expected: "vote".to_string()
            }
        );
        assert!(CoreType::Transfer
            .encode_asset(Some(&asset), &mut WireWriter::new())
            .is_err());
    }

    #[test]
    fn vote_count_outside_bounds_is_rejected() {
        let mut r = WireReader::new(&[3]);
        assert!(matches!(
            CoreType::Vote.decode_asset(&mut r),
            Err(CodecError::BadLengthPrefix { field: "votes", length: 3 })
        ));
    }

    #[test]
    fn single_recipient_multi_payment_is_rejected_on_decode() {
        let mut r = WireReader::new(&[1, 0]);
        assert!(matches!(
            CoreType::MultiPayment.decode_asset(&mut r),
            Err(CodecError::BadLengthPrefix { field: "payments", length: 1 })
        ));
    }

    #[test]
    fn username_must_be_utf8() {
        let mut r = WireReader::new(&[2, 0xff, 0xfe]);
        assert_eq!(
            CoreType::DelegateRegistration.decode_asset(&mut r).unwrap_err(),
            CodecError::InvalidUtf8 { field: "username" }
        );
    }

    #[test]
    fn two_casts_in_one_vote_are_rejected() {
        let candidate = json!({
            "asset": { "votes": [format!("+{}", pk(1)), format!("+{}", pk(2))] }
        });
        let v = CoreType::Vote.validate_with(&candidate, &Milestone::devnet_genesis());
        assert_eq!(v, vec![SchemaViolation::new("asset.votes", "singleVote")]);
    }

    #[test]
    fn multi_payment_total_must_fit_u64() {
        let candidate = json!({
            "asset": { "payments": [
                { "amount": u64::MAX.to_string() },
                { "amount": "1" },
            ] }
        });
        let v = CoreType::MultiPayment.validate_with(&candidate, &Milestone::devnet_genesis());
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn late_core_types_have_no_legacy_layout() {
        assert!(CoreType::Transfer.supports_version(LEGACY_VERSION));
        assert!(!CoreType::MultiPayment.supports_version(LEGACY_VERSION));
        assert!(CoreType::MultiPayment.supports_version(CURRENT_VERSION));
    }
}
