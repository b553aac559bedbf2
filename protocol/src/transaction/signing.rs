//! Transaction signing with secp256k1 keypairs.
//!
//! Signing is a separate step from building because the keypair may not
//! be available at construction time (hardware wallet, remote signer).
//! The signed message is the wire encoding without the signature section,
//! see [`crate::codec::signing_bytes`].

use super::builder::Transaction;
use super::verification::TransactionError;
use crate::codec;
use crate::crypto::Keypair;
use crate::registry::TypeRegistry;

/// Signs a transaction in place.
///
/// 1. Sets `sender_public_key` to the keypair's public key.
/// 2. Signs the signing bytes and stores the signature.
/// 3. Sets `id` to the hash of the now complete encoding.
///
/// Re-signing overwrites the previous signature and id.
///
/// # Errors
///
/// Fails if the type is not registered or the transaction cannot be
/// encoded (for example, its asset belongs to another type).
pub fn sign_transaction<'a>(
    tx: &'a mut Transaction,
    keypair: &Keypair,
    registry: &TypeRegistry,
) -> Result<&'a Transaction, TransactionError> {
    tx.sender_public_key = keypair.public_key();
    tx.signature = None;
    tx.id = None;

    let message = codec::signing_bytes(tx, registry)?;
    tx.signature = Some(keypair.sign(&message));
    tx.id = Some(codec::transaction_id(tx, registry)?);
    Ok(tx)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEVNET_PUB_KEY_HASH;
    use crate::transaction::address::Address;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::types::CoreType;

    fn unsigned(registry: &TypeRegistry, keypair: &Keypair) -> Transaction {
        let to = Address::from_public_key(&keypair.public_key(), DEVNET_PUB_KEY_HASH);
        TransactionBuilder::new(registry, CoreType::Transfer.key(), keypair.public_key())
            .unwrap()
            .amount(500)
            .recipient(to)
            .build()
            .unwrap()
    }

    #[test]
    fn sign_sets_signature_and_id() {
        let registry = TypeRegistry::new().unwrap();
        let kp = Keypair::from_secret_bytes(&[3; 32]).unwrap();
        let mut tx = unsigned(&registry, &kp);
        assert!(!tx.is_signed());

        sign_transaction(&mut tx, &kp, &registry).unwrap();
        assert!(tx.is_signed());
        assert_eq!(tx.id.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn signature_verifies_over_signing_bytes() {
        let registry = TypeRegistry::new().unwrap();
        let kp = Keypair::from_secret_bytes(&[3; 32]).unwrap();
        let mut tx = unsigned(&registry, &kp);
        sign_transaction(&mut tx, &kp, &registry).unwrap();

        let message = codec::signing_bytes(&tx, &registry).unwrap();
        assert!(kp.public_key().verify(&message, tx.signature.as_ref().unwrap()));
    }

    #[test]
    fn signing_replaces_sender_key() {
        let registry = TypeRegistry::new().unwrap();
        let builder_key = Keypair::from_secret_bytes(&[3; 32]).unwrap();
        let signer = Keypair::from_secret_bytes(&[4; 32]).unwrap();
        let mut tx = unsigned(&registry, &builder_key);
        sign_transaction(&mut tx, &signer, &registry).unwrap();
        assert_eq!(tx.sender_public_key, signer.public_key());
    }

    #[test]
    fn resigning_is_deterministic() {
        let registry = TypeRegistry::new().unwrap();
        let kp = Keypair::from_secret_bytes(&[3; 32]).unwrap();
        let mut a = unsigned(&registry, &kp);
        let mut b = a.clone();
        sign_transaction(&mut a, &kp, &registry).unwrap();
        sign_transaction(&mut b, &kp, &registry).unwrap();
        sign_transaction(&mut b, &kp, &registry).unwrap();
        assert_eq!(a, b);
    }
}
