//! Transaction verification: schema, fee policy, network, and signature.
//!
//! Every transaction entering the pool or proposed in a block must pass
//! [`verify_transaction`]. Structural checks run first and report every
//! violation together; the signature is checked last because it is the
//! most expensive.

use thiserror::Error;
use tracing::warn;

use super::address::Address;
use super::asset::Asset;
use super::builder::Transaction;
use super::types::TypeKey;
use crate::codec::{self, CodecError};
use crate::config::NetworkConfig;
use crate::crypto::PublicKey;
use crate::milestone::MilestoneSource;
use crate::registry::{RegistryError, TypeRegistry};
use crate::schema::ValidationErrors;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a transaction was rejected.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Every schema, fee-policy, and type-specific violation found.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("transaction type {key} has no wire version {version}")]
    UnsupportedVersion { key: TypeKey, version: u8 },

    /// The stored id does not hash from the transaction's encoding.
    #[error("transaction ID mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: String, actual: String },

    #[error("transaction is unsigned")]
    MissingSignature,

    /// The signature does not verify against the sender's public key.
    #[error("invalid signature: does not verify against sender {sender}")]
    InvalidSignature { sender: PublicKey },

    /// An address in the transaction was minted for another network.
    #[error("address {address} has network byte {found:#04x}, expected {expected:#04x}")]
    WrongNetwork {
        address: Address,
        expected: u8,
        found: u8,
    },

    #[error("could not render transaction as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verifies a signed transaction against the network state at `height`.
///
/// The checks, in order:
///
/// 1. **Type**: `(typeGroup, type)` must resolve in `registry`.
/// 2. **Version**: the type must have a layout for the transaction's version.
/// 3. **Schema and fee**: merged schema, fee policy, and the type's own
///    checks, all against a single milestone snapshot for `height`.
/// 4. **Network**: every address must carry `network.pub_key_hash`.
/// 5. **Signature present**.
/// 6. **Id**: if set, must equal the hash of the full encoding.
/// 7. **Signature valid**: secp256k1 over the signing bytes.
pub fn verify_transaction(
    tx: &Transaction,
    registry: &TypeRegistry,
    network: &NetworkConfig,
    height: u64,
) -> Result<(), TransactionError> {
    let result = verify_inner(tx, registry, network, height);
    if let Err(error) = &result {
        warn!(key = %tx.key(), height, %error, "rejected transaction");
    }
    result
}

fn verify_inner(
    tx: &Transaction,
    registry: &TypeRegistry,
    network: &NetworkConfig,
    height: u64,
) -> Result<(), TransactionError> {
    let key = tx.key();
    let descriptor = registry.resolve(key)?;
    if !descriptor.supports_version(tx.version) {
        return Err(TransactionError::UnsupportedVersion {
            key,
            version: tx.version,
        });
    }

    let milestone = network.milestone_at(height);
    descriptor.validate(&tx.to_json()?, &milestone)?;

    for address in addresses(tx) {
        if address.network() != network.pub_key_hash {
            return Err(TransactionError::WrongNetwork {
                address,
                expected: network.pub_key_hash,
                found: address.network(),
            });
        }
    }

    let signature = tx.signature.ok_or(TransactionError::MissingSignature)?;

    if let Some(actual) = &tx.id {
        let expected = codec::transaction_id(tx, registry)?;
        if *actual != expected {
            return Err(TransactionError::IdMismatch {
                expected,
                actual: actual.clone(),
            });
        }
    }

    let message = codec::signing_bytes(tx, registry)?;
    if !tx.sender_public_key.verify(&message, &signature) {
        return Err(TransactionError::InvalidSignature {
            sender: tx.sender_public_key,
        });
    }
    Ok(())
}

/// Every address the transaction pays into.
fn addresses(tx: &Transaction) -> Vec<Address> {
    let mut out: Vec<Address> = tx.recipient_id.into_iter().collect();
    if let Some(Asset::MultiPayment { payments }) = &tx.asset {
        out.extend(payments.iter().map(|p| p.recipient_id));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
