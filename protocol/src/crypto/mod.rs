//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers over audited implementations:
//!
//! - **SHA-256** for transaction ids and signing digests.
//! - **secp256k1 ECDSA** (compressed 33-byte keys, compact 64-byte
//!   signatures) for sender authentication.
//!
//! Nothing here is clever on purpose.

pub mod hash;
pub mod keys;

pub use hash::{sha256, sha256_array, sha256_hex};
pub use keys::{KeyError, Keypair, PublicKey, Signature};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

/// Hex-encodes fixed-size byte arrays for JSON.
pub(crate) fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// Decodes a hex string of exactly `N` bytes.
pub(crate) fn decode_hex_array<const N: usize>(text: &str) -> Result<[u8; N], String> {
    let bytes = hex::decode(text).map_err(|e| format!("invalid hex: {}", e))?;
    <[u8; N]>::try_from(bytes.as_slice())
        .map_err(|_| format!("expected {} bytes, got {}", N, bytes.len()))
}

pub(crate) fn deserialize_hex<'de, D: Deserializer<'de>, const N: usize>(
    deserializer: D,
) -> Result<[u8; N], D::Error> {
    let text = String::deserialize(deserializer)?;
    decode_hex_array::<N>(&text).map_err(D::Error::custom)
}
