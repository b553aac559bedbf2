//! # Hashing Utilities
//!
//! SHA-256, and nothing else. Transaction ids are the hex digest of the full
//! wire encoding; signatures cover the digest of the encoding without the
//! signature itself.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data as a `Vec<u8>`.
///
/// # Example
///
/// ```
/// use stakeweave_protocol::crypto::sha256;
///
/// let hash = sha256(b"stakeweave");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Vec<u8> {
    sha256_array(data).to_vec()
}

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex SHA-256 digest. This is the transaction id format.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_array(data))
}
