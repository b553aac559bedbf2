//! # Key Management
//!
//! secp256k1 keypairs, compressed public keys, and compact signatures.
//!
//! Transactions carry the sender's 33-byte compressed public key and,
//! once signed, a 64-byte `r || s` ECDSA signature over the SHA-256 digest
//! of the unsigned encoding. Signing lives here so that tests and external
//! signers share one implementation; the transaction builder never signs.
//!
//! Key bytes are never logged. `Keypair`'s `Debug` prints the public half only.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::{decode_hex_array, deserialize_hex, serialize_hex};
use crate::config::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Errors that can occur during key operations.
///
/// Deliberately vague about why secret material was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// A compressed secp256k1 public key as it appears on the wire.
///
/// Construction from raw bytes does not check that the point is on the
/// curve; the wire codec must be able to carry whatever a peer sent so the
/// validator can report it. [`PublicKey::verify`] and
/// [`PublicKey::is_valid_point`] do the full check.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn from_hex(text: &str) -> Result<Self, KeyError> {
        decode_hex_array::<PUBLIC_KEY_LENGTH>(text)
            .map(Self)
            .map_err(KeyError::InvalidPublicKey)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// `true` if the bytes decode to a point on the curve.
    pub fn is_valid_point(&self) -> bool {
        VerifyingKey::from_sec1_bytes(&self.0).is_ok()
    }

    /// Verifies a compact ECDSA signature over `message` (hashed with
    /// SHA-256 internally). Invalid keys and signatures simply fail.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = VerifyingKey::from_sec1_bytes(&self.0) else {
            return false;
        };
        let Ok(sig) = EcdsaSignature::from_slice(&signature.0) else {
            return false;
        };
        key.verify(message, &sig).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_hex::<D, PUBLIC_KEY_LENGTH>(deserializer).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A compact 64-byte ECDSA signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_LENGTH]);

impl Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn from_hex(text: &str) -> Result<Self, KeyError> {
        decode_hex_array::<SIGNATURE_LENGTH>(text)
            .map(Self)
            .map_err(KeyError::InvalidSignature)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_hex::<D, SIGNATURE_LENGTH>(deserializer).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// A secp256k1 signing key with its derived public key.
///
/// Intentionally not `Serialize`. Exporting secret material should be a
/// deliberate call, not a side effect of logging a struct.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Reconstructs a keypair from a 32-byte secret scalar.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Result<Self, KeyError> {
        SigningKey::from_slice(secret)
            .map(|signing_key| Self { signing_key })
            .map_err(|_| KeyError::InvalidSecretKey)
    }

    /// Hex-encoded variant of [`Keypair::from_secret_bytes`].
    pub fn from_hex(text: &str) -> Result<Self, KeyError> {
        let secret = decode_hex_array::<32>(text).map_err(|_| KeyError::InvalidSecretKey)?;
        Self::from_secret_bytes(&secret)
    }

    /// The compressed public key.
    pub fn public_key(&self) -> PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; PUBLIC_KEY_LENGTH];
        bytes.copy_from_slice(point.as_bytes());
        PublicKey(bytes)
    }

    /// Signs `message` (SHA-256 is applied internally). Deterministic per
    /// RFC 6979, so the same key and message always give the same bytes.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig: EcdsaSignature = self.signing_key.sign(message);
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes.copy_from_slice(&sig.to_bytes());
        Signature(bytes)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
