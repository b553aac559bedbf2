//! Recipient addresses.
//!
//! An address is a network version byte followed by a 20-byte hash of the
//! owner's public key, rendered as base58check. The version byte keeps a
//! devnet address from ever validating on mainnet.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::CodecError;
use crate::config::ADDRESS_LENGTH;
use crate::crypto::{sha256_array, PublicKey};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derives the address of `public_key` on the network whose version
    /// byte is `pub_key_hash`.
    pub fn from_public_key(public_key: &PublicKey, pub_key_hash: u8) -> Self {
        let digest = sha256_array(public_key.as_bytes());
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[0] = pub_key_hash;
        bytes[1..].copy_from_slice(&digest[..ADDRESS_LENGTH - 1]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// The network version byte.
    pub fn network(&self) -> u8 {
        self.0[0]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).with_check().into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|e| CodecError::InvalidAddress(e.to_string()))?;
        <[u8; ADDRESS_LENGTH]>::try_from(bytes.as_slice())
            .map(Self)
            .map_err(|_| {
                CodecError::InvalidAddress(format!(
                    "expected {} bytes, got {}",
                    ADDRESS_LENGTH,
                    bytes.len()
                ))
            })
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
