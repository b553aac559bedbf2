//! Type-specific transaction payloads.
//!
//! `Asset` is the union over every payload this library knows how to
//! encode. In JSON each variant is identified by its single top-level key
//! (`votes`, `ipfs`, `stakeCreate`, ...), so the enum is untagged. Objects
//! that match none of the known shapes land in [`Asset::Custom`] and are
//! left for a plugin handler to interpret.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::address::Address;
use super::amount;
use crate::codec::{CodecError, WireReader, WireWriter};
use crate::config::{
    MAX_CONTENT_HASH_LENGTH, MIN_CONTENT_HASH_LENGTH, PUBLIC_KEY_LENGTH, STAKE_ID_LENGTH,
};
use crate::crypto::{decode_hex_array, deserialize_hex, serialize_hex, PublicKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Asset {
    SecondSignature {
        signature: SecondSignatureAsset,
    },
    DelegateRegistration {
        delegate: DelegateAsset,
    },
    Vote {
        votes: Vec<VoteEntry>,
    },
    Ipfs {
        ipfs: ContentHash,
    },
    MultiPayment {
        payments: Vec<Payment>,
    },
    StakeCreate {
        #[serde(rename = "stakeCreate")]
        stake_create: StakeCreateAsset,
    },
    StakeRedeem {
        #[serde(rename = "stakeRedeem")]
        stake_redeem: StakeRef,
    },
    StakeCancel {
        #[serde(rename = "stakeCancel")]
        stake_cancel: StakeRef,
    },
    Attestation {
        attestation: AttestationAsset,
    },
    Custom(Map<String, Value>),
}

impl Asset {
    /// Short label for logs and mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SecondSignature { .. } => "secondSignature",
            Self::DelegateRegistration { .. } => "delegateRegistration",
            Self::Vote { .. } => "vote",
            Self::Ipfs { .. } => "ipfs",
            Self::MultiPayment { .. } => "multiPayment",
            Self::StakeCreate { .. } => "stakeCreate",
            Self::StakeRedeem { .. } => "stakeRedeem",
            Self::StakeCancel { .. } => "stakeCancel",
            Self::Attestation { .. } => "attestation",
            Self::Custom(_) => "custom",
        }
    }
}

// ---------------------------------------------------------------------------
// Core payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondSignatureAsset {
    pub public_key: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateAsset {
    pub username: String,
}

/// A single vote (`+`) or unvote (`-`) for a delegate's public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteEntry {
    Vote(PublicKey),
    Unvote(PublicKey),
}

impl VoteEntry {
    pub fn public_key(&self) -> &PublicKey {
        match self {
            Self::Vote(pk) | Self::Unvote(pk) => pk,
        }
    }

    pub(crate) fn write(&self, out: &mut WireWriter) {
        let (flag, pk) = match self {
            Self::Unvote(pk) => (0u8, pk),
            Self::Vote(pk) => (1u8, pk),
        };
        out.put_u8(flag);
        out.put_bytes(pk.as_bytes());
    }

    pub(crate) fn read(reader: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let vote = reader.flag("vote")?;
        let pk = PublicKey::from_bytes(reader.array::<PUBLIC_KEY_LENGTH>()?);
        Ok(if vote { Self::Vote(pk) } else { Self::Unvote(pk) })
    }
}

impl fmt::Display for VoteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vote(pk) => write!(f, "+{}", pk),
            Self::Unvote(pk) => write!(f, "-{}", pk),
        }
    }
}

impl FromStr for VoteEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |hex: &str| PublicKey::from_hex(hex).map_err(|e| e.to_string());
        if let Some(hex) = s.strip_prefix('+') {
            parse(hex).map(Self::Vote)
        } else if let Some(hex) = s.strip_prefix('-') {
            parse(hex).map(Self::Unvote)
        } else {
            Err(format!("vote `{}` must start with + or -", s))
        }
    }
}

impl Serialize for VoteEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VoteEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Raw content-addressed hash (an IPFS multihash, an attestation digest).
/// Base58 in JSON, length-prefixed raw bytes on the wire.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(Vec<u8>);

impl ContentHash {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn write(&self, field: &'static str, out: &mut WireWriter) -> Result<(), CodecError> {
        out.put_prefixed(field, &self.0)
    }

    pub(crate) fn read(field: &'static str, reader: &mut WireReader<'_>) -> Result<Self, CodecError> {
        reader
            .prefixed(field, MIN_CONTENT_HASH_LENGTH, MAX_CONTENT_HASH_LENGTH)
            .map(|b| Self(b.to_vec()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(&self.0).into_string())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self)
    }
}

impl FromStr for ContentHash {
    type Err = bs58::decode::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        bs58::decode(s).into_vec().map(Self)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(with = "amount::as_string")]
    pub amount: u64,
    pub recipient_id: Address,
}

// ---------------------------------------------------------------------------
// Stake payloads
// ---------------------------------------------------------------------------

/// Identifier of a stake: the id of the transaction that created it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StakeId([u8; STAKE_ID_LENGTH]);

impl StakeId {
    pub fn from_bytes(bytes: [u8; STAKE_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(text: &str) -> Result<Self, String> {
        decode_hex_array::<STAKE_ID_LENGTH>(text).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; STAKE_ID_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub(crate) fn write(&self, out: &mut WireWriter) -> Result<(), CodecError> {
        out.put_prefixed("stake id", &self.0)
    }

    pub(crate) fn read(reader: &mut WireReader<'_>) -> Result<Self, CodecError> {
        let bytes = reader.prefixed("stake id", STAKE_ID_LENGTH, STAKE_ID_LENGTH)?;
        let mut id = [0u8; STAKE_ID_LENGTH];
        id.copy_from_slice(bytes);
        Ok(Self(id))
    }
}

impl fmt::Display for StakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for StakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StakeId({})", self.to_hex())
    }
}

impl Serialize for StakeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for StakeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_hex::<D, STAKE_ID_LENGTH>(deserializer).map(Self)
    }
}

/// Payload of a stake creation: how much, for how long, and when the
/// lock-up starts (seconds, in the caller's position domain).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeCreateAsset {
    pub duration: u64,
    #[serde(with = "amount::as_string")]
    pub amount: u64,
    pub timestamp: u64,
}

/// Reference to an existing stake, for redemption or cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRef {
    pub id: StakeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationAsset {
    pub hash: ContentHash,
}
