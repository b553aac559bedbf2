//! # Protocol Configuration & Constants
//!
//! Wire-level constants, type group identifiers, field limits, and the
//! [`NetworkConfig`] a node hands to the core. Economic parameters that
//! change over the life of a network live in [`crate::milestone`] instead;
//! anything in this file is fixed for a given protocol version.
//!
//! The core never reads configuration files. Callers deserialize a
//! `NetworkConfig` (it is plain `serde`) and pass it in.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::milestone::{ConfigError, Milestone, MilestoneSource, Milestones};

// ---------------------------------------------------------------------------
// Wire Format
// ---------------------------------------------------------------------------

/// First byte of every serialized transaction. Lets a decoder reject
/// garbage before it looks at anything else.
pub const WIRE_HEADER: u8 = 0xff;

/// Pre-typeGroup layout: `type` is a single byte, ordering is by timestamp,
/// and every transaction implicitly belongs to the core group.
pub const LEGACY_VERSION: u8 = 1;

/// TypeGroup-aware layout with per-sender nonces.
pub const CURRENT_VERSION: u8 = 2;

/// Compressed secp256k1 public key length.
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Compact (r || s) ECDSA signature length.
pub const SIGNATURE_LENGTH: usize = 64;

/// Address payload length: one network version byte plus a 20-byte key hash.
pub const ADDRESS_LENGTH: usize = 21;

/// Stake identifiers are transaction ids, i.e. SHA-256 digests.
pub const STAKE_ID_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Type Groups
// ---------------------------------------------------------------------------

/// Built-in transaction types. Always registered, never removable.
pub const CORE_TYPE_GROUP: u32 = 1;

/// Staking and attestation transaction types, registered as plugins.
pub const STAKE_TYPE_GROUP: u32 = 100;

// ---------------------------------------------------------------------------
// Field Limits
// ---------------------------------------------------------------------------

/// Maximum vendor field (memo) length in bytes. The length prefix is a
/// single byte, so this is also the wire ceiling.
pub const MAX_VENDOR_FIELD_LENGTH: usize = 255;

/// Minimum number of recipients in a multi-payment. One recipient is a transfer.
pub const MIN_MULTI_PAYMENTS: usize = 2;

/// Maximum number of recipients in a multi-payment.
pub const MAX_MULTI_PAYMENTS: usize = 256;

/// A vote transaction carries at most an unvote and a vote.
pub const MAX_VOTES: usize = 2;

/// Delegate usernames: 1 to 20 characters.
pub const MAX_USERNAME_LENGTH: usize = 20;

/// Content hashes (IPFS multihashes, attestation digests) are at least this long.
pub const MIN_CONTENT_HASH_LENGTH: usize = 2;

/// Upper bound for content hashes. Generous enough for any multihash in use.
pub const MAX_CONTENT_HASH_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Address version byte for mainnet addresses.
pub const MAINNET_PUB_KEY_HASH: u8 = 0x3f;

/// Address version byte for devnet addresses.
pub const DEVNET_PUB_KEY_HASH: u8 = 0x1e;

/// Static description of a network: its name, address version byte, epoch,
/// and milestone table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Human-readable network name, used in logs.
    pub name: String,
    /// Version byte every address on this network must carry.
    pub pub_key_hash: u8,
    /// Legacy transaction timestamps count seconds from this instant.
    pub epoch: DateTime<Utc>,
    /// Height-indexed economic parameters.
    pub milestones: Milestones,
}

impl NetworkConfig {
    /// A devnet configuration with a single genesis milestone. Handy for
    /// tests and local tooling; real networks ship their own table.
    pub fn devnet() -> Result<Self, ConfigError> {
        Ok(Self {
            name: "devnet".to_string(),
            pub_key_hash: DEVNET_PUB_KEY_HASH,
            epoch: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            milestones: Milestones::new(vec![Milestone::devnet_genesis()])?,
        })
    }

    /// Seconds elapsed since the network epoch, clamped to the legacy
    /// `u32` timestamp domain.
    pub fn seconds_since_epoch(&self, now: DateTime<Utc>) -> u32 {
        let secs = (now - self.epoch).num_seconds();
        secs.clamp(0, u32::MAX as i64) as u32
    }
}

impl MilestoneSource for NetworkConfig {
    fn milestone_at(&self, height: u64) -> Arc<Milestone> {
        self.milestones.milestone_at(height)
    }
}
