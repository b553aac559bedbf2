//! # Milestones
//!
//! A milestone is the set of economic parameters in force from a given
//! height onward: block reward, top-delegate reward, per-type fees, stake
//! multipliers, and the grace and power-up windows.
//!
//! Lookups hand out an `Arc<Milestone>` snapshot. Anything that needs several
//! parameters for one decision (validating a transaction, creating a stake)
//! must read the snapshot once and use it throughout, so a height boundary
//! can never be observed halfway through a check.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stake::weight::{BucketFloors, DurationBucket, Multiplier};
use crate::transaction::amount;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Problems found while loading a milestone table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("milestone table is empty")]
    EmptyMilestones,

    #[error("first milestone must start at height 1, found {0}")]
    FirstMilestoneHeight(u64),

    #[error("milestone heights must strictly increase: {previous} then {next}")]
    UnorderedMilestones { previous: u64, next: u64 },

    #[error("milestone at height {height} has no multiplier for bucket {bucket}")]
    MissingStakeLevel { height: u64, bucket: DurationBucket },

    #[error("milestone at height {height}: multiplier for {bucket} is below 1")]
    MultiplierBelowOne { height: u64, bucket: DurationBucket },

    #[error("milestone at height {height}: multiplier for {bucket} is lower than a shorter bucket's")]
    DecreasingMultiplier { height: u64, bucket: DurationBucket },

    #[error("milestone at height {height}: duration bucket floors must strictly increase")]
    UnorderedBucketFloors { height: u64 },

    #[error("milestone at height {height}: block time must be positive")]
    ZeroBlockTime { height: u64 },
}

// ---------------------------------------------------------------------------
// FeeSchedule
// ---------------------------------------------------------------------------

/// Per-type fees, keyed by the transaction type's registry name
/// (`"transfer"`, `"stakeCreate"`, ...).
///
/// A special fee, when present, replaces the static fee for its type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    #[serde(default, with = "amount::map_as_string")]
    pub static_fees: BTreeMap<String, u64>,
    #[serde(default, with = "amount::map_as_string")]
    pub special_fees: BTreeMap<String, u64>,
}

impl FeeSchedule {
    /// The fee a transaction of type `name` must pay under this schedule.
    pub fn fee_for(&self, name: &str) -> Option<u64> {
        self.special_fees
            .get(name)
            .or_else(|| self.static_fees.get(name))
            .copied()
    }
}

// ---------------------------------------------------------------------------
// Milestone
// ---------------------------------------------------------------------------

/// Economic parameters in force from `height` onward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// First height this milestone applies to.
    pub height: u64,
    /// Forger reward per block, in the smallest unit.
    #[serde(with = "amount::as_string")]
    pub reward: u64,
    /// Reward shared among the top delegates each block.
    #[serde(default, with = "amount::as_string")]
    pub top_reward: u64,
    /// How many delegates share `top_reward`.
    #[serde(default)]
    pub top_delegates: u32,
    /// Target seconds per block. Converts second-based offsets into heights.
    pub block_time: u64,
    /// Weight multiplier per duration bucket.
    pub stake_levels: BTreeMap<DurationBucket, Multiplier>,
    /// Bucket lower bounds in seconds.
    #[serde(default)]
    pub duration_floors: BucketFloors,
    /// Seconds from stake creation until the grace window starts.
    pub grace_end: u64,
    /// Seconds from the start of the grace window until the stake counts.
    pub power_up: u64,
    /// Per-type fee tables.
    #[serde(default)]
    pub fees: FeeSchedule,
}

impl Milestone {
    /// Multiplier for `bucket`. Present for every bucket once the milestone
    /// has passed [`Milestones::new`] validation.
    pub fn multiplier(&self, bucket: DurationBucket) -> Option<Multiplier> {
        self.stake_levels.get(&bucket).copied()
    }

    /// Genesis parameters used by [`crate::config::NetworkConfig::devnet`].
    pub fn devnet_genesis() -> Self {
        let stake_levels = [
            (DurationBucket::ThreeMonths, Multiplier::from_basis_points(10_000)),
            (DurationBucket::SixMonths, Multiplier::from_basis_points(10_000)),
            (DurationBucket::OneYear, Multiplier::from_basis_points(15_000)),
            (DurationBucket::TwoYears, Multiplier::from_basis_points(20_000)),
        ]
        .into_iter()
        .collect();

        let static_fees = [
            ("transfer", 10_000_000),
            ("secondSignature", 500_000_000),
            ("delegateRegistration", 2_500_000_000),
            ("vote", 100_000_000),
            ("ipfs", 500_000_000),
            ("multiPayment", 10_000_000),
            ("delegateResignation", 2_500_000_000),
            ("stakeCreate", 100_000_000),
            ("stakeRedeem", 100_000_000),
            ("stakeCancel", 100_000_000),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            height: 1,
            reward: 200_000_000,
            top_reward: 50_000_000,
            top_delegates: 10,
            block_time: 8,
            stake_levels,
            duration_floors: BucketFloors::default(),
            grace_end: 86_400,
            power_up: 86_400,
            fees: FeeSchedule {
                static_fees,
                special_fees: BTreeMap::new(),
            },
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        let height = self.height;
        if self.block_time == 0 {
            return Err(ConfigError::ZeroBlockTime { height });
        }
        if !self.duration_floors.is_ascending() {
            return Err(ConfigError::UnorderedBucketFloors { height });
        }
        let mut previous: Option<Multiplier> = None;
        for bucket in DurationBucket::ALL {
            let multiplier = self
                .multiplier(bucket)
                .ok_or(ConfigError::MissingStakeLevel { height, bucket })?;
            if multiplier < Multiplier::ONE {
                return Err(ConfigError::MultiplierBelowOne { height, bucket });
            }
            if previous.is_some_and(|p| multiplier < p) {
                return Err(ConfigError::DecreasingMultiplier { height, bucket });
            }
            previous = Some(multiplier);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MilestoneSource
// ---------------------------------------------------------------------------

/// Height-indexed parameter lookup. Supplied by configuration management;
/// the core only ever calls it.
pub trait MilestoneSource {
    fn milestone_at(&self, height: u64) -> Arc<Milestone>;
}

/// A validated, height-sorted milestone table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Milestone>", into = "Vec<Milestone>")]
pub struct Milestones {
    entries: Vec<Arc<Milestone>>,
}

impl Milestones {
    /// Validates and wraps a milestone list. Heights must strictly increase
    /// starting from 1, and every milestone must carry a complete,
    /// non-decreasing set of stake multipliers.
    pub fn new(milestones: Vec<Milestone>) -> Result<Self, ConfigError> {
        let first = milestones.first().ok_or(ConfigError::EmptyMilestones)?;
        if first.height != 1 {
            return Err(ConfigError::FirstMilestoneHeight(first.height));
        }
        for pair in milestones.windows(2) {
            if pair[1].height <= pair[0].height {
                return Err(ConfigError::UnorderedMilestones {
                    previous: pair[0].height,
                    next: pair[1].height,
                });
            }
        }
        for milestone in &milestones {
            milestone.check()?;
        }
        Ok(Self {
            entries: milestones.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MilestoneSource for Milestones {
    fn milestone_at(&self, height: u64) -> Arc<Milestone> {
        // Height 0 (pre-genesis lookups) falls back to the first entry.
        let idx = self
            .entries
            .partition_point(|m| m.height <= height)
            .saturating_sub(1);
        Arc::clone(&self.entries[idx])
    }
}

impl TryFrom<Vec<Milestone>> for Milestones {
    type Error = ConfigError;

    fn try_from(value: Vec<Milestone>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Milestones> for Vec<Milestone> {
    fn from(value: Milestones) -> Self {
        value.entries.iter().map(|m| (**m).clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
