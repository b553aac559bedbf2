//! Applying stake transactions to wallet snapshots.
//!
//! The engine never mutates a wallet. It reads a [`WalletSnapshot`] and
//! returns the [`StakeDelta`]s and balance movements the wallet store has
//! to persist.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::object::{StakeObject, StakeState, StakeTimestamps};
use super::position::{Clock, Position};
use super::weight::{stake_weight, DurationBucket};
use super::{StakeError, STAKE_CANCEL, STAKE_CREATE, STAKE_REDEEM};
use crate::crypto::PublicKey;
use crate::fees::ArithmeticError;
use crate::milestone::MilestoneSource;
use crate::transaction::asset::{Asset, StakeCreateAsset, StakeId};
use crate::transaction::builder::Transaction;

// ---------------------------------------------------------------------------
// Wallet snapshot
// ---------------------------------------------------------------------------

/// Read-only view of a wallet, as handed in by the wallet store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot<P> {
    pub public_key: PublicKey,
    #[serde(with = "crate::transaction::amount::as_string")]
    pub balance: u64,
    /// Delegate this wallet votes for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote: Option<PublicKey>,
    #[serde(default)]
    pub stakes: BTreeMap<StakeId, StakeObject<P>>,
}

impl<P: Position> WalletSnapshot<P> {
    pub fn new(public_key: PublicKey, balance: u64) -> Self {
        Self {
            public_key,
            balance,
            vote: None,
            stakes: BTreeMap::new(),
        }
    }

    pub fn voting_for(mut self, delegate: PublicKey) -> Self {
        self.vote = Some(delegate);
        self
    }

    pub fn with_stake(mut self, stake: StakeObject<P>) -> Self {
        self.stakes.insert(stake.id, stake);
        self
    }

    /// Total amount locked in stakes that are still pending or graced at
    /// `now`. Recomputed on every call.
    pub fn graced_total(&self, now: P) -> Result<u64, ArithmeticError> {
        self.sum_where(now, |stake| stake.amount, StakeState::is_graced)
    }

    /// Weight this wallet lends its delegate at `now`: active and halved
    /// stakes only.
    pub fn voting_weight(&self, now: P) -> Result<u64, ArithmeticError> {
        self.sum_where(now, |stake| stake.weight, StakeState::is_counted)
    }

    /// Moves every stake's recorded state forward to `now` and reports the
    /// ones that changed.
    pub fn advance(&self, now: P) -> Vec<StakeDelta<P>> {
        self.stakes
            .values()
            .filter_map(|stake| {
                let mut stake = stake.clone();
                stake.advance(now).then(|| StakeDelta::Updated(stake))
            })
            .collect()
    }

    /// Applies a halving event to one active stake.
    pub fn halve(&self, id: StakeId, now: P) -> Result<StakeDelta<P>, StakeError> {
        let mut stake = self.stake(id)?;
        stake.halve(now)?;
        info!(stake = %id, weight = stake.weight, "halved stake");
        Ok(StakeDelta::Updated(stake))
    }

    fn stake(&self, id: StakeId) -> Result<StakeObject<P>, StakeError> {
        self.stakes
            .get(&id)
            .cloned()
            .ok_or(StakeError::UnknownStake(id))
    }

    fn sum_where(
        &self,
        now: P,
        value: impl Fn(&StakeObject<P>) -> u64,
        include: impl Fn(&StakeState) -> bool,
    ) -> Result<u64, ArithmeticError> {
        self.stakes
            .values()
            .filter(|stake| include(&stake.phase_at(now)))
            .try_fold(0u64, |acc, stake| acc.checked_add(value(stake)))
            .ok_or(ArithmeticError::Overflow {
                operation: "stake total",
            })
    }
}

/// Sum of the voting weight every voter lends `delegate` at `now`.
pub fn delegate_voting_power<P: Position>(
    delegate: &PublicKey,
    voters: &[WalletSnapshot<P>],
    now: P,
) -> Result<u64, ArithmeticError> {
    voters
        .iter()
        .filter(|wallet| wallet.vote.as_ref() == Some(delegate))
        .try_fold(0u64, |acc, wallet| {
            acc.checked_add(wallet.voting_weight(now)?)
                .ok_or(ArithmeticError::Overflow {
                    operation: "delegate voting power",
                })
        })
}

// ---------------------------------------------------------------------------
// Deltas
// ---------------------------------------------------------------------------

/// A change to one wallet's stake collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakeDelta<P> {
    Created(StakeObject<P>),
    Updated(StakeObject<P>),
    /// Redeemed stakes leave the collection.
    Removed(StakeId),
}

/// Everything a stake transaction does to its sender's wallet. `debit`
/// and `credit` exclude the transaction fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeApplication<P> {
    pub deltas: Vec<StakeDelta<P>>,
    pub debit: u64,
    pub credit: u64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stake creation and application, over any [`MilestoneSource`].
#[derive(Debug, Clone)]
pub struct StakeEngine<M> {
    milestones: M,
}

impl<M: MilestoneSource> StakeEngine<M> {
    pub fn new(milestones: M) -> Self {
        Self { milestones }
    }

    /// Builds the stake object for a creation at `clock`.
    ///
    /// The milestone at `clock.height` is read once and fixes the stake's
    /// multiplier and windows for its whole life.
    pub fn create_stake<P: Position>(
        &self,
        id: StakeId,
        asset: &StakeCreateAsset,
        clock: Clock<P>,
    ) -> Result<StakeObject<P>, StakeError> {
        let milestone = self.milestones.milestone_at(clock.height);
        let floors = milestone.duration_floors;
        let bucket = DurationBucket::classify(asset.duration, &floors).ok_or(
            StakeError::InvalidDuration {
                duration: asset.duration,
                minimum: floors.three_months,
            },
        )?;
        let multiplier = milestone
            .multiplier(bucket)
            .ok_or(StakeError::MissingStakeLevel {
                height: clock.height,
                bucket,
            })?;
        let weight = stake_weight(asset.amount, multiplier)?;

        let overflow = || ArithmeticError::Overflow {
            operation: "stake window",
        };
        let created = clock.now;
        let grace_end = created
            .checked_add(P::span(milestone.grace_end, &milestone))
            .ok_or_else(overflow)?;
        let power_up = grace_end
            .checked_add(P::span(milestone.power_up, &milestone))
            .ok_or_else(overflow)?;
        let redeemable = created
            .checked_add(P::span(asset.duration, &milestone))
            .ok_or_else(overflow)?;

        debug!(
            stake = %id,
            %bucket,
            %multiplier,
            weight,
            unit = P::UNIT,
            "derived stake"
        );

        Ok(StakeObject {
            id,
            amount: asset.amount,
            duration: asset.duration,
            weight,
            timestamps: StakeTimestamps {
                created,
                grace_end,
                power_up,
                redeemable,
            },
            state: StakeState::Pending,
        })
    }

    /// Applies a verified stake transaction from `wallet`'s owner.
    ///
    /// - `stakeCreate` debits the amount and creates a pending stake keyed
    ///   by the transaction id.
    /// - `stakeRedeem` credits the amount back and removes the stake.
    /// - `stakeCancel` credits the amount back and marks the stake canceled.
    pub fn apply<P: Position>(
        &self,
        tx: &Transaction,
        wallet: &WalletSnapshot<P>,
        clock: Clock<P>,
    ) -> Result<StakeApplication<P>, StakeError> {
        let key = tx.key();
        let application = match (&tx.asset, key) {
            (Some(Asset::StakeCreate { stake_create }), k) if k == STAKE_CREATE => {
                let id = tx
                    .id
                    .as_deref()
                    .and_then(|id| StakeId::from_hex(id).ok())
                    .ok_or(StakeError::MissingId)?;
                if wallet.stakes.contains_key(&id) {
                    return Err(StakeError::DuplicateStake(id));
                }
                let needed = stake_create
                    .amount
                    .checked_add(tx.fee)
                    .ok_or(ArithmeticError::Overflow {
                        operation: "stake debit",
                    })?;
                if needed > wallet.balance {
                    return Err(StakeError::InsufficientBalance {
                        needed,
                        available: wallet.balance,
                    });
                }
                let stake = self.create_stake(id, stake_create, clock)?;
                StakeApplication {
                    debit: stake.amount,
                    credit: 0,
                    deltas: vec![StakeDelta::Created(stake)],
                }
            }
            (Some(Asset::StakeRedeem { stake_redeem }), k) if k == STAKE_REDEEM => {
                let mut stake = wallet.stake(stake_redeem.id)?;
                stake.redeem(clock.now)?;
                StakeApplication {
                    debit: 0,
                    credit: stake.amount,
                    deltas: vec![StakeDelta::Removed(stake.id)],
                }
            }
            (Some(Asset::StakeCancel { stake_cancel }), k) if k == STAKE_CANCEL => {
                let mut stake = wallet.stake(stake_cancel.id)?;
                stake.cancel(clock.now)?;
                StakeApplication {
                    debit: 0,
                    credit: stake.amount,
                    deltas: vec![StakeDelta::Updated(stake)],
                }
            }
            _ => return Err(StakeError::NotAStakeTransaction(key)),
        };

        info!(
            %key,
            sender = %wallet.public_key,
            debit = application.debit,
            credit = application.credit,
            at = %clock.now,
            "applied stake transaction"
        );
        Ok(application)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
