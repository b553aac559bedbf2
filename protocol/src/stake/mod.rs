//! # Stake/Vote Weight Engine
//!
//! Turns staked deposits into delegate voting weight. A stake moves
//! through time windows derived from its creation position and the
//! milestone in force when it was created:
//!
//! ```text
//!   created        graceEnd         powerUp                redeemable
//!      |  pending     |   graced       |   active ...           |  active, redeemable
//!      +--------------+----------------+------------------------+---------------->
//!        cancel ok       cancel ok        counted, halvable        redeem ok
//! ```
//!
//! `redeemed`, `canceled`, and `halved` are terminal. Halved stakes keep
//! counting at half weight; the other two never count again.
//!
//! ```text
//! weight.rs  : duration buckets, multipliers, weight formula
//! position.rs: Height / Timestamp positions and the Clock
//! object.rs  : StakeObject and its state machine
//! engine.rs  : StakeEngine: applying stake transactions to wallet snapshots
//! handlers.rs: the typeGroup 100 transaction handlers
//! ```

pub mod engine;
pub mod handlers;
pub mod object;
pub mod position;
pub mod weight;

pub use engine::{
    delegate_voting_power, StakeApplication, StakeDelta, StakeEngine, WalletSnapshot,
};
pub use handlers::{
    register_stake_types, AttestationHandler, StakeCancelHandler, StakeCreateHandler,
    StakeRedeemHandler, ATTESTATION, STAKE_CANCEL, STAKE_CREATE, STAKE_REDEEM,
};
pub use object::{StakeObject, StakeState, StakeTimestamps};
pub use position::{Clock, Height, Position, Timestamp};
pub use weight::{stake_weight, BucketFloors, DurationBucket, Multiplier};

use thiserror::Error;

use crate::fees::ArithmeticError;
use crate::transaction::asset::StakeId;
use crate::transaction::types::TypeKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakeError {
    /// Shorter than the three-month floor, so no bucket and no weight.
    #[error("stake duration {duration}s is below the minimum of {minimum}s")]
    InvalidDuration { duration: u64, minimum: u64 },

    /// The milestone in force has no multiplier for the bucket.
    #[error("milestone at height {height} has no stake level for {bucket}")]
    MissingStakeLevel { height: u64, bucket: DurationBucket },

    #[error("stake {id} cannot move from {from} to {to}")]
    IllegalTransition {
        id: StakeId,
        from: StakeState,
        to: StakeState,
    },

    #[error("stake {id} is locked until {redeemable}, now {now}")]
    NotRedeemable {
        id: StakeId,
        redeemable: u64,
        now: u64,
    },

    #[error("unknown stake {0}")]
    UnknownStake(StakeId),

    #[error("stake {0} already exists")]
    DuplicateStake(StakeId),

    /// Stakes are keyed by the id of the creating transaction.
    #[error("stake transaction has no id; sign it first")]
    MissingId,

    #[error("transaction type {0} does not touch stakes")]
    NotAStakeTransaction(TypeKey),

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}
