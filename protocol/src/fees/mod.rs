//! # Fee Engine
//!
//! Block-closing arithmetic: how collected fees are split between the
//! forger and removal, and how the block reward and top-delegate reward are
//! paid out on top of that.
//!
//! ```text
//! split.rs  : split_fees: the three-branch fee policy and its equalizer
//! rewards.rs: collect_fees, distribute_block_rewards
//! ```
//!
//! Everything is integer arithmetic in the smallest unit. An unbalanced
//! result is a defect, reported as [`ArithmeticError::PrecisionViolation`];
//! callers closing a block must abort on it rather than persist the split.

pub mod rewards;
pub mod split;

pub use rewards::{collect_fees, distribute_block_rewards, BlockRewards};
pub use split::{split_fees, FeeSplit};

use thiserror::Error;

/// Arithmetic failures in fee and weight computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    /// A computed result broke a balancing invariant or produced a
    /// non-integer or negative intermediate.
    #[error("precision violation in {operation}: {detail}")]
    PrecisionViolation {
        operation: &'static str,
        detail: String,
    },

    /// A sum or product left the `u64` domain.
    #[error("arithmetic overflow in {operation}")]
    Overflow { operation: &'static str },
}
