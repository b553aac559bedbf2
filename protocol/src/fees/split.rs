//! Splitting a block's collected fees between forger reward and removal.

use serde::{Deserialize, Serialize};
use tracing::error;

use super::ArithmeticError;

/// Outcome of [`split_fees`]. The two shares always sum to the total fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSplit {
    /// Credited to the forger on top of the block reward.
    pub to_reward: u64,
    /// Removed from circulation.
    pub to_remove: u64,
}

/// Splits `total_fee` given the block's configured `total_reward`.
///
/// Policy, in order:
///
/// 1. No reward configured: the forger keeps every fee.
/// 2. Fees at or below the reward: all of it is removed.
/// 3. Otherwise the reward-sized part is removed and the excess is halved
///    between the two sides. When the excess is odd, the half unit that
///    cannot be split goes to the reward side, so the reward share is the
///    ceiling half and the removal share keeps the floor half.
///
/// # Errors
///
/// [`ArithmeticError::PrecisionViolation`] if the shares fail to sum to
/// `total_fee`.
pub fn split_fees(total_fee: u64, total_reward: u64) -> Result<FeeSplit, ArithmeticError> {
    let split = if total_reward == 0 {
        FeeSplit {
            to_reward: total_fee,
            to_remove: 0,
        }
    } else if total_fee <= total_reward {
        FeeSplit {
            to_reward: 0,
            to_remove: total_fee,
        }
    } else {
        let excess = total_fee - total_reward;
        let half = excess / 2;
        let odd = excess % 2;
        FeeSplit {
            to_reward: half + odd,
            to_remove: total_reward + half,
        }
    };

    match split.to_reward.checked_add(split.to_remove) {
        Some(sum) if sum == total_fee => Ok(split),
        sum => {
            error!(
                total_fee,
                total_reward,
                to_reward = split.to_reward,
                to_remove = split.to_remove,
                "fee split does not balance"
            );
            Err(ArithmeticError::PrecisionViolation {
                operation: "fee split",
                detail: format!("shares sum to {:?}, expected {}", sum, total_fee),
            })
        }
    }
}
