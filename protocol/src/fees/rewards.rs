//! Block reward distribution.
//!
//! A closed block pays out three things: the milestone reward plus the
//! reward share of the fee split to the forger, an equal slice of the
//! top reward to each of the top delegates, and nothing to anyone for the
//! removal share. Integer division leftovers of the top reward are removed
//! along with it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::split::{split_fees, FeeSplit};
use super::ArithmeticError;
use crate::crypto::keys::PublicKey;
use crate::milestone::Milestone;

/// Sums the fees of every transaction in a block.
pub fn collect_fees<I>(fees: I) -> Result<u64, ArithmeticError>
where
    I: IntoIterator<Item = u64>,
{
    fees.into_iter().try_fold(0u64, |acc, fee| {
        acc.checked_add(fee).ok_or(ArithmeticError::Overflow {
            operation: "fee collection",
        })
    })
}

/// Who gets credited what when a block closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRewards {
    /// Milestone reward plus the fee split's reward share.
    pub forger: u64,
    /// The fee split this distribution was derived from.
    pub fee_split: FeeSplit,
    /// Equal shares of the top reward.
    pub top_delegates: Vec<(PublicKey, u64)>,
    /// Fee removal share plus any undistributed top reward.
    pub removed: u64,
}

/// Computes the payouts for a block that collected `total_fee`.
///
/// `ranked_delegates` is the active delegate list ordered by voting power,
/// highest first; only the first `milestone.top_delegates` entries share
/// the top reward. With no eligible delegates the whole top reward is
/// removed.
pub fn distribute_block_rewards(
    milestone: &Milestone,
    total_fee: u64,
    ranked_delegates: &[PublicKey],
) -> Result<BlockRewards, ArithmeticError> {
    let fee_split = split_fees(total_fee, milestone.reward)?;
    let forger = milestone
        .reward
        .checked_add(fee_split.to_reward)
        .ok_or(ArithmeticError::Overflow {
            operation: "forger reward",
        })?;

    let eligible = ranked_delegates
        .iter()
        .take(milestone.top_delegates as usize)
        .collect::<Vec<_>>();

    let (share, undistributed) = if eligible.is_empty() {
        (0, milestone.top_reward)
    } else {
        let n = eligible.len() as u64;
        (milestone.top_reward / n, milestone.top_reward % n)
    };

    let top_delegates = eligible
        .into_iter()
        .map(|key| (*key, share))
        .collect::<Vec<_>>();

    let removed = fee_split
        .to_remove
        .checked_add(undistributed)
        .ok_or(ArithmeticError::Overflow {
            operation: "removal total",
        })?;

    debug!(
        height = milestone.height,
        total_fee,
        forger,
        top_share = share,
        removed,
        "block rewards distributed"
    );

    Ok(BlockRewards {
        forger,
        fee_split,
        top_delegates,
        removed,
    })
}
