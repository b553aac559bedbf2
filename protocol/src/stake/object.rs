//! A single stake and its lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::position::Position;
use super::StakeError;
use crate::transaction::asset::StakeId;

/// Lifecycle state. Variants are declared in lifecycle order; the
/// windowed states only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StakeState {
    Pending,
    Graced,
    Active,
    Redeemed,
    Canceled,
    Halved,
}

impl StakeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redeemed | Self::Canceled | Self::Halved)
    }

    /// Whether a stake in this state contributes to delegate weight.
    pub fn is_counted(&self) -> bool {
        matches!(self, Self::Active | Self::Halved)
    }

    /// Not yet earning weight, not finished either.
    pub fn is_graced(&self) -> bool {
        matches!(self, Self::Pending | Self::Graced)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Graced => "graced",
            Self::Active => "active",
            Self::Redeemed => "redeemed",
            Self::Canceled => "canceled",
            Self::Halved => "halved",
        }
    }
}

impl fmt::Display for StakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Window boundaries, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeTimestamps<P> {
    pub created: P,
    pub grace_end: P,
    pub power_up: P,
    pub redeemable: P,
}

/// One staking deposit.
///
/// `weight` is computed once, from the multiplier of the milestone in force
/// at creation, and only changes when the stake is halved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeObject<P> {
    pub id: StakeId,
    #[serde(with = "crate::transaction::amount::as_string")]
    pub amount: u64,
    pub duration: u64,
    #[serde(with = "crate::transaction::amount::as_string")]
    pub weight: u64,
    pub timestamps: StakeTimestamps<P>,
    pub state: StakeState,
}

impl<P: Position> StakeObject<P> {
    /// The state this stake is in at `now`. Terminal states are sticky;
    /// windowed states are read from the timestamps but never regress
    /// behind the recorded state.
    pub fn phase_at(&self, now: P) -> StakeState {
        if self.state.is_terminal() {
            return self.state;
        }
        let windowed = if now < self.timestamps.grace_end {
            StakeState::Pending
        } else if now < self.timestamps.power_up {
            StakeState::Graced
        } else {
            StakeState::Active
        };
        windowed.max(self.state)
    }

    /// Moves the recorded state forward to `now`. Returns whether it changed.
    pub fn advance(&mut self, now: P) -> bool {
        let phase = self.phase_at(now);
        if phase == self.state {
            return false;
        }
        self.state = phase;
        true
    }

    pub fn is_redeemable_at(&self, now: P) -> bool {
        self.phase_at(now) == StakeState::Active && now >= self.timestamps.redeemable
    }

    /// `active → redeemed`, once the lock-up has elapsed.
    pub fn redeem(&mut self, now: P) -> Result<(), StakeError> {
        self.transition(now, StakeState::Redeemed, |s| s == StakeState::Active)?;
        if now < self.timestamps.redeemable {
            return Err(StakeError::NotRedeemable {
                id: self.id,
                redeemable: self.timestamps.redeemable.value(),
                now: now.value(),
            });
        }
        self.state = StakeState::Redeemed;
        Ok(())
    }

    /// `pending | graced → canceled`.
    pub fn cancel(&mut self, now: P) -> Result<(), StakeError> {
        self.transition(now, StakeState::Canceled, |s| s.is_graced())?;
        self.state = StakeState::Canceled;
        Ok(())
    }

    /// `active → halved`. The weight is halved, rounding down.
    pub fn halve(&mut self, now: P) -> Result<(), StakeError> {
        self.transition(now, StakeState::Halved, |s| s == StakeState::Active)?;
        self.state = StakeState::Halved;
        self.weight /= 2;
        Ok(())
    }

    /// Checks that the phase at `now` may move to `to`, without touching
    /// the stake.
    fn transition(
        &self,
        now: P,
        to: StakeState,
        allowed: impl Fn(StakeState) -> bool,
    ) -> Result<(), StakeError> {
        let from = self.phase_at(now);
        if allowed(from) {
            Ok(())
        } else {
            Err(StakeError::IllegalTransition {
                id: self.id,
                from,
                to,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stake::position::{Height, Timestamp};

    const T0: u64 = 1_000;
    const G: u64 = 100;
    const P: u64 = 50;
    const D: u64 = 10_000;

    fn stake() -> StakeObject<Timestamp> {
        StakeObject {
            id: StakeId::from_bytes([1; 32]),
            amount: 500,
            duration: D,
            weight: 750,
            timestamps: StakeTimestamps {
                created: Timestamp(T0),
                grace_end: Timestamp(T0 + G),
                power_up: Timestamp(T0 + G + P),
                redeemable: Timestamp(T0 + D),
            },
            state: StakeState::Pending,
        }
    }

    #[test]
    fn windows_are_half_open() {
        let s = stake();
        assert_eq!(s.phase_at(Timestamp(T0)), StakeState::Pending);
        assert_eq!(s.phase_at(Timestamp(T0 + G - 1)), StakeState::Pending);
        assert_eq!(s.phase_at(Timestamp(T0 + G)), StakeState::Graced);
        assert_eq!(s.phase_at(Timestamp(T0 + G + P - 1)), StakeState::Graced);
        assert_eq!(s.phase_at(Timestamp(T0 + G + P)), StakeState::Active);
        assert_eq!(s.phase_at(Timestamp(u64::MAX)), StakeState::Active);
    }

    #[test]
    fn advance_never_regresses() {
        let mut s = stake();
        assert!(s.advance(Timestamp(T0 + G + P)));
        assert_eq!(s.state, StakeState::Active);
        assert!(!s.advance(Timestamp(T0)));
        assert_eq!(s.state, StakeState::Active);
    }

    #[test]
    fn redeem_requires_active_and_elapsed_lockup() {
        let mut s = stake();
        assert!(matches!(
            s.redeem(Timestamp(T0 + G)),
            Err(StakeError::IllegalTransition { from: StakeState::Graced, .. })
        ));
        assert!(matches!(
            s.redeem(Timestamp(T0 + D - 1)),
            Err(StakeError::NotRedeemable { redeemable, .. }) if redeemable == T0 + D
        ));
        s.redeem(Timestamp(T0 + D)).unwrap();
        assert_eq!(s.state, StakeState::Redeemed);
    }

    #[test]
    fn failed_transitions_leave_the_stake_untouched() {
        let mut s = stake();
        let before = s.clone();
        assert!(s.redeem(Timestamp(T0 + D - 1)).is_err());
        assert_eq!(s, before);
        assert!(s.cancel(Timestamp(T0 + G + P)).is_err());
        assert_eq!(s, before);
        assert!(s.halve(Timestamp(T0)).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn cancel_only_before_power_up() {
        let mut s = stake();
        s.cancel(Timestamp(T0 + G)).unwrap();
        assert_eq!(s.state, StakeState::Canceled);

        let mut s = stake();
        assert!(matches!(
            s.cancel(Timestamp(T0 + G + P)),
            Err(StakeError::IllegalTransition { from: StakeState::Active, to: StakeState::Canceled, .. })
        ));
    }

    #[test]
    fn halving_halves_weight_and_keeps_counting() {
        let mut s = stake();
        s.halve(Timestamp(T0 + G + P)).unwrap();
        assert_eq!(s.state, StakeState::Halved);
        assert_eq!(s.weight, 375);
        assert!(s.state.is_counted());
    }

    #[test]
    fn terminal_states_are_final() {
        let at = Timestamp(T0 + D);
        for terminal in [StakeState::Redeemed, StakeState::Canceled, StakeState::Halved] {
            let mut s = stake();
            s.state = terminal;
            assert!(!s.advance(at));
            assert_eq!(s.phase_at(at), terminal);
            assert!(s.redeem(at).is_err());
            assert!(s.cancel(at).is_err());
            assert!(s.halve(at).is_err());
            assert_eq!(s.state, terminal);
        }
    }

    #[test]
    fn height_positions_use_the_same_machine() {
        let s = StakeObject {
            id: StakeId::from_bytes([2; 32]),
            amount: 1,
            duration: 1,
            weight: 1,
            timestamps: StakeTimestamps {
                created: Height(10),
                grace_end: Height(20),
                power_up: Height(30),
                redeemable: Height(40),
            },
            state: StakeState::Pending,
        };
        assert_eq!(s.phase_at(Height(19)), StakeState::Pending);
        assert_eq!(s.phase_at(Height(20)), StakeState::Graced);
        assert_eq!(s.phase_at(Height(30)), StakeState::Active);
        assert!(!s.is_redeemable_at(Height(39)));
        assert!(s.is_redeemable_at(Height(40)));
    }

    #[test]
    fn json_carries_amounts_as_strings() {
        let json = serde_json::to_value(stake()).unwrap();
        assert_eq!(json["amount"], "500");
        assert_eq!(json["state"], "pending");
        assert_eq!(json["timestamps"]["graceEnd"], T0 + G);
    }
}
