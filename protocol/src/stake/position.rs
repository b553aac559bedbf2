//! Where on the chain "now" is.
//!
//! Stake windows can be measured in block heights or in block timestamps.
//! Both are monotonic `u64` counters; they differ only in how a
//! configured span of seconds converts into their own unit. The stake
//! engine is generic over [`Position`] so the window logic exists once.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::milestone::Milestone;

/// A monotonic point on the chain.
pub trait Position:
    Copy + Ord + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync
{
    /// Unit name for logs.
    const UNIT: &'static str;

    fn new(value: u64) -> Self;

    fn value(self) -> u64;

    /// Converts a span of `seconds` into this position's unit, rounding up
    /// so a window is never shorter than configured.
    fn span(seconds: u64, milestone: &Milestone) -> u64;

    /// `self + span`, or `None` past the end of the domain.
    fn checked_add(self, span: u64) -> Option<Self> {
        self.value().checked_add(span).map(Self::new)
    }
}

/// Block height. Spans are converted with the milestone's block time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Height(pub u64);

/// Block timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Position for Height {
    const UNIT: &'static str = "height";

    fn new(value: u64) -> Self {
        Self(value)
    }

    fn value(self) -> u64 {
        self.0
    }

    fn span(seconds: u64, milestone: &Milestone) -> u64 {
        // block_time is validated non-zero when the milestone table is built
        seconds.div_ceil(milestone.block_time.max(1))
    }
}

impl Position for Timestamp {
    const UNIT: &'static str = "timestamp";

    fn new(value: u64) -> Self {
        Self(value)
    }

    fn value(self) -> u64 {
        self.0
    }

    fn span(seconds: u64, _milestone: &Milestone) -> u64 {
        seconds
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// The chain position a stake operation runs at: the height selects the
/// milestone, `now` is compared against stake windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock<P> {
    pub height: u64,
    pub now: P,
}

impl Clock<Height> {
    /// Height-indexed windows: the height is also the position.
    pub fn at_height(height: u64) -> Self {
        Self {
            height,
            now: Height(height),
        }
    }
}

impl Clock<Timestamp> {
    /// Timestamp-indexed windows, with the milestone taken at `height`.
    pub fn at_time(height: u64, timestamp: u64) -> Self {
        Self {
            height,
            now: Timestamp(timestamp),
        }
    }
}
