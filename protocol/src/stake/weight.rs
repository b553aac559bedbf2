//! Duration buckets, multipliers, and the weight formula.
//!
//! `weight = amount × multiplier(bucket(duration))`. Multipliers are exact
//! decimals stored in basis points, so `1.25` is `12_500`. The product is
//! computed in `u128` and truncated toward zero when narrowed back to the
//! smallest unit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::fees::ArithmeticError;

// ---------------------------------------------------------------------------
// DurationBucket
// ---------------------------------------------------------------------------

/// Lock-up tier a stake's duration falls into.
///
/// Ordered from shortest to longest; the derived `Ord` is relied upon when
/// checking that multipliers never decrease with duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DurationBucket {
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
}

impl DurationBucket {
    pub const ALL: [DurationBucket; 4] = [
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
    ];

    /// Maps a raw duration in seconds to its bucket using half-open
    /// intervals. Durations below the three-month floor have no bucket.
    pub fn classify(duration: u64, floors: &BucketFloors) -> Option<Self> {
        if duration >= floors.two_years {
            Some(Self::TwoYears)
        } else if duration >= floors.one_year {
            Some(Self::OneYear)
        } else if duration >= floors.six_months {
            Some(Self::SixMonths)
        } else if duration >= floors.three_months {
            Some(Self::ThreeMonths)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
        }
    }
}

impl fmt::Display for DurationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// BucketFloors
// ---------------------------------------------------------------------------

/// Lower bound, in seconds, of each bucket. Network configuration, not
/// protocol: the defaults are a quarter, half, one, and two Julian years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketFloors {
    pub three_months: u64,
    pub six_months: u64,
    pub one_year: u64,
    pub two_years: u64,
}

impl Default for BucketFloors {
    fn default() -> Self {
        Self {
            three_months: 7_889_400,
            six_months: 15_778_800,
            one_year: 31_557_600,
            two_years: 63_115_200,
        }
    }
}

impl BucketFloors {
    /// Floors must be strictly ascending for the partition to be total and
    /// non-overlapping.
    pub fn is_ascending(&self) -> bool {
        self.three_months < self.six_months
            && self.six_months < self.one_year
            && self.one_year < self.two_years
    }
}

// ---------------------------------------------------------------------------
// Multiplier
// ---------------------------------------------------------------------------

/// Exact decimal weight multiplier with four fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Multiplier {
    basis_points: u32,
}

/// Basis points in one whole unit.
pub const MULTIPLIER_SCALE: u32 = 10_000;

impl Multiplier {
    pub const ONE: Multiplier = Multiplier {
        basis_points: MULTIPLIER_SCALE,
    };

    pub const fn from_basis_points(basis_points: u32) -> Self {
        Self { basis_points }
    }

    pub fn basis_points(&self) -> u32 {
        self.basis_points
    }
}

/// Error returned when a multiplier string is not an exact decimal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid multiplier `{0}`: expected a decimal with at most four fractional digits")]
pub struct MultiplierParseError(pub String);

impl FromStr for Multiplier {
    type Err = MultiplierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MultiplierParseError(s.to_string());
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !digits(whole) || !digits(frac) || frac.len() > 4 {
            return Err(err());
        }
        let whole: u32 = whole.parse().map_err(|_| err())?;
        let mut frac_bp: u32 = 0;
        for (i, b) in frac.bytes().enumerate() {
            frac_bp += u32::from(b - b'0') * 10u32.pow(3 - i as u32);
        }
        whole
            .checked_mul(MULTIPLIER_SCALE)
            .and_then(|bp| bp.checked_add(frac_bp))
            .map(Multiplier::from_basis_points)
            .ok_or_else(err)
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.basis_points / MULTIPLIER_SCALE;
        let frac = self.basis_points % MULTIPLIER_SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac = format!("{:04}", frac);
        write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl Serialize for Multiplier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Multiplier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Whole(u32),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Whole(n) => n
                .checked_mul(MULTIPLIER_SCALE)
                .map(Multiplier::from_basis_points)
                .ok_or_else(|| serde::de::Error::custom("multiplier out of range")),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// Weight
// ---------------------------------------------------------------------------

/// `amount × multiplier`, truncated toward zero.
pub fn stake_weight(amount: u64, multiplier: Multiplier) -> Result<u64, ArithmeticError> {
    let product = u128::from(amount) * u128::from(multiplier.basis_points);
    let weight = product / u128::from(MULTIPLIER_SCALE);
    u64::try_from(weight).map_err(|_| ArithmeticError::Overflow {
        operation: "stake weight",
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
