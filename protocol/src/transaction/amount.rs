//! Smallest-unit amount handling for the JSON side of the protocol.
//!
//! On the wire every amount is a little-endian `u64`. In JSON they travel as
//! decimal strings, because clients routinely hold values beyond what a
//! double can represent exactly. Parsing goes through `U256` so oversized
//! inputs are compared exactly instead of being rounded into range.

use std::collections::BTreeMap;
use std::fmt;

use primitive_types::U256;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Why a JSON value is not a smallest-unit amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitsError {
    /// Not a non-negative integer (negative, fractional, or not a number).
    NotInteger,
    /// An integer, but wider than 256 bits.
    TooLarge,
}

impl fmt::Display for UnitsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInteger => write!(f, "expected a non-negative integer amount"),
            Self::TooLarge => write!(f, "amount exceeds 256 bits"),
        }
    }
}

/// Parses a decimal digit string into an arbitrary-width integer.
pub fn parse_decimal(text: &str) -> Result<U256, UnitsError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UnitsError::NotInteger);
    }
    U256::from_dec_str(text).map_err(|_| UnitsError::TooLarge)
}

/// Reads an amount from a JSON value: a decimal string or an unsigned
/// integer literal. Floats are rejected outright, even `1.0`.
pub fn parse_units(value: &Value) -> Result<U256, UnitsError> {
    match value {
        Value::String(text) => parse_decimal(text),
        Value::Number(n) => n.as_u64().map(U256::from).ok_or(UnitsError::NotInteger),
        _ => Err(UnitsError::NotInteger),
    }
}

fn narrow(value: U256) -> Option<u64> {
    if value > U256::from(u64::MAX) {
        None
    } else {
        Some(value.low_u64())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUnits {
    Number(u64),
    Text(String),
}

impl RawUnits {
    fn into_u64(self) -> Result<u64, String> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(text) => {
                let wide = parse_decimal(&text).map_err(|e| e.to_string())?;
                narrow(wide).ok_or_else(|| format!("amount {} exceeds u64 range", text))
            }
        }
    }
}

/// `#[serde(with = "amount::as_string")]` for `u64` amount fields.
pub mod as_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        RawUnits::deserialize(deserializer)?
            .into_u64()
            .map_err(D::Error::custom)
    }
}

/// Same as [`as_string`] for optional fields.
pub mod option_as_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        Option::<RawUnits>::deserialize(deserializer)?
            .map(RawUnits::into_u64)
            .transpose()
            .map_err(D::Error::custom)
    }
}

/// Amount-valued maps, e.g. the milestone fee tables.
pub mod map_as_string {
    use super::*;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, u64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(map.iter().map(|(k, v)| (k, v.to_string())))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, u64>, D::Error> {
        BTreeMap::<String, RawUnits>::deserialize(deserializer)?
            .into_iter()
            .map(|(k, v)| v.into_u64().map(|v| (k, v)))
            .collect::<Result<_, _>>()
            .map_err(D::Error::custom)
    }
}
