//! Rules and schemas.
//!
//! A [`Schema`] is a set of named properties, each with a [`Rule`], plus the
//! subset of names that must be present. Checking never stops at the first
//! failure: every property is visited and every violation recorded.

use std::collections::{BTreeMap, BTreeSet};

use primitive_types::U256;
use serde_json::{Map, Value};

use super::SchemaViolation;
use crate::crypto::keys::PublicKey;
use crate::transaction::address::Address;
use crate::transaction::amount::{parse_units, UnitsError};

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A constraint on a single JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Exact value. Amount-like values compare numerically, so `"0"` and `0`
    /// are the same constant.
    Const(Value),
    /// JSON integer literal within `[min, max]`.
    Integer { min: u64, max: u64 },
    /// Smallest-unit amount (decimal string or integer) within `[min, max]`,
    /// compared at 256-bit width.
    Amount { min: U256, max: U256 },
    /// UTF-8 string whose byte length lies within `[min_len, max_len]`.
    Text { min_len: usize, max_len: usize },
    /// Delegate username: 1 to `max_len` characters from `a-z0-9!@$&_.`.
    Username { max_len: usize },
    /// Hex string decoding to exactly this many bytes.
    HexBytes(usize),
    /// Hex-encoded compressed secp256k1 point.
    PublicKey,
    /// Base58check address.
    Address,
    /// Base58 string decoding to a byte length within `[min_bytes, max_bytes]`.
    Base58 { min_bytes: usize, max_bytes: usize },
    /// `+<publicKey>` or `-<publicKey>`.
    VoteEntry,
    /// Homogeneous array.
    Array {
        items: Box<Rule>,
        min_items: usize,
        max_items: usize,
        unique: bool,
    },
    /// Nested object.
    Object(Schema),
    /// The property must be missing or `null`. Used for fields another
    /// wire version carries but this one cannot.
    Absent,
}

impl Rule {
    /// Any amount that fits the `u64` wire domain.
    pub fn amount() -> Self {
        Rule::Amount {
            min: U256::zero(),
            max: U256::from(u64::MAX),
        }
    }

    /// A `u64` amount of at least `min`.
    pub fn amount_at_least(min: u64) -> Self {
        Rule::Amount {
            min: U256::from(min),
            max: U256::from(u64::MAX),
        }
    }

    /// The amount-valued constant zero.
    pub fn zero_amount() -> Self {
        Rule::Const(Value::String("0".to_string()))
    }

    /// Checks `value` and appends any violations found under `path`.
    pub fn check(&self, path: &str, value: &Value, out: &mut Vec<SchemaViolation>) {
        match self {
            Rule::Array {
                items,
                min_items,
                max_items,
                unique,
            } => {
                let Some(array) = value.as_array() else {
                    out.push(SchemaViolation::new(path, "type:array"));
                    return;
                };
                if array.len() < *min_items {
                    out.push(SchemaViolation::new(path, "minItems"));
                }
                if array.len() > *max_items {
                    out.push(SchemaViolation::new(path, "maxItems"));
                }
                if *unique && has_duplicates(array) {
                    out.push(SchemaViolation::new(path, "uniqueItems"));
                }
                for (i, item) in array.iter().enumerate() {
                    items.check(&format!("{}[{}]", path, i), item, out);
                }
            }
            Rule::Object(schema) => schema.check_object(path, value, out),
            scalar => {
                if let Some(rule) = scalar.check_scalar(value) {
                    out.push(SchemaViolation::new(path, rule));
                }
            }
        }
    }

    /// First broken constraint of a non-container rule, if any.
    fn check_scalar(&self, value: &Value) -> Option<&'static str> {
        match self {
            Rule::Absent => Some("absent"),
            Rule::Const(expected) => (!const_matches(expected, value)).then_some("const"),
            Rule::Integer { min, max } => match value.as_u64() {
                None => Some("type:integer"),
                Some(n) if n < *min => Some("minimum"),
                Some(n) if n > *max => Some("maximum"),
                Some(_) => None,
            },
            Rule::Amount { min, max } => match parse_units(value) {
                Err(UnitsError::NotInteger) => Some("type:amount"),
                Err(UnitsError::TooLarge) => Some("maximum"),
                Ok(n) if n < *min => Some("minimum"),
                Ok(n) if n > *max => Some("maximum"),
                Ok(_) => None,
            },
            string_rule => {
                let Some(s) = value.as_str() else {
                    return Some("type:string");
                };
                string_rule.check_str(s)
            }
        }
    }

    fn check_str(&self, s: &str) -> Option<&'static str> {
        match self {
            Rule::Text { min_len, max_len } => {
                if s.len() < *min_len {
                    Some("minLength")
                } else if s.len() > *max_len {
                    Some("maxLength")
                } else {
                    None
                }
            }
            Rule::Username { max_len } => (!is_username(s, *max_len)).then_some("format:username"),
            Rule::HexBytes(len) => {
                let ok = hex::decode(s).is_ok_and(|b| b.len() == *len);
                (!ok).then_some("format:hex")
            }
            Rule::PublicKey => (!is_public_key(s)).then_some("format:publicKey"),
            Rule::Address => s.parse::<Address>().is_err().then_some("format:address"),
            Rule::Base58 {
                min_bytes,
                max_bytes,
            } => {
                let ok = bs58::decode(s)
                    .into_vec()
                    .is_ok_and(|b| b.len() >= *min_bytes && b.len() <= *max_bytes);
                (!ok).then_some("format:base58")
            }
            Rule::VoteEntry => {
                let ok = s
                    .strip_prefix('+')
                    .or_else(|| s.strip_prefix('-'))
                    .is_some_and(is_public_key);
                (!ok).then_some("format:vote")
            }
            _ => None,
        }
    }
}

fn const_matches(expected: &Value, value: &Value) -> bool {
    if expected == value {
        return true;
    }
    match (parse_units(expected), parse_units(value)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn is_username(s: &str, max_len: usize) -> bool {
    !s.is_empty()
        && s.len() <= max_len
        && s.bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'!' | b'@' | b'$' | b'&' | b'_' | b'.'))
}

fn is_public_key(s: &str) -> bool {
    PublicKey::from_hex(s).is_ok_and(|pk| pk.is_valid_point())
}

fn has_duplicates(array: &[Value]) -> bool {
    array
        .iter()
        .enumerate()
        .any(|(i, a)| array[i + 1..].iter().any(|b| a == b))
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// A set of property rules plus the names that must be present.
///
/// Properties not listed are ignored. A present-but-`null` property counts
/// as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub(crate) properties: BTreeMap<String, Rule>,
    pub(crate) required: BTreeSet<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property that must be present.
    pub fn required(mut self, name: &str, rule: Rule) -> Self {
        self.properties.insert(name.to_string(), rule);
        self.required.insert(name.to_string());
        self
    }

    /// Adds a property that is checked only when present.
    pub fn optional(mut self, name: &str, rule: Rule) -> Self {
        self.properties.insert(name.to_string(), rule);
        self
    }

    /// Marks `name` as required without giving it a rule here. Used by
    /// fragments to tighten a base property they do not otherwise narrow.
    pub fn require(mut self, name: &str) -> Self {
        self.required.insert(name.to_string());
        self
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.properties.get(name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    /// Checks a candidate and returns every violation found.
    pub fn validate(&self, candidate: &Value) -> Vec<SchemaViolation> {
        let mut out = Vec::new();
        self.check_object("", candidate, &mut out);
        out
    }

    pub(crate) fn check_object(&self, path: &str, value: &Value, out: &mut Vec<SchemaViolation>) {
        let Some(object) = value.as_object() else {
            out.push(SchemaViolation::new(
                if path.is_empty() { "$" } else { path },
                "type:object",
            ));
            return;
        };

        for name in &self.required {
            if !is_present(object, name) {
                out.push(SchemaViolation::new(join(path, name), "required"));
            }
        }

        for (name, rule) in &self.properties {
            if let Some(v) = object.get(name).filter(|v| !v.is_null()) {
                rule.check(&join(path, name), v, out);
            }
        }
    }
}

fn is_present(object: &Map<String, Value>, name: &str) -> bool {
    object.get(name).is_some_and(|v| !v.is_null())
}

pub(crate) fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
