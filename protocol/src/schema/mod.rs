//! # Schema Validator
//!
//! A small structural rule engine over transaction JSON. Each transaction
//! type contributes a [`Schema`] fragment that is merged onto the shared
//! base schema for its wire version ([`base::base_schema`]); the merged
//! schema is checked against a candidate and every violation is collected.
//!
//! ```text
//! rules.rs: Rule, Schema, field-level checking
//! merge.rs: order-sensitive merge with a narrowing-only conflict policy
//! base.rs : universal envelope fields per wire version
//! ```
//!
//! Amounts are compared as 256-bit integers parsed from decimal strings, so
//! no value is ever coerced through `f64`.

pub mod base;
pub mod merge;
pub mod rules;

pub use base::base_schema;
pub use merge::SchemaConflict;
pub use rules::{Rule, Schema};

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A single field-level failure. `field` is a dotted path into the
/// candidate (`asset.votes[1]`), `rule` names the broken constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {rule}")]
pub struct SchemaViolation {
    pub field: String,
    pub rule: String,
}

impl SchemaViolation {
    pub fn new(field: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
        }
    }
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(pub Vec<SchemaViolation>);

impl ValidationErrors {
    /// `Ok` when no violations were found.
    pub fn check(violations: Vec<SchemaViolation>) -> Result<(), ValidationErrors> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(violations))
        }
    }

    pub fn violations(&self) -> &[SchemaViolation] {
        &self.0
    }

    /// `true` if any violation is on `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} schema violation(s)", self.0.len())?;
        for v in &self.0 {
            write!(f, "; {}", v)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
