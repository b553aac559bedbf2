//! Layering a type's schema fragment onto a base schema.
//!
//! The merge is order-sensitive (`base.merge(fragment)`) and refuses to
//! guess. Required names are unioned. A property defined on only one side
//! is taken as-is. A property defined on both sides must either be
//! identical or the fragment's rule must be a strict narrowing of the
//! base's; anything else is a [`SchemaConflict`].

use thiserror::Error;

use super::rules::{join, Rule, Schema};
use super::SchemaViolation;

/// Two schema layers disagree about a property.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conflicting schema definitions for field `{field}`")]
pub struct SchemaConflict {
    pub field: String,
}

impl Schema {
    /// Returns `self` with `fragment` layered on top.
    pub fn merge(&self, fragment: &Schema) -> Result<Schema, SchemaConflict> {
        self.merge_at("", fragment)
    }

    fn merge_at(&self, path: &str, fragment: &Schema) -> Result<Schema, SchemaConflict> {
        let mut merged = self.clone();
        merged.required.extend(fragment.required.iter().cloned());

        for (name, rule) in &fragment.properties {
            let field = join(path, name);
            let combined = match self.properties.get(name) {
                None => rule.clone(),
                Some(base) => narrow(&field, base, rule)?,
            };
            merged.properties.insert(name.clone(), combined);
        }
        Ok(merged)
    }
}

fn narrow(field: &str, base: &Rule, over: &Rule) -> Result<Rule, SchemaConflict> {
    let conflict = || SchemaConflict {
        field: field.to_string(),
    };

    if base == over {
        return Ok(base.clone());
    }

    match (base, over) {
        (_, Rule::Const(value)) => {
            let mut out: Vec<SchemaViolation> = Vec::new();
            base.check(field, value, &mut out);
            if out.is_empty() {
                Ok(over.clone())
            } else {
                Err(conflict())
            }
        }
        (Rule::Integer { min: a, max: b }, Rule::Integer { min: c, max: d })
            if c >= a && d <= b && c <= d =>
        {
            Ok(over.clone())
        }
        (Rule::Amount { min: a, max: b }, Rule::Amount { min: c, max: d })
            if c >= a && d <= b && c <= d =>
        {
            Ok(over.clone())
        }
        (
            Rule::Text {
                min_len: a,
                max_len: b,
            },
            Rule::Text {
                min_len: c,
                max_len: d,
            },
        ) if c >= a && d <= b && c <= d => Ok(over.clone()),
        (Rule::Object(inner_base), Rule::Object(inner_over)) => {
            inner_base.merge_at(field, inner_over).map(Rule::Object)
        }
        _ => Err(conflict()),
    }
}
