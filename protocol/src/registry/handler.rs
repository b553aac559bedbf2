//! The contract a transaction type implements, and how fees are priced.

use std::fmt;
use std::sync::Arc;

use primitive_types::U256;
use serde_json::Value;

use crate::codec::{CodecError, WireReader, WireWriter};
use crate::config::CURRENT_VERSION;
use crate::milestone::Milestone;
use crate::schema::{Schema, SchemaViolation};
use crate::transaction::amount::parse_units;
use crate::transaction::asset::Asset;
use crate::transaction::types::{CoreType, TypeKey};

// ---------------------------------------------------------------------------
// FeePolicy
// ---------------------------------------------------------------------------

/// How a type's fee is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePolicy {
    /// Fee and amount must both be zero.
    Zero,
    /// A constant fee, independent of height.
    Fixed(u64),
    /// Looked up by type name in the milestone's fee table at validation
    /// time. A special fee overrides the static one.
    Milestone,
}

impl FeePolicy {
    /// The fee a transaction named `name` must carry under `milestone`.
    /// `None` when the milestone has no entry for a milestone-priced type.
    pub fn expected_fee(&self, name: &str, milestone: &Milestone) -> Option<u64> {
        match self {
            Self::Zero => Some(0),
            Self::Fixed(fee) => Some(*fee),
            Self::Milestone => milestone.fees.fee_for(name),
        }
    }

    /// Checks the candidate's `fee` (and `amount`, for [`FeePolicy::Zero`]).
    /// Values that are not amounts at all are left to the schema.
    pub(crate) fn check(
        &self,
        name: &str,
        candidate: &Value,
        milestone: &Milestone,
    ) -> Vec<SchemaViolation> {
        let mut out = Vec::new();
        let Some(expected) = self.expected_fee(name, milestone) else {
            out.push(SchemaViolation::new("fee", "feePolicy"));
            return out;
        };

        if let Some(Ok(fee)) = candidate.get("fee").map(parse_units) {
            if fee != U256::from(expected) {
                out.push(SchemaViolation::new("fee", "feePolicy"));
            }
        }
        if *self == Self::Zero {
            if let Some(Ok(amount)) = candidate.get("amount").map(parse_units) {
                if !amount.is_zero() {
                    out.push(SchemaViolation::new("amount", "feePolicy"));
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// TransactionHandler
// ---------------------------------------------------------------------------

/// A pluggable transaction type.
///
/// Implementations own the type's asset encoding, its schema fragment, and
/// any validation that cannot be expressed structurally. The envelope is
/// handled elsewhere; handlers only ever see the asset.
///
/// `decode_asset` must consume exactly the bytes `encode_asset` wrote,
/// since nothing else marks where the asset ends.
pub trait TransactionHandler: Send + Sync {
    fn key(&self) -> TypeKey;

    /// Registry name; for [`FeePolicy::Milestone`] also the fee-table key.
    fn name(&self) -> &str;

    fn fee_policy(&self) -> FeePolicy;

    /// Fragment merged onto the base schema of each supported version.
    fn schema(&self) -> Schema;

    fn encode_asset(&self, asset: Option<&Asset>, out: &mut WireWriter) -> Result<(), CodecError>;

    fn decode_asset(&self, reader: &mut WireReader<'_>) -> Result<Option<Asset>, CodecError>;

    /// Checks that depend on the milestone snapshot. Runs after the schema.
    fn validate_with(&self, _candidate: &Value, _milestone: &Milestone) -> Vec<SchemaViolation> {
        Vec::new()
    }

    /// Wire versions this type may appear in. Plugin types did not exist
    /// before typeGroups did.
    fn supports_version(&self, version: u8) -> bool {
        version == CURRENT_VERSION
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// The implementation bound to a registry key: a core type dispatched
/// statically, or a plugin behind a trait object.
#[derive(Clone)]
pub enum Handler {
    Core(CoreType),
    Plugin(Arc<dyn TransactionHandler>),
}

impl Handler {
    pub fn key(&self) -> TypeKey {
        match self {
            Self::Core(core) => core.key(),
            Self::Plugin(plugin) => plugin.key(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Core(core) => core.name(),
            Self::Plugin(plugin) => plugin.name(),
        }
    }

    pub fn fee_policy(&self) -> FeePolicy {
        match self {
            Self::Core(core) => core.fee_policy(),
            Self::Plugin(plugin) => plugin.fee_policy(),
        }
    }

    pub fn schema(&self) -> Schema {
        match self {
            Self::Core(core) => core.schema(),
            Self::Plugin(plugin) => plugin.schema(),
        }
    }

    pub fn supports_version(&self, version: u8) -> bool {
        match self {
            Self::Core(core) => core.supports_version(version),
            Self::Plugin(plugin) => plugin.supports_version(version),
        }
    }

    pub fn encode_asset(&self, asset: Option<&Asset>, out: &mut WireWriter) -> Result<(), CodecError> {
        match self {
            Self::Core(core) => core.encode_asset(asset, out),
            Self::Plugin(plugin) => plugin.encode_asset(asset, out),
        }
    }

    pub fn decode_asset(&self, reader: &mut WireReader<'_>) -> Result<Option<Asset>, CodecError> {
        match self {
            Self::Core(core) => core.decode_asset(reader),
            Self::Plugin(plugin) => plugin.decode_asset(reader),
        }
    }

    pub fn validate_with(&self, candidate: &Value, milestone: &Milestone) -> Vec<SchemaViolation> {
        match self {
            Self::Core(core) => core.validate_with(candidate, milestone),
            Self::Plugin(plugin) => plugin.validate_with(candidate, milestone),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core(core) => write!(f, "Core({})", core),
            Self::Plugin(plugin) => write!(f, "Plugin({} {})", plugin.key(), plugin.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn milestone() -> Milestone {
        Milestone::devnet_genesis()
    }

    #[test]
    fn zero_policy_requires_zero_fee_and_amount() {
        let v = FeePolicy::Zero.check("attestation", &json!({ "fee": "1", "amount": "2" }), &milestone());
        assert_eq!(
            v,
            vec![
                SchemaViolation::new("fee", "feePolicy"),
                SchemaViolation::new("amount", "feePolicy"),
            ]
        );
        assert!(FeePolicy::Zero
            .check("attestation", &json!({ "fee": "0", "amount": 0 }), &milestone())
            .is_empty());
    }

    #[test]
    fn milestone_policy_reads_fee_table() {
        let m = milestone();
        assert_eq!(FeePolicy::Milestone.expected_fee("vote", &m), Some(100_000_000));
        assert!(FeePolicy::Milestone
            .check("vote", &json!({ "fee": "100000000" }), &m)
            .is_empty());
        assert_eq!(
            FeePolicy::Milestone.check("vote", &json!({ "fee": "1" }), &m).len(),
            1
        );
    }

    #[test]
    fn special_fee_overrides_static() {
        let mut m = milestone();
        m.fees.special_fees.insert("vote".to_string(), 7);
        assert_eq!(FeePolicy::Milestone.expected_fee("vote", &m), Some(7));
    }

    #[test]
    fn unpriced_type_is_a_violation() {
        let v = FeePolicy::Milestone.check("lottery", &json!({ "fee": "1" }), &milestone());
        assert_eq!(v, vec![SchemaViolation::new("fee", "feePolicy")]);
    }

    #[test]
    fn malformed_fee_is_left_to_the_schema() {
        assert!(FeePolicy::Fixed(5)
            .check("x", &json!({ "fee": 1.5 }), &milestone())
            .is_empty());
    }
}
