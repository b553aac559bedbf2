//! Stake and attestation transaction types (typeGroup 100).
//!
//! These are ordinary plugins: nothing in the registry or codec knows
//! about them beyond the [`TransactionHandler`] trait. A node that stakes
//! calls [`register_stake_types`] once at startup.

use std::sync::Arc;

use serde_json::{json, Value};

use super::weight::DurationBucket;
use crate::codec::{CodecError, WireReader, WireWriter};
use crate::config::{
    MAX_CONTENT_HASH_LENGTH, MIN_CONTENT_HASH_LENGTH, STAKE_ID_LENGTH, STAKE_TYPE_GROUP,
};
use crate::milestone::Milestone;
use crate::registry::{FeePolicy, RegistryError, TransactionHandler, TypeRegistry};
use crate::schema::{Rule, Schema, SchemaViolation};
use crate::transaction::asset::{
    Asset, AttestationAsset, ContentHash, StakeCreateAsset, StakeId, StakeRef,
};
use crate::transaction::types::TypeKey;

pub const STAKE_CREATE: TypeKey = TypeKey::new(STAKE_TYPE_GROUP, 0);
pub const STAKE_REDEEM: TypeKey = TypeKey::new(STAKE_TYPE_GROUP, 1);
pub const STAKE_CANCEL: TypeKey = TypeKey::new(STAKE_TYPE_GROUP, 2);
pub const ATTESTATION: TypeKey = TypeKey::new(STAKE_TYPE_GROUP, 3);

/// Registers all four types. Fails on the first key already bound.
pub fn register_stake_types(registry: &TypeRegistry) -> Result<(), RegistryError> {
    registry.register(Arc::new(StakeCreateHandler))?;
    registry.register(Arc::new(StakeRedeemHandler))?;
    registry.register(Arc::new(StakeCancelHandler))?;
    registry.register(Arc::new(AttestationHandler))?;
    Ok(())
}

/// Envelope constraints shared by the group: fixed type, fixed group, no
/// transferred amount.
fn fragment(key: TypeKey) -> Schema {
    Schema::new()
        .required("type", Rule::Const(json!(key.tx_type)))
        .required("typeGroup", Rule::Const(json!(key.type_group)))
        .required("amount", Rule::zero_amount())
}

fn asset_schema(name: &str, body: Schema) -> Rule {
    Rule::Object(Schema::new().required(name, Rule::Object(body)))
}

fn mismatch(name: &str) -> CodecError {
    CodecError::AssetMismatch {
        expected: name.to_string(),
    }
}

// ---------------------------------------------------------------------------
// StakeCreate
// ---------------------------------------------------------------------------

/// Locks `amount` for `duration` seconds.
///
/// Wire: `duration u64 | amount u64 | timestamp u64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StakeCreateHandler;

impl TransactionHandler for StakeCreateHandler {
    fn key(&self) -> TypeKey {
        STAKE_CREATE
    }

    fn name(&self) -> &str {
        "stakeCreate"
    }

    fn fee_policy(&self) -> FeePolicy {
        FeePolicy::Milestone
    }

    fn schema(&self) -> Schema {
        let any_u64 = Rule::Integer {
            min: 0,
            max: u64::MAX,
        };
        fragment(STAKE_CREATE).required(
            "asset",
            asset_schema(
                "stakeCreate",
                Schema::new()
                    .required("duration", any_u64.clone())
                    .required("amount", Rule::amount_at_least(1))
                    .required("timestamp", any_u64),
            ),
        )
    }

    fn encode_asset(&self, asset: Option<&Asset>, out: &mut WireWriter) -> Result<(), CodecError> {
        let Some(Asset::StakeCreate { stake_create }) = asset else {
            return Err(mismatch(self.name()));
        };
        out.put_u64(stake_create.duration);
        out.put_u64(stake_create.amount);
        out.put_u64(stake_create.timestamp);
        Ok(())
    }

    fn decode_asset(&self, reader: &mut WireReader<'_>) -> Result<Option<Asset>, CodecError> {
        let stake_create = StakeCreateAsset {
            duration: reader.u64()?,
            amount: reader.u64()?,
            timestamp: reader.u64()?,
        };
        Ok(Some(Asset::StakeCreate { stake_create }))
    }

    /// The duration must fall in a bucket of the current milestone.
    fn validate_with(&self, candidate: &Value, milestone: &Milestone) -> Vec<SchemaViolation> {
        let duration = candidate
            .pointer("/asset/stakeCreate/duration")
            .and_then(Value::as_u64);
        match duration {
            Some(d) if DurationBucket::classify(d, &milestone.duration_floors).is_none() => vec![
                SchemaViolation::new("asset.stakeCreate.duration", "durationBucket"),
            ],
            _ => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// StakeRedeem / StakeCancel
// ---------------------------------------------------------------------------

fn stake_ref_schema(key: TypeKey, name: &str) -> Schema {
    fragment(key).required(
        "asset",
        asset_schema(name, Schema::new().required("id", Rule::HexBytes(STAKE_ID_LENGTH))),
    )
}

/// Returns a matured stake to the sender's balance.
///
/// Wire: `len u8 (= 32) | stake id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StakeRedeemHandler;

impl TransactionHandler for StakeRedeemHandler {
    fn key(&self) -> TypeKey {
        STAKE_REDEEM
    }

    fn name(&self) -> &str {
        "stakeRedeem"
    }

    fn fee_policy(&self) -> FeePolicy {
        FeePolicy::Milestone
    }

    fn schema(&self) -> Schema {
        stake_ref_schema(STAKE_REDEEM, self.name())
    }

    fn encode_asset(&self, asset: Option<&Asset>, out: &mut WireWriter) -> Result<(), CodecError> {
        match asset {
            Some(Asset::StakeRedeem { stake_redeem }) => stake_redeem.id.write(out),
            _ => Err(mismatch(self.name())),
        }
    }

    fn decode_asset(&self, reader: &mut WireReader<'_>) -> Result<Option<Asset>, CodecError> {
        let id = StakeId::read(reader)?;
        Ok(Some(Asset::StakeRedeem {
            stake_redeem: StakeRef { id },
        }))
    }
}

/// Withdraws a stake before it powers up. Same wire layout as redemption.
#[derive(Debug, Clone, Copy, Default)]
pub struct StakeCancelHandler;

impl TransactionHandler for StakeCancelHandler {
    fn key(&self) -> TypeKey {
        STAKE_CANCEL
    }

    fn name(&self) -> &str {
        "stakeCancel"
    }

    fn fee_policy(&self) -> FeePolicy {
        FeePolicy::Milestone
    }

    fn schema(&self) -> Schema {
        stake_ref_schema(STAKE_CANCEL, self.name())
    }

    fn encode_asset(&self, asset: Option<&Asset>, out: &mut WireWriter) -> Result<(), CodecError> {
        match asset {
            Some(Asset::StakeCancel { stake_cancel }) => stake_cancel.id.write(out),
            _ => Err(mismatch(self.name())),
        }
    }

    fn decode_asset(&self, reader: &mut WireReader<'_>) -> Result<Option<Asset>, CodecError> {
        let id = StakeId::read(reader)?;
        Ok(Some(Asset::StakeCancel {
            stake_cancel: StakeRef { id },
        }))
    }
}

// ---------------------------------------------------------------------------
// Attestation
// ---------------------------------------------------------------------------

/// Anchors a content hash on chain. Free: fee and amount are both zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttestationHandler;

impl TransactionHandler for AttestationHandler {
    fn key(&self) -> TypeKey {
        ATTESTATION
    }

    fn name(&self) -> &str {
        "attestation"
    }

    fn fee_policy(&self) -> FeePolicy {
        FeePolicy::Zero
    }

    fn schema(&self) -> Schema {
        fragment(ATTESTATION).required(
            "asset",
            asset_schema(
                "attestation",
                Schema::new().required(
                    "hash",
                    Rule::Base58 {
                        min_bytes: MIN_CONTENT_HASH_LENGTH,
                        max_bytes: MAX_CONTENT_HASH_LENGTH,
                    },
                ),
            ),
        )
    }

    fn encode_asset(&self, asset: Option<&Asset>, out: &mut WireWriter) -> Result<(), CodecError> {
        match asset {
            Some(Asset::Attestation { attestation }) => attestation.hash.write("attestation", out),
            _ => Err(mismatch(self.name())),
        }
    }

    fn decode_asset(&self, reader: &mut WireReader<'_>) -> Result<Option<Asset>, CodecError> {
        let hash = ContentHash::read("attestation", reader)?;
        Ok(Some(Asset::Attestation {
            attestation: AttestationAsset { hash },
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
