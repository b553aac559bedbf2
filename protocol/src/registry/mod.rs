//! # Transaction Type Registry
//!
//! Maps a `(typeGroup, type)` key to the one implementation currently bound
//! to it. Core types (group 1) are installed at construction and cannot be
//! removed or replaced; plugin types are added and removed at runtime.
//!
//! The registry is shared (`Arc<TypeRegistry>`) between everything that
//! validates or serializes transactions. Mutations take the write lock for
//! the whole check-then-insert, so two registrations racing for the same key
//! cannot both succeed. Lookups take the read lock briefly and hand out an
//! `Arc<TypeDescriptor>` that stays valid even if the key is later
//! deregistered.
//!
//! ```text
//! handler.rs: TransactionHandler trait, Handler dispatch, FeePolicy
//! ```

pub mod handler;

pub use handler::{FeePolicy, Handler, TransactionHandler};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::{CodecError, WireReader, WireWriter};
use crate::config::{CURRENT_VERSION, LEGACY_VERSION};
use crate::milestone::Milestone;
use crate::schema::{base_schema, Schema, SchemaViolation, ValidationErrors};
use crate::transaction::asset::Asset;
use crate::transaction::types::{CoreType, TypeKey};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("transaction type {0} is already registered")]
    DuplicateType(TypeKey),

    #[error("transaction type {0} is not registered")]
    NotRegistered(TypeKey),

    #[error("unknown transaction type {0}")]
    UnknownType(TypeKey),

    #[error("transaction type {0} belongs to the core group and cannot be changed")]
    CoreTypeLocked(TypeKey),

    #[error("schema of transaction type {key} conflicts with the base schema at `{field}`")]
    SchemaConflict { key: TypeKey, field: String },
}

// ---------------------------------------------------------------------------
// TypeDescriptor
// ---------------------------------------------------------------------------

/// Everything the registry knows about one bound type: its handler, fee
/// policy, and the fully merged schema for each wire version it supports.
#[derive(Debug)]
pub struct TypeDescriptor {
    key: TypeKey,
    name: String,
    fee_policy: FeePolicy,
    schemas: BTreeMap<u8, Schema>,
    handler: Handler,
}

impl TypeDescriptor {
    /// Merges the handler's fragment onto each supported base schema.
    pub fn new(handler: Handler) -> Result<Self, RegistryError> {
        let key = handler.key();
        let fragment = handler.schema();
        let mut schemas = BTreeMap::new();
        for version in [LEGACY_VERSION, CURRENT_VERSION] {
            if !handler.supports_version(version) {
                continue;
            }
            let Some(base) = base_schema(version) else {
                continue;
            };
            let merged = base
                .merge(&fragment)
                .map_err(|conflict| RegistryError::SchemaConflict {
                    key,
                    field: conflict.field,
                })?;
            schemas.insert(version, merged);
        }

        Ok(Self {
            key,
            name: handler.name().to_string(),
            fee_policy: handler.fee_policy(),
            schemas,
            handler,
        })
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fee_policy(&self) -> FeePolicy {
        self.fee_policy
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn supports_version(&self, version: u8) -> bool {
        self.schemas.contains_key(&version)
    }

    /// The merged schema for `version`.
    pub fn schema(&self, version: u8) -> Option<&Schema> {
        self.schemas.get(&version)
    }

    /// The fee this type costs under `milestone`, if priced.
    pub fn expected_fee(&self, milestone: &Milestone) -> Option<u64> {
        self.fee_policy.expected_fee(&self.name, milestone)
    }

    /// Serializes just the asset payload.
    pub fn encode_asset(&self, asset: Option<&Asset>) -> Result<Vec<u8>, CodecError> {
        let mut out = WireWriter::new();
        self.handler.encode_asset(asset, &mut out)?;
        Ok(out.into_vec())
    }

    /// Reads an asset starting at `cursor` and reports how many bytes it
    /// occupied.
    pub fn decode_asset(
        &self,
        bytes: &[u8],
        cursor: usize,
    ) -> Result<(Option<Asset>, usize), CodecError> {
        let mut reader = WireReader::at(bytes, cursor)?;
        let asset = self.handler.decode_asset(&mut reader)?;
        Ok((asset, reader.position() - cursor))
    }

    /// Validates a candidate transaction's JSON against the merged schema,
    /// the fee policy, and the handler's own checks. All three run to
    /// completion and every violation is returned together.
    ///
    /// `milestone` is the snapshot for the height being validated against;
    /// it is used as-is for every check.
    pub fn validate(&self, candidate: &Value, milestone: &Milestone) -> Result<(), ValidationErrors> {
        let version = match candidate.get("version") {
            None | Some(Value::Null) => Some(LEGACY_VERSION),
            Some(v) => v.as_u64().and_then(|v| u8::try_from(v).ok()),
        };
        let Some(schema) = version.and_then(|v| self.schemas.get(&v)) else {
            return Err(ValidationErrors(vec![SchemaViolation::new(
                "version",
                "unsupported",
            )]));
        };

        let mut violations = schema.validate(candidate);
        violations.extend(self.fee_policy.check(&self.name, candidate, milestone));
        violations.extend(self.handler.validate_with(candidate, milestone));

        debug!(
            key = %self.key,
            name = %self.name,
            violations = violations.len(),
            "validated transaction candidate"
        );
        ValidationErrors::check(violations)
    }
}

// ---------------------------------------------------------------------------
// TypeRegistry
// ---------------------------------------------------------------------------

/// Process-wide table of transaction types.
pub struct TypeRegistry {
    types: RwLock<HashMap<TypeKey, Arc<TypeDescriptor>>>,
}

impl TypeRegistry {
    /// A registry holding every core type and nothing else.
    pub fn new() -> Result<Self, RegistryError> {
        let mut types = HashMap::new();
        for core in CoreType::ALL {
            let descriptor = TypeDescriptor::new(Handler::Core(core))?;
            types.insert(core.key(), Arc::new(descriptor));
        }
        Ok(Self {
            types: RwLock::new(types),
        })
    }

    /// Binds a plugin type to its key.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::CoreTypeLocked`] if the key is in the core group.
    /// - [`RegistryError::DuplicateType`] if the key is already bound. Use
    ///   [`TypeRegistry::register_replacing`] to swap implementations.
    /// - [`RegistryError::SchemaConflict`] if the handler's fragment cannot
    ///   be merged onto the base schema.
    pub fn register(
        &self,
        handler: Arc<dyn TransactionHandler>,
    ) -> Result<Arc<TypeDescriptor>, RegistryError> {
        let descriptor = Self::plugin_descriptor(handler)?;
        let key = descriptor.key;

        let mut types = self.types.write();
        if types.contains_key(&key) {
            warn!(%key, "rejected duplicate transaction type registration");
            return Err(RegistryError::DuplicateType(key));
        }
        types.insert(key, Arc::clone(&descriptor));
        info!(%key, name = %descriptor.name, "registered transaction type");
        Ok(descriptor)
    }

    /// Binds a plugin type, replacing whatever was bound to its key.
    /// Returns the previous descriptor, if any.
    pub fn register_replacing(
        &self,
        handler: Arc<dyn TransactionHandler>,
    ) -> Result<Option<Arc<TypeDescriptor>>, RegistryError> {
        let descriptor = Self::plugin_descriptor(handler)?;
        let key = descriptor.key;

        let previous = self.types.write().insert(key, Arc::clone(&descriptor));
        match &previous {
            Some(old) => warn!(
                %key,
                old = %old.name,
                new = %descriptor.name,
                "replaced transaction type"
            ),
            None => info!(%key, name = %descriptor.name, "registered transaction type"),
        }
        Ok(previous)
    }

    /// Unbinds a plugin type. Descriptors already handed out stay usable.
    pub fn deregister(&self, key: TypeKey) -> Result<Arc<TypeDescriptor>, RegistryError> {
        if key.is_core() {
            return Err(RegistryError::CoreTypeLocked(key));
        }
        let removed = self
            .types
            .write()
            .remove(&key)
            .ok_or(RegistryError::NotRegistered(key))?;
        info!(%key, name = %removed.name, "deregistered transaction type");
        Ok(removed)
    }

    pub fn resolve(&self, key: TypeKey) -> Result<Arc<TypeDescriptor>, RegistryError> {
        self.types
            .read()
            .get(&key)
            .cloned()
            .ok_or(RegistryError::UnknownType(key))
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.types.read().contains_key(&key)
    }

    /// Every bound key, sorted.
    pub fn keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self.types.read().keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    fn plugin_descriptor(
        handler: Arc<dyn TransactionHandler>,
    ) -> Result<Arc<TypeDescriptor>, RegistryError> {
        let key = handler.key();
        if key.is_core() {
            return Err(RegistryError::CoreTypeLocked(key));
        }
        TypeDescriptor::new(Handler::Plugin(handler)).map(Arc::new)
    }
}
