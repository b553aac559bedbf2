//! The transaction envelope and its fluent builder.
//!
//! [`TransactionBuilder`] starts from a registered type's defaults and
//! accumulates fields through setters, then hands back an unsigned
//! [`Transaction`]. It never signs and never submits; see
//! [`super::signing`] for the former.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::address::Address;
use super::amount;
use super::asset::{
    Asset, AttestationAsset, ContentHash, DelegateAsset, Payment, SecondSignatureAsset,
    StakeCreateAsset, StakeId, StakeRef, VoteEntry,
};
use super::types::TypeKey;
use super::verification::TransactionError;
use crate::config::{NetworkConfig, CORE_TYPE_GROUP, CURRENT_VERSION, LEGACY_VERSION};
use crate::crypto::{PublicKey, Signature};
use crate::milestone::Milestone;
use crate::registry::{RegistryError, TypeDescriptor, TypeRegistry};
use crate::schema::{Schema, ValidationErrors};

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A transaction envelope plus its type-specific asset.
///
/// Field presence depends on the wire version: version 2 carries `nonce`
/// and an explicit `typeGroup`, version 1 carries `timestamp` and is
/// always in the core group.
///
/// `id` is the hex SHA-256 of the full wire encoding, signature included,
/// so it only exists once the transaction is signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default = "legacy_version")]
    pub version: u8,

    #[serde(default = "core_group")]
    pub type_group: u32,

    #[serde(rename = "type")]
    pub tx_type: u16,

    /// Per-sender sequence number (version 2).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "amount::option_as_string"
    )]
    pub nonce: Option<u64>,

    /// Seconds since the network epoch (version 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u32>,

    #[serde(with = "amount::as_string")]
    pub amount: u64,

    #[serde(with = "amount::as_string")]
    pub fee: u64,

    pub sender_public_key: PublicKey,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<Address>,

    /// Free-form UTF-8 memo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<Asset>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

fn legacy_version() -> u8 {
    LEGACY_VERSION
}

fn core_group() -> u32 {
    CORE_TYPE_GROUP
}

impl Transaction {
    pub fn key(&self) -> TypeKey {
        TypeKey::new(self.type_group, self.tx_type)
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// The JSON form the schema validator checks.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`]s.
///
/// ```rust,no_run
/// use stakeweave_protocol::crypto::Keypair;
/// use stakeweave_protocol::milestone::Milestone;
/// use stakeweave_protocol::registry::TypeRegistry;
/// use stakeweave_protocol::transaction::{CoreType, TransactionBuilder};
///
/// let registry = TypeRegistry::new().unwrap();
/// let sender = Keypair::from_secret_bytes(&[1; 32]).unwrap();
/// let delegate = Keypair::from_secret_bytes(&[2; 32]).unwrap();
///
/// let tx = TransactionBuilder::new(&registry, CoreType::Vote.key(), sender.public_key())
///     .unwrap()
///     .nonce(4)
///     .vote(delegate.public_key())
///     .fee_from_milestone(&Milestone::devnet_genesis())
///     .build()
///     .unwrap();
/// ```
///
/// Defaults: version 2, nonce 1, zero amount and fee, no asset.
pub struct TransactionBuilder {
    descriptor: Arc<TypeDescriptor>,
    tx: Transaction,
}

impl TransactionBuilder {
    /// Starts a transaction of the type registered under `key`.
    pub fn new(
        registry: &TypeRegistry,
        key: TypeKey,
        sender_public_key: PublicKey,
    ) -> Result<Self, RegistryError> {
        let descriptor = registry.resolve(key)?;
        Ok(Self {
            descriptor,
            tx: Transaction {
                id: None,
                version: CURRENT_VERSION,
                type_group: key.type_group,
                tx_type: key.tx_type,
                nonce: Some(1),
                timestamp: None,
                amount: 0,
                fee: 0,
                sender_public_key,
                recipient_id: None,
                vendor_field: None,
                asset: None,
                signature: None,
            },
        })
    }

    /// Switches the wire layout. Version 1 trades the nonce for a timestamp.
    pub fn version(mut self, version: u8) -> Self {
        self.tx.version = version;
        if version == LEGACY_VERSION {
            self.tx.nonce = None;
            self.tx.timestamp.get_or_insert(0);
        } else {
            self.tx.timestamp = None;
            self.tx.nonce.get_or_insert(1);
        }
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.tx.nonce = Some(nonce);
        self
    }

    /// Legacy timestamp, in seconds since the network epoch.
    pub fn timestamp(mut self, timestamp: u32) -> Self {
        self.tx.timestamp = Some(timestamp);
        self
    }

    /// Legacy timestamp taken from the wall clock.
    pub fn timestamp_now(self, network: &NetworkConfig) -> Self {
        let seconds = network.seconds_since_epoch(Utc::now());
        self.timestamp(seconds)
    }

    pub fn amount(mut self, amount: u64) -> Self {
        self.tx.amount = amount;
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.tx.fee = fee;
        self
    }

    /// Sets the fee the type's policy demands under `milestone`. Leaves the
    /// fee untouched if the milestone does not price this type.
    pub fn fee_from_milestone(mut self, milestone: &Milestone) -> Self {
        if let Some(fee) = self.descriptor.expected_fee(milestone) {
            self.tx.fee = fee;
        }
        self
    }

    pub fn recipient(mut self, recipient: Address) -> Self {
        self.tx.recipient_id = Some(recipient);
        self
    }

    /// An empty memo is the same as no memo.
    pub fn vendor_field(mut self, memo: &str) -> Self {
        self.tx.vendor_field = (!memo.is_empty()).then(|| memo.to_string());
        self
    }

    /// Sets the asset directly, for plugin types without a dedicated setter.
    pub fn asset(mut self, asset: Asset) -> Self {
        self.tx.asset = Some(asset);
        self
    }

    pub fn second_public_key(self, public_key: PublicKey) -> Self {
        self.asset(Asset::SecondSignature {
            signature: SecondSignatureAsset { public_key },
        })
    }

    pub fn username(self, username: &str) -> Self {
        self.asset(Asset::DelegateRegistration {
            delegate: DelegateAsset {
                username: username.to_string(),
            },
        })
    }

    pub fn votes(self, votes: Vec<VoteEntry>) -> Self {
        self.asset(Asset::Vote { votes })
    }

    /// Appends a vote for `delegate`.
    pub fn vote(self, delegate: PublicKey) -> Self {
        self.push_vote(VoteEntry::Vote(delegate))
    }

    /// Appends an unvote for `delegate`.
    pub fn unvote(self, delegate: PublicKey) -> Self {
        self.push_vote(VoteEntry::Unvote(delegate))
    }

    fn push_vote(mut self, entry: VoteEntry) -> Self {
        match &mut self.tx.asset {
            Some(Asset::Vote { votes }) => votes.push(entry),
            _ => self.tx.asset = Some(Asset::Vote { votes: vec![entry] }),
        }
        self
    }

    pub fn ipfs(self, hash: ContentHash) -> Self {
        self.asset(Asset::Ipfs { ipfs: hash })
    }

    /// Appends a recipient to a multi-payment.
    pub fn add_payment(mut self, amount: u64, recipient_id: Address) -> Self {
        let payment = Payment {
            amount,
            recipient_id,
        };
        match &mut self.tx.asset {
            Some(Asset::MultiPayment { payments }) => payments.push(payment),
            _ => {
                self.tx.asset = Some(Asset::MultiPayment {
                    payments: vec![payment],
                })
            }
        }
        self
    }

    pub fn stake_create(self, duration: u64, amount: u64, timestamp: u64) -> Self {
        self.asset(Asset::StakeCreate {
            stake_create: StakeCreateAsset {
                duration,
                amount,
                timestamp,
            },
        })
    }

    pub fn stake_redeem(self, id: StakeId) -> Self {
        self.asset(Asset::StakeRedeem {
            stake_redeem: StakeRef { id },
        })
    }

    pub fn stake_cancel(self, id: StakeId) -> Self {
        self.asset(Asset::StakeCancel {
            stake_cancel: StakeRef { id },
        })
    }

    pub fn attestation(self, hash: ContentHash) -> Self {
        self.asset(Asset::Attestation {
            attestation: AttestationAsset { hash },
        })
    }

    /// Produces the unsigned transaction. The draft is checked against the
    /// type's merged schema; fee policy and milestone-dependent checks are
    /// left to [`TransactionBuilder::build_for`] or verification.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::UnsupportedVersion`] if the type has no layout
    ///   for the chosen version.
    /// - [`TransactionError::Codec`] if the asset does not belong to this
    ///   type or cannot be encoded.
    /// - [`TransactionError::Validation`] with every schema violation.
    pub fn build(self) -> Result<Transaction, TransactionError> {
        let schema = self.layout()?;
        ValidationErrors::check(schema.validate(&self.tx.to_json()?))?;
        Ok(self.finish())
    }

    /// Like [`TransactionBuilder::build`], but also runs the fee policy and
    /// the type's own checks against `milestone`.
    pub fn build_for(self, milestone: &Milestone) -> Result<Transaction, TransactionError> {
        self.layout()?;
        self.descriptor.validate(&self.tx.to_json()?, milestone)?;
        Ok(self.finish())
    }

    fn layout(&self) -> Result<&Schema, TransactionError> {
        let unsupported = || TransactionError::UnsupportedVersion {
            key: self.descriptor.key(),
            version: self.tx.version,
        };
        let schema = self.descriptor.schema(self.tx.version).ok_or_else(unsupported)?;
        self.descriptor.encode_asset(self.tx.asset.as_ref())?;
        Ok(schema)
    }

    fn finish(self) -> Transaction {
        debug!(
            key = %self.descriptor.key(),
            name = self.descriptor.name(),
            fee = self.tx.fee,
            "built transaction"
        );
        self.tx
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
