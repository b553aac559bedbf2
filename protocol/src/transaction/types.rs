//! Type identifiers.
//!
//! Every transaction names its kind with a `(typeGroup, type)` pair. Group 1
//! is the core namespace and its members are a closed enum; everything else
//! is resolved through the registry at runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CORE_TYPE_GROUP;

// ---------------------------------------------------------------------------
// TypeKey
// ---------------------------------------------------------------------------

/// Registry key for a transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeKey {
    pub type_group: u32,
    #[serde(rename = "type")]
    pub tx_type: u16,
}

impl TypeKey {
    pub const fn new(type_group: u32, tx_type: u16) -> Self {
        Self {
            type_group,
            tx_type,
        }
    }

    pub fn is_core(&self) -> bool {
        self.type_group == CORE_TYPE_GROUP
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_group, self.tx_type)
    }
}

// ---------------------------------------------------------------------------
// CoreType
// ---------------------------------------------------------------------------

/// Built-in transaction types of the core group.
///
/// Type 4 (multisignature registration) is not supported and is left
/// unassigned rather than reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoreType {
    /// Value transfer to the envelope's `recipientId`.
    Transfer,
    /// Registers a second public key whose signature is then required.
    SecondSignature,
    /// Claims a delegate username for the sender.
    DelegateRegistration,
    /// Casts or withdraws votes for delegates.
    Vote,
    /// Anchors an IPFS content hash.
    Ipfs,
    /// Pays several recipients in one transaction.
    MultiPayment,
    /// Gives up the sender's delegate status.
    DelegateResignation,
}

impl CoreType {
    pub const ALL: [CoreType; 7] = [
        Self::Transfer,
        Self::SecondSignature,
        Self::DelegateRegistration,
        Self::Vote,
        Self::Ipfs,
        Self::MultiPayment,
        Self::DelegateResignation,
    ];

    pub fn type_id(&self) -> u16 {
        match self {
            Self::Transfer => 0,
            Self::SecondSignature => 1,
            Self::DelegateRegistration => 2,
            Self::Vote => 3,
            Self::Ipfs => 5,
            Self::MultiPayment => 6,
            Self::DelegateResignation => 7,
        }
    }

    pub fn from_type_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.type_id() == id)
    }

    pub fn key(&self) -> TypeKey {
        TypeKey::new(CORE_TYPE_GROUP, self.type_id())
    }

    /// Registry name; also the key into milestone fee tables.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::SecondSignature => "secondSignature",
            Self::DelegateRegistration => "delegateRegistration",
            Self::Vote => "vote",
            Self::Ipfs => "ipfs",
            Self::MultiPayment => "multiPayment",
            Self::DelegateResignation => "delegateResignation",
        }
    }
}

impl fmt::Display for CoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
