//! # Transaction Module
//!
//! The transaction envelope, the asset payloads carried inside it, and the
//! construct / sign / verify lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! types.rs       : TypeKey and the CoreType enum
//! core_types.rs  : schema, fee policy, and asset codec of each core type
//! asset.rs       : Asset payloads (votes, payments, stakes, content hashes)
//! address.rs     : base58check addresses with a network byte
//! amount.rs      : decimal-string amounts for JSON
//! builder.rs     : Transaction and the fluent TransactionBuilder
//! signing.rs     : secp256k1 signing, sets signature and id
//! verification.rs: schema, fee, network, id, and signature checks
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: [`TransactionBuilder`] starts from a registered type and
//!    accumulates fields.
//! 2. **Sign**: [`sign_transaction`] signs the signing bytes and derives
//!    the id.
//! 3. **Verify**: [`verify_transaction`] runs before pool admission and
//!    again before block inclusion.
//!
//! ## Design Decisions
//!
//! - Amounts are `u64` in the smallest unit and travel through JSON as
//!   decimal strings, so no consumer ever rounds them through a float.
//! - The id is a digest of the full encoding, signature included. An
//!   unsigned transaction has no id.

pub mod address;
pub mod amount;
pub mod asset;
pub mod builder;
pub mod core_types;
pub mod signing;
pub mod types;
pub mod verification;

pub use address::Address;
pub use asset::{Asset, ContentHash, StakeId, VoteEntry};
pub use builder::{Transaction, TransactionBuilder};
pub use signing::sign_transaction;
pub use types::{CoreType, TypeKey};
pub use verification::{verify_transaction, TransactionError};
