//! # Binary Codec
//!
//! The wire format is two layers. The envelope layer ([`envelope`]) writes
//! the fields every transaction shares, in a fixed order selected by the
//! version byte. The asset layer belongs to each transaction type: the
//! envelope codec hands the cursor to the type's handler, which must leave
//! it exactly past its own bytes. Asset encodings are therefore
//! self-delimiting; nothing wraps them in an outer length.
//!
//! ```text
//! v2: ff | 02 | type u16 | typeGroup u32 | nonce u64 | amount u64 | fee u64
//!        | senderPublicKey [33] | vendorField (u8 len, bytes)
//!        | asset | recipient (u8 flag, [21]) | signature (u8 flag, [64])
//!
//! v1: ff | 01 | type u8  | timestamp u32 | amount u64 | fee u64
//!        | senderPublicKey [33] | vendorField (u8 len, bytes)
//!        | asset | recipient (u8 flag, [21]) | signature (u8 flag, [64])
//! ```
//!
//! All integers are little-endian. Decoding is strict: a truncated buffer,
//! an out-of-range length prefix, an unknown discriminator, or bytes left
//! over after the signature are all [`CodecError`]s.

pub mod envelope;
pub mod wire;

pub use envelope::{decode, encode, signing_bytes, transaction_id};
pub use wire::{WireReader, WireWriter};

use thiserror::Error;

use crate::registry::RegistryError;

/// Malformed wire data, or a type the registry cannot resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("buffer truncated: needed {needed} byte(s), {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("bad length prefix for {field}: {length}")]
    BadLengthPrefix { field: &'static str, length: usize },

    #[error("unknown {field} discriminator: {value:#x}")]
    UnknownDiscriminator { field: &'static str, value: u64 },

    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u8),

    /// A field the chosen version's layout has no slot for.
    #[error("{field} cannot be carried by wire version {version}")]
    FieldOutsideLayout { field: &'static str, version: u8 },

    #[error("{0} trailing byte(s) after transaction")]
    TrailingBytes(usize),

    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("asset does not match transaction type {expected}")]
    AssetMismatch { expected: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
