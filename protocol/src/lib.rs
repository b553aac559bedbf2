// Copyright (c) 2026 Stakeweave Contributors. MIT License.
// See LICENSE for details.

//! # Stakeweave Protocol: Core Library
//!
//! The transaction subsystem of a delegated proof-of-stake ledger: a
//! registry of pluggable transaction types, the binary wire codec that
//! carries them, the schema rules that gate them, and the arithmetic that
//! turns staked deposits into delegate voting weight and block fees into
//! forger rewards.
//!
//! ## Architecture
//!
//! Modules, leaves first:
//!
//! - **config**: Protocol constants and network parameters.
//! - **milestone**: Height-indexed economic parameters (rewards, fees, stake levels).
//! - **crypto**: SHA-256 and secp256k1 wrappers.
//! - **fees**: Fee splitting between forger and removal, block reward distribution.
//! - **schema**: Structural rule engine for transaction JSON.
//! - **codec**: Wire primitives and the shared envelope codec.
//! - **registry**: `(typeGroup, type)` to handler mapping, core and plugin types.
//! - **transaction**: Envelope types, assets, builder, signing, verification.
//! - **stake**: Stake lifecycle, weight engine, and the stake transaction handlers.
//!
//! ## Ground Rules
//!
//! 1. Amounts are integers in the smallest unit. Floating point never touches money.
//! 2. Everything here is pure. Balances and prior stakes arrive as snapshots,
//!    results leave as deltas. Persistence belongs to the caller.
//! 3. Milestones are read once per operation and the snapshot is used throughout.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod fees;
pub mod milestone;
pub mod registry;
pub mod schema;
pub mod stake;
pub mod transaction;
