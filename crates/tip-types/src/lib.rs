//! Common types module for the tip settlement system.
//!
//! This module defines the data model shared by every settlement component:
//! the chain registry, tip requests, aggregator quotes and execution results.
//! Keeping them in one crate lets wallets, quote clients and the engine agree
//! on a single representation.

/// Chain families, native asset descriptors and the static chain registry.
pub mod chains;
/// Execution results and transaction identifiers.
pub mod execution;
/// Aggregator quotes and their executable payloads.
pub mod quote;
/// Redacting wrapper for secrets loaded from configuration.
pub mod secret_string;
/// Tip requests submitted by senders.
pub mod tip;
/// Utility functions for amounts, formatting and timestamps.
pub mod utils;

pub use alloy_primitives::U256;
pub use chains::*;
pub use execution::*;
pub use quote::*;
pub use secret_string::SecretString;
pub use tip::*;
pub use utils::{
	current_timestamp, from_base_units, to_base_units, truncate_id, with_0x_prefix,
	without_0x_prefix, AmountError,
};
