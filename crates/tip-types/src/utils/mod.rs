//! Utility functions shared across the tip settlement crates.
//!
//! Amount conversion between human units and smallest on-chain units lives
//! here so that every chain family converts amounts the same way.

pub mod amounts;
pub mod formatting;
pub mod helpers;

pub use amounts::{from_base_units, to_base_units, AmountError};
pub use formatting::{truncate_id, with_0x_prefix, without_0x_prefix};
pub use helpers::current_timestamp;
