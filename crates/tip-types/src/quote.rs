//! Aggregator quotes.
//!
//! A [`Quote`] is fetched once per settlement attempt and never cached,
//! reused or mutated. Its payload is opaque to the engine: each chain family
//! executor knows how to interpret `data` (EVM call data, a base64 Solana
//! versioned transaction, or a hex PSBT).

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Executable payload returned by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayload {
	/// Target contract or program, when the family has one.
	pub to: Option<String>,
	/// Call data, serialized transaction or PSBT, as returned.
	pub data: String,
	/// Native value to attach, in smallest units.
	pub value: U256,
}

/// A priced, executable cross-chain route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
	pub source_chain_id: u64,
	pub destination_chain_id: u64,
	pub source_token: String,
	pub destination_token: String,
	/// Address the route pays out to.
	pub destination_address: String,
	/// Amount pulled from the sender, in smallest units.
	pub source_amount: U256,
	pub payload: TransactionPayload,
	/// Contract that must be approved to spend the source token (EVM).
	pub approval_spender: Option<String>,
	/// Bridge or exchange the aggregator picked, for logging.
	pub tool: Option<String>,
}

impl Quote {
	/// True if the route pays out to exactly `recipient`.
	pub fn pays_to(&self, recipient: &str) -> bool {
		self.destination_address == recipient
	}
}
