//! Results of a completed settlement.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain-native transaction identifier: an EVM hash, a Solana signature,
/// a Bitcoin txid or a Sui digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for TransactionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<String> for TransactionId {
	fn from(s: String) -> Self {
		Self(s)
	}
}

/// Outcome of a successful tip, created exactly once when on-chain success
/// is observed and handed to the ledger collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
	pub transaction_id: TransactionId,
	pub source_chain_id: u64,
	pub destination_chain_id: u64,
	pub source_address: String,
	pub destination_address: String,
	/// Symbol of the asset the sender spent.
	pub asset_symbol: String,
	/// Amount in human units, exactly as submitted.
	pub amount: String,
	pub message: String,
	pub display_name: Option<String>,
	pub streamer_id: String,
}

/// Gas price tier chosen by the sender for EVM transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasTier {
	/// Let the provider pick the gas price.
	#[default]
	Auto,
	/// 1.2x the network gas price.
	Fast,
	/// 1.5x the network gas price.
	Instant,
}

impl std::str::FromStr for GasTier {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"auto" => Ok(GasTier::Auto),
			"fast" => Ok(GasTier::Fast),
			"instant" => Ok(GasTier::Instant),
			other => Err(format!("Unknown gas tier '{}'", other)),
		}
	}
}
