//! Tip requests submitted by senders.
//!
//! A [`TipRequest`] is created once per submission and discarded after a
//! single settlement attempt, successful or not. It carries everything the
//! engine needs to quote and execute the transfer.

use crate::chains::{ChainRegistry, RegistryError};
use crate::utils::{to_base_units, AmountError};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a tip request violates its invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TipRequestError {
	#[error("Invalid amount: {0}")]
	Amount(#[from] AmountError),
	#[error("Recipient address '{address}' is not valid on chain {chain_id}")]
	InvalidRecipient { address: String, chain_id: u64 },
	#[error("Sender address '{address}' is not valid on chain {chain_id}")]
	InvalidSender { address: String, chain_id: u64 },
	#[error("Asset decimals {given} do not match native {expected} for {symbol}")]
	NativeDecimalsMismatch {
		symbol: String,
		given: u8,
		expected: u8,
	},
	#[error("Streamer id cannot be empty")]
	MissingStreamer,
	#[error(transparent)]
	Registry(#[from] RegistryError),
}

/// The asset a sender spends on the source chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
	/// Token address, or the chain's native sentinel.
	pub address: String,
	pub symbol: String,
	pub decimals: u8,
}

/// One tip submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipRequest {
	/// Aggregator chain id the sender pays from. Determines the family.
	pub source_chain_id: u64,
	pub sender_address: String,
	pub asset: Asset,
	/// Amount in human units, e.g. "0.01".
	pub amount: String,
	pub recipient_address: String,
	/// Chain the recipient settles on; fixed per deployment.
	pub destination_chain_id: u64,
	/// Streamer the tip is attributed to in the ledger.
	pub streamer_id: String,
	pub message: String,
	pub display_name: Option<String>,
}

impl TipRequest {
	/// Checks the request invariants against the registry.
	///
	/// The amount must be positive and representable in the asset's
	/// decimals, and both addresses must match their chain's format.
	pub fn validate(&self, registry: &ChainRegistry) -> Result<(), TipRequestError> {
		let source = registry.describe(self.source_chain_id)?;
		let destination = registry.describe(self.destination_chain_id)?;

		if self.streamer_id.trim().is_empty() {
			return Err(TipRequestError::MissingStreamer);
		}

		if source.is_native(&self.asset.address) && self.asset.decimals != source.native.decimals {
			return Err(TipRequestError::NativeDecimalsMismatch {
				symbol: self.asset.symbol.clone(),
				given: self.asset.decimals,
				expected: source.native.decimals,
			});
		}

		self.base_units()?;

		if !source.validate_address(&self.sender_address) {
			return Err(TipRequestError::InvalidSender {
				address: self.sender_address.clone(),
				chain_id: self.source_chain_id,
			});
		}

		if !destination.validate_address(&self.recipient_address) {
			return Err(TipRequestError::InvalidRecipient {
				address: self.recipient_address.clone(),
				chain_id: self.destination_chain_id,
			});
		}

		Ok(())
	}

	/// The amount in the source asset's smallest units.
	pub fn base_units(&self) -> Result<U256, AmountError> {
		to_base_units(&self.amount, self.asset.decimals)
	}
}
