//! Core settlement engine for the tip settlement system.
//!
//! This crate drives one tip from request to on-chain success: it proves the
//! sender's identity, fetches a route, raises an ERC-20 allowance when
//! needed and hands the route to the executor for the sender's chain family.
//! Every failure along the way is reported as one [`SettlementError`].

use thiserror::Error;
use tip_quote::QuoteError;
use tip_types::{AmountError, RegistryError, TipRequestError};
use tip_wallet::WalletError;

pub mod approval;
pub mod engine;
pub mod executors;
pub mod form;
pub mod gas;
pub mod state;

#[cfg(test)]
pub(crate) mod test_utils;

pub use approval::{ApprovalManager, ApprovalOutcome, ApprovalState};
pub use engine::session::SessionContext;
pub use engine::{SettleOptions, SettlementEngine};
pub use executors::{
	bitcoin::BitcoinExecutor, evm::EvmExecutor, solana::SolanaExecutor, sui::SuiExecutor,
	ChainTipExecutor, ExecutionContext,
};
pub use form::{dispatch_ledger, TipForm, TipOutcome, TipTarget};
pub use gas::resolve_gas_price;
pub use state::settlement::{Progress, SettlementState};

/// Callback receiving human-readable status updates.
pub type StatusCallback<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Errors that can end a settlement attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettlementError {
	#[error("Wallet not connected")]
	WalletNotConnected,
	#[error("Quote failed: {0}")]
	QuoteFailed(String),
	#[error("Approval failed: {0}")]
	ApprovalFailed(String),
	#[error("User rejected the request")]
	UserRejected,
	#[error("Broadcast failed: {0}")]
	BroadcastFailed(String),
	#[error("Transaction failed on chain: {0}")]
	OnChainFailure(String),
	#[error("Unsupported wallet operation: {0}")]
	UnsupportedWalletOperation(String),
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	#[error("Internal error: {0}")]
	Internal(String),
}

impl SettlementError {
	/// Message shown to the sender.
	pub fn user_message(&self) -> String {
		match self {
			SettlementError::UserRejected => "Request rejected".to_string(),
			SettlementError::WalletNotConnected => "Please connect your wallet".to_string(),
			other => other.to_string(),
		}
	}
}

/// Maps wallet failures during signing and broadcast.
impl From<WalletError> for SettlementError {
	fn from(err: WalletError) -> Self {
		match err {
			WalletError::NotConnected => SettlementError::WalletNotConnected,
			WalletError::Rejected(_) => SettlementError::UserRejected,
			WalletError::Unsupported(msg) => SettlementError::UnsupportedWalletOperation(msg),
			WalletError::UnsupportedChain(chain_id) => {
				SettlementError::Internal(format!("Chain {} is not configured", chain_id))
			},
			WalletError::OnChain(msg) => SettlementError::OnChainFailure(msg),
			WalletError::InvalidPayload(msg)
			| WalletError::Timeout(msg)
			| WalletError::Network(msg) => SettlementError::BroadcastFailed(msg),
		}
	}
}

impl From<QuoteError> for SettlementError {
	fn from(err: QuoteError) -> Self {
		SettlementError::QuoteFailed(err.to_string())
	}
}

impl From<TipRequestError> for SettlementError {
	fn from(err: TipRequestError) -> Self {
		SettlementError::InvalidRequest(err.to_string())
	}
}

impl From<AmountError> for SettlementError {
	fn from(err: AmountError) -> Self {
		SettlementError::InvalidRequest(err.to_string())
	}
}

impl From<RegistryError> for SettlementError {
	fn from(err: RegistryError) -> Self {
		SettlementError::Internal(err.to_string())
	}
}
