//! Per-family transaction executors.
//!
//! The engine picks one executor per request from the source chain's family
//! and never branches on family itself. Each executor turns a quote (or, for
//! families that bypass the aggregator, the request alone) into a confirmed
//! transaction.

use crate::state::Progress;
use crate::SettlementError;
use async_trait::async_trait;
use tip_types::{
	ChainDescriptor, ChainFamily, ExecutionResult, GasTier, Quote, TipRequest, TransactionId,
};
use tip_wallet::WalletAdapter;

pub mod bitcoin;
pub mod evm;
pub mod solana;
pub mod sui;

/// Everything an executor needs for one attempt.
pub struct ExecutionContext<'a> {
	pub request: &'a TipRequest,
	/// Route from the aggregator; `None` for executors that do not use it.
	pub quote: Option<&'a Quote>,
	/// Descriptor of the source chain.
	pub chain: &'a ChainDescriptor,
	pub gas_tier: GasTier,
	pub progress: &'a Progress<'a>,
}

impl<'a> ExecutionContext<'a> {
	pub(crate) fn require_quote(&self) -> Result<&'a Quote, SettlementError> {
		self.quote.ok_or_else(|| {
			SettlementError::Internal(format!(
				"{} execution requires an aggregator quote",
				self.chain.family
			))
		})
	}
}

/// Trait implemented by each chain family's executor.
#[async_trait]
pub trait ChainTipExecutor: Send + Sync {
	fn family(&self) -> ChainFamily;

	/// The wallet this executor signs with.
	fn wallet(&self) -> &dyn WalletAdapter;

	/// Whether the engine should fetch a quote before executing.
	fn uses_aggregator(&self) -> bool {
		true
	}

	/// Signs, broadcasts and confirms the tip.
	///
	/// Returns once on-chain success is observed; the progress is left in
	/// the Confirming state.
	async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<ExecutionResult, SettlementError>;
}

/// Builds the result for a tip that paid out as the quote described.
pub(crate) fn quoted_result(
	request: &TipRequest,
	quote: &Quote,
	transaction_id: TransactionId,
) -> ExecutionResult {
	settled_result(
		request,
		transaction_id,
		quote.destination_chain_id,
		&quote.destination_address,
	)
}

pub(crate) fn settled_result(
	request: &TipRequest,
	transaction_id: TransactionId,
	destination_chain_id: u64,
	destination_address: &str,
) -> ExecutionResult {
	ExecutionResult {
		transaction_id,
		source_chain_id: request.source_chain_id,
		destination_chain_id,
		source_address: request.sender_address.clone(),
		destination_address: destination_address.to_string(),
		asset_symbol: request.asset.symbol.clone(),
		amount: request.amount.clone(),
		message: request.message.clone(),
		display_name: request.display_name.clone(),
		streamer_id: request.streamer_id.clone(),
	}
}
