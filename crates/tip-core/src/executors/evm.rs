//! EVM executor.
//!
//! Switches the wallet to the quote's source chain, raises the allowance for
//! ERC-20 sources, prices gas from the configured tier, then submits the
//! aggregator's call and waits for its receipt.

use super::{quoted_result, ChainTipExecutor, ExecutionContext};
use crate::approval::ApprovalManager;
use crate::gas::resolve_gas_price;
use crate::state::SettlementState;
use crate::SettlementError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tip_types::{ChainFamily, ExecutionResult, GasTier};
use tip_wallet::{EvmWallet, ExecutionPayload, WalletAdapter};

pub struct EvmExecutor<W: EvmWallet> {
	wallet: Arc<W>,
	approvals: ApprovalManager,
	receipt_timeout: Duration,
}

impl<W: EvmWallet> EvmExecutor<W> {
	pub fn new(wallet: Arc<W>, receipt_timeout: Duration) -> Self {
		Self {
			wallet,
			approvals: ApprovalManager::new(receipt_timeout),
			receipt_timeout,
		}
	}

	async fn gas_price(&self, tier: GasTier) -> Result<Option<u128>, SettlementError> {
		if tier == GasTier::Auto {
			return Ok(None);
		}
		let base = self.wallet.gas_price().await?;
		Ok(resolve_gas_price(tier, base))
	}
}

#[async_trait]
impl<W: EvmWallet + 'static> ChainTipExecutor for EvmExecutor<W> {
	fn family(&self) -> ChainFamily {
		ChainFamily::Evm
	}

	fn wallet(&self) -> &dyn WalletAdapter {
		self.wallet.as_ref()
	}

	async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<ExecutionResult, SettlementError> {
		let quote = ctx.require_quote()?;
		let request = ctx.request;
		let progress = ctx.progress;

		let current = self.wallet.chain_id().await?;
		if current != quote.source_chain_id {
			progress.status(&format!("Switching to {}...", ctx.chain.name));
			self.wallet.switch_chain(quote.source_chain_id).await?;
		}

		if !ctx.chain.is_native(&request.asset.address) {
			progress.advance(SettlementState::ApprovingIfNeeded, None)?;
			let spender = quote.approval_spender.as_deref().ok_or_else(|| {
				SettlementError::QuoteFailed("Quote has no approval address".into())
			})?;
			let owner = self.wallet.current_address()?;
			self.approvals
				.ensure_allowance(
					self.wallet.as_ref(),
					&owner,
					spender,
					&request.asset,
					quote.source_amount,
					progress,
				)
				.await?;
		}

		let gas_price = self.gas_price(ctx.gas_tier).await?;

		progress.advance(SettlementState::Signing, Some("Initiating Transaction..."))?;
		let payload = ExecutionPayload {
			chain_id: quote.source_chain_id,
			to: quote.payload.to.clone(),
			data: quote.payload.data.clone(),
			value: quote.payload.value,
			gas_price,
		};
		let tx_hash = self.wallet.sign_and_send(&payload).await?;
		tracing::info!(
			tx_hash = %tx_hash,
			chain_id = quote.source_chain_id,
			tool = quote.tool.as_deref().unwrap_or("unknown"),
			"Submitted tip transaction"
		);

		progress.advance(
			SettlementState::Broadcasting,
			Some("Transaction Sent! Waiting for confirmation..."),
		)?;
		progress.advance(SettlementState::Confirming, None)?;
		if !self.wallet.wait_for_receipt(&tx_hash, self.receipt_timeout).await? {
			return Err(SettlementError::OnChainFailure(format!(
				"Transaction {} reverted",
				tx_hash
			)));
		}

		Ok(quoted_result(request, quote, tx_hash))
	}
}
