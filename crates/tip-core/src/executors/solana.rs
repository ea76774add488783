//! Solana executor: signs the aggregator's versioned transaction and polls
//! for confirmation.

use super::{quoted_result, ChainTipExecutor, ExecutionContext};
use crate::state::SettlementState;
use crate::SettlementError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tip_types::{ChainFamily, ExecutionResult};
use tip_wallet::{ExecutionPayload, SolanaWallet, WalletAdapter};

pub struct SolanaExecutor<W: SolanaWallet> {
	wallet: Arc<W>,
	confirmation_timeout: Duration,
}

impl<W: SolanaWallet> SolanaExecutor<W> {
	pub fn new(wallet: Arc<W>, confirmation_timeout: Duration) -> Self {
		Self {
			wallet,
			confirmation_timeout,
		}
	}
}

#[async_trait]
impl<W: SolanaWallet + 'static> ChainTipExecutor for SolanaExecutor<W> {
	fn family(&self) -> ChainFamily {
		ChainFamily::Solana
	}

	fn wallet(&self) -> &dyn WalletAdapter {
		self.wallet.as_ref()
	}

	async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<ExecutionResult, SettlementError> {
		let quote = ctx.require_quote()?;
		let progress = ctx.progress;

		progress.advance(SettlementState::Signing, Some("Initiating Transaction..."))?;
		let signature = self
			.wallet
			.sign_and_send(&ExecutionPayload {
				chain_id: quote.source_chain_id,
				to: None,
				data: quote.payload.data.clone(),
				value: quote.payload.value,
				gas_price: None,
			})
			.await?;
		tracing::info!(signature = %signature, "Submitted Solana transaction");

		progress.advance(
			SettlementState::Broadcasting,
			Some("Transaction Sent! Waiting for confirmation..."),
		)?;
		progress.advance(SettlementState::Confirming, None)?;
		self.wallet
			.confirm_signature(&signature, self.confirmation_timeout)
			.await?;

		Ok(quoted_result(ctx.request, quote, signature))
	}
}
