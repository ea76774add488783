//! Sui executor.
//!
//! Sui tips do not go through the aggregator. The executor splits the tip
//! amount off the gas coin and transfers it to the configured settlement
//! address on the configured network.

use super::{settled_result, ChainTipExecutor, ExecutionContext};
use crate::state::SettlementState;
use crate::SettlementError;
use async_trait::async_trait;
use std::sync::Arc;
use tip_types::{ChainFamily, ExecutionResult, SUI_CHAIN_ID};
use tip_wallet::{SuiTransactionBlock, SuiWallet, WalletAdapter};

pub struct SuiExecutor<W: SuiWallet> {
	wallet: Arc<W>,
	network: String,
	settlement_address: String,
}

impl<W: SuiWallet> SuiExecutor<W> {
	pub fn new(wallet: Arc<W>, network: &str, settlement_address: &str) -> Self {
		Self {
			wallet,
			network: network.to_string(),
			settlement_address: settlement_address.to_string(),
		}
	}
}

#[async_trait]
impl<W: SuiWallet + 'static> ChainTipExecutor for SuiExecutor<W> {
	fn family(&self) -> ChainFamily {
		ChainFamily::Sui
	}

	fn wallet(&self) -> &dyn WalletAdapter {
		self.wallet.as_ref()
	}

	fn uses_aggregator(&self) -> bool {
		false
	}

	async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<ExecutionResult, SettlementError> {
		let request = ctx.request;
		let progress = ctx.progress;

		// The block only moves the gas coin
		if !ctx.chain.is_native(&request.asset.address) {
			return Err(SettlementError::InvalidRequest(format!(
				"Sui tips must be paid in {}, got {}",
				ctx.chain.native.symbol, request.asset.symbol
			)));
		}

		let amount_mist = u64::try_from(request.base_units()?).map_err(|_| {
			SettlementError::InvalidRequest(format!("{} SUI exceeds a single coin", request.amount))
		})?;
		let sender = self.wallet.current_address()?;
		let block =
			SuiTransactionBlock::transfer_from_gas(&sender, amount_mist, &self.settlement_address);

		progress.advance(SettlementState::Signing, Some("Initiating Transaction..."))?;
		let digest = self.wallet.sign_and_execute(&block, &self.network).await?;
		tracing::info!(digest = %digest, network = %self.network, amount_mist, "Executed Sui transfer");

		progress.advance(
			SettlementState::Broadcasting,
			Some("Transaction Sent! Waiting for confirmation..."),
		)?;
		// signAndExecute only returns after the wallet observed effects
		progress.advance(SettlementState::Confirming, None)?;

		Ok(settled_result(
			request,
			digest,
			SUI_CHAIN_ID,
			&self.settlement_address,
		))
	}
}
