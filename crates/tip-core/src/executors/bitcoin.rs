//! Bitcoin executor.
//!
//! The aggregator returns a PSBT in hex. The wallet signs it and pushes the
//! finalized transaction; a wallet kind lacking either capability fails
//! before any prompt is shown.

use super::{quoted_result, ChainTipExecutor, ExecutionContext};
use crate::state::SettlementState;
use crate::SettlementError;
use async_trait::async_trait;
use std::sync::Arc;
use tip_types::{ChainFamily, ExecutionResult};
use tip_wallet::implementations::bitcoin::validate_psbt_hex;
use tip_wallet::{BitcoinCapability, BitcoinWallet, BitcoinWalletKind, WalletAdapter};

fn unsupported(kind: BitcoinWalletKind, capability: BitcoinCapability) -> SettlementError {
	let reason = match (kind, capability) {
		(BitcoinWalletKind::Phantom, BitcoinCapability::SignPsbt) => {
			"Phantom needs per-input signing indexes the route does not provide".to_string()
		},
		(BitcoinWalletKind::MetaMaskSnap, _) => {
			"the MetaMask Bitcoin snap only exposes an address".to_string()
		},
		(kind, BitcoinCapability::Broadcast) => format!("{} cannot broadcast PSBTs", kind),
		(kind, capability) => format!("{} does not support {:?}", kind, capability),
	};
	SettlementError::UnsupportedWalletOperation(reason)
}

pub struct BitcoinExecutor<W: BitcoinWallet> {
	wallet: Arc<W>,
}

impl<W: BitcoinWallet> BitcoinExecutor<W> {
	pub fn new(wallet: Arc<W>) -> Self {
		Self { wallet }
	}
}

#[async_trait]
impl<W: BitcoinWallet + 'static> ChainTipExecutor for BitcoinExecutor<W> {
	fn family(&self) -> ChainFamily {
		ChainFamily::Bitcoin
	}

	fn wallet(&self) -> &dyn WalletAdapter {
		self.wallet.as_ref()
	}

	async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<ExecutionResult, SettlementError> {
		let quote = ctx.require_quote()?;
		let progress = ctx.progress;
		let kind = self.wallet.kind();

		for capability in [BitcoinCapability::SignPsbt, BitcoinCapability::Broadcast] {
			if !self.wallet.supports(capability) {
				return Err(unsupported(kind, capability));
			}
		}

		let psbt = validate_psbt_hex(&quote.payload.data)
			.map_err(|e| SettlementError::QuoteFailed(e.to_string()))?;
		tracing::debug!(
			inputs = psbt.inputs.len(),
			outputs = psbt.outputs.len(),
			wallet = %kind,
			"Signing bitcoin PSBT"
		);

		progress.advance(SettlementState::Signing, Some("Initiating Transaction..."))?;
		let signed = self.wallet.sign_psbt(&quote.payload.data).await?;

		progress.advance(
			SettlementState::Broadcasting,
			Some("Transaction Sent! Waiting for confirmation..."),
		)?;
		let txid = self.wallet.push_psbt(&signed).await?;
		tracing::info!(txid = %txid, wallet = %kind, "Pushed bitcoin transaction");

		// Block confirmation is out of band; an accepted push settles the tip.
		progress.advance(SettlementState::Confirming, None)?;
		Ok(quoted_result(ctx.request, quote, txid))
	}
}
