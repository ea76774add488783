//! ERC-20 allowance management.
//!
//! Before an EVM route spends a token, its router must be allowed to pull at
//! least the quoted amount. The manager reads the current allowance and, if
//! it falls short, submits exactly one approval for the required amount and
//! waits for its receipt. The swap is never sent before that receipt.

use crate::state::Progress;
use crate::SettlementError;
use std::time::Duration;
use tip_types::{Asset, TransactionId, EVM_NATIVE_ADDRESS, U256};
use tip_wallet::{EvmWallet, WalletError};

/// Allowance of `spender` over `owner`'s `token`, and what the route needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalState {
	pub token: String,
	pub owner: String,
	pub spender: String,
	pub allowance: U256,
	pub required: U256,
}

impl ApprovalState {
	pub fn is_sufficient(&self) -> bool {
		self.allowance >= self.required
	}
}

/// What [`ApprovalManager::ensure_allowance`] had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
	/// The source asset is native; nothing to approve.
	NotRequired,
	/// The existing allowance already covers the route.
	AlreadySufficient(ApprovalState),
	/// An approval was submitted and confirmed.
	Approved {
		state: ApprovalState,
		transaction_id: TransactionId,
	},
}

fn approval_error(err: WalletError) -> SettlementError {
	match err {
		WalletError::NotConnected => SettlementError::WalletNotConnected,
		WalletError::Rejected(msg) => {
			SettlementError::ApprovalFailed(format!("Approval rejected: {}", msg))
		},
		other => SettlementError::ApprovalFailed(other.to_string()),
	}
}

/// Raises ERC-20 allowances for EVM routes.
pub struct ApprovalManager {
	receipt_timeout: Duration,
}

impl ApprovalManager {
	pub fn new(receipt_timeout: Duration) -> Self {
		Self { receipt_timeout }
	}

	/// Ensures `spender` may spend `required` of `token` on behalf of `owner`.
	pub async fn ensure_allowance<W: EvmWallet + ?Sized>(
		&self,
		wallet: &W,
		owner: &str,
		spender: &str,
		asset: &Asset,
		required: U256,
		progress: &Progress<'_>,
	) -> Result<ApprovalOutcome, SettlementError> {
		let token = asset.address.as_str();
		if token.eq_ignore_ascii_case(EVM_NATIVE_ADDRESS) {
			return Ok(ApprovalOutcome::NotRequired);
		}

		let allowance = wallet
			.allowance(token, owner, spender)
			.await
			.map_err(approval_error)?;
		let state = ApprovalState {
			token: token.to_string(),
			owner: owner.to_string(),
			spender: spender.to_string(),
			allowance,
			required,
		};

		if state.is_sufficient() {
			tracing::debug!(token, spender, %allowance, "Allowance already sufficient");
			return Ok(ApprovalOutcome::AlreadySufficient(state));
		}

		progress.status(&format!("Approving {}...", asset.symbol));
		let transaction_id = wallet
			.send_approval(token, spender, required)
			.await
			.map_err(approval_error)?;
		tracing::info!(tx_hash = %transaction_id, token, spender, %required, "Submitted approval");

		progress.status("Waiting for Approval Confirmation...");
		let succeeded = wallet
			.wait_for_receipt(&transaction_id, self.receipt_timeout)
			.await
			.map_err(approval_error)?;
		if !succeeded {
			return Err(SettlementError::ApprovalFailed(format!(
				"Approval {} reverted",
				transaction_id
			)));
		}

		progress.status("Approved! Initiating Transaction...");
		Ok(ApprovalOutcome::Approved {
			state,
			transaction_id,
		})
	}
}
