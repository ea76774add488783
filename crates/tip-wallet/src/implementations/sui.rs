//! Sui wallet adapter and programmable transaction blocks.
//!
//! Sui tips do not go through the aggregator. The block splits a coin of the
//! tip amount off the gas coin and transfers it to a configured address; the
//! wallet signs and executes it on a named network.

use crate::implementations::bridge::{expect_str, WalletBridge};
use crate::{ExecutionPayload, SuiWallet, WalletAdapter, WalletError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tip_types::{ChainFamily, TransactionId};

/// Input to a transaction block command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SuiArgument {
	GasCoin,
	/// Result of the command at this index.
	Result { index: u16 },
	/// One element of a command's multi-value result.
	NestedResult { index: u16, result: u16 },
}

/// One command of a programmable transaction block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SuiCommand {
	SplitCoins {
		coin: SuiArgument,
		/// Amounts in MIST.
		amounts: Vec<u64>,
	},
	TransferObjects {
		objects: Vec<SuiArgument>,
		address: String,
	},
}

/// A programmable transaction block ready for a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiTransactionBlock {
	pub sender: String,
	pub commands: Vec<SuiCommand>,
}

impl SuiTransactionBlock {
	/// Splits `amount_mist` off the gas coin and sends it to `recipient`.
	pub fn transfer_from_gas(sender: &str, amount_mist: u64, recipient: &str) -> Self {
		Self {
			sender: sender.to_string(),
			commands: vec![
				SuiCommand::SplitCoins {
					coin: SuiArgument::GasCoin,
					amounts: vec![amount_mist],
				},
				SuiCommand::TransferObjects {
					objects: vec![SuiArgument::NestedResult {
						index: 0,
						result: 0,
					}],
					address: recipient.to_string(),
				},
			],
		}
	}
}

/// Sui wallet reached through the wallet bridge.
pub struct BridgeSuiWallet {
	bridge: Arc<dyn WalletBridge>,
	wallet: String,
	network: String,
	address: Option<String>,
}

impl BridgeSuiWallet {
	/// Connects to `wallet` on the bridge; `network` is used by
	/// [`WalletAdapter::sign_and_send`].
	pub async fn connect(bridge: Arc<dyn WalletBridge>, wallet: &str, network: &str) -> Self {
		let address = match bridge.call(wallet, "getAccounts", json!([])).await {
			Ok(accounts) => accounts
				.as_array()
				.and_then(|a| a.first())
				.and_then(|a| a.as_str())
				.map(str::to_string),
			Err(e) => {
				tracing::warn!(wallet, error = %e, "Sui wallet not available");
				None
			},
		};
		Self {
			bridge,
			wallet: wallet.to_string(),
			network: network.to_string(),
			address,
		}
	}
}

#[async_trait]
impl WalletAdapter for BridgeSuiWallet {
	fn family(&self) -> ChainFamily {
		ChainFamily::Sui
	}

	fn is_connected(&self) -> bool {
		self.address.is_some()
	}

	fn current_address(&self) -> Result<String, WalletError> {
		self.address.clone().ok_or(WalletError::NotConnected)
	}

	async fn sign_identity_message(&self, payload: &str) -> Result<String, WalletError> {
		self.current_address()?;
		let signed = self
			.bridge
			.call(
				&self.wallet,
				"signPersonalMessage",
				json!({ "message": payload }),
			)
			.await?;
		expect_str(&signed["signature"], "signPersonalMessage")
	}

	async fn sign_and_send(&self, payload: &ExecutionPayload) -> Result<TransactionId, WalletError> {
		let block: SuiTransactionBlock = serde_json::from_str(&payload.data)
			.map_err(|e| WalletError::InvalidPayload(format!("Invalid transaction block: {}", e)))?;
		self.sign_and_execute(&block, &self.network).await
	}
}

#[async_trait]
impl SuiWallet for BridgeSuiWallet {
	async fn sign_and_execute(
		&self,
		block: &SuiTransactionBlock,
		network: &str,
	) -> Result<TransactionId, WalletError> {
		self.current_address()?;
		let result = self
			.bridge
			.call(
				&self.wallet,
				"signAndExecuteTransactionBlock",
				json!({ "transactionBlock": block, "chain": network }),
			)
			.await?;
		let digest = expect_str(&result["digest"], "signAndExecuteTransactionBlock")?;
		tracing::info!(digest = %digest, network, "Executed sui transaction block");
		Ok(TransactionId(digest))
	}
}
