//! Bitcoin wallet adapter with per-wallet capability negotiation.
//!
//! Bitcoin browser wallets disagree on what they can do. Each kind declares
//! its capabilities up front and the adapter refuses unsupported operations
//! before any prompt is shown, so "not connected", "user rejected" and "not
//! supported" remain distinct outcomes.

use crate::implementations::bridge::{expect_str, WalletBridge};
use crate::{BitcoinWallet, ExecutionPayload, WalletAdapter, WalletError};
use async_trait::async_trait;
use bitcoin::psbt::Psbt;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tip_types::{ChainFamily, TransactionId};

/// What a Bitcoin wallet can be asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitcoinCapability {
	SignIdentity,
	SignPsbt,
	Broadcast,
}

/// Supported Bitcoin browser wallets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitcoinWalletKind {
	Unisat,
	Xverse,
	Leather,
	Phantom,
	MetaMaskSnap,
}

impl BitcoinWalletKind {
	/// Capabilities this wallet exposes.
	///
	/// Xverse and Leather sign PSBTs but return them unbroadcast. Phantom
	/// needs a per-input ownership map a quote does not carry, and the
	/// MetaMask snap only exposes an address.
	pub fn capabilities(&self) -> &'static [BitcoinCapability] {
		use BitcoinCapability::*;
		match self {
			BitcoinWalletKind::Unisat => &[SignIdentity, SignPsbt, Broadcast],
			BitcoinWalletKind::Xverse | BitcoinWalletKind::Leather => &[SignIdentity, SignPsbt],
			BitcoinWalletKind::Phantom => &[SignIdentity],
			BitcoinWalletKind::MetaMaskSnap => &[],
		}
	}

	/// Name the wallet bridge knows this wallet by.
	pub fn bridge_name(&self) -> &'static str {
		match self {
			BitcoinWalletKind::Unisat => "unisat",
			BitcoinWalletKind::Xverse => "xverse",
			BitcoinWalletKind::Leather => "leather",
			BitcoinWalletKind::Phantom => "phantom",
			BitcoinWalletKind::MetaMaskSnap => "metamask",
		}
	}
}

impl fmt::Display for BitcoinWalletKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.bridge_name())
	}
}

impl FromStr for BitcoinWalletKind {
	type Err = WalletError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"unisat" => Ok(BitcoinWalletKind::Unisat),
			"xverse" => Ok(BitcoinWalletKind::Xverse),
			"leather" => Ok(BitcoinWalletKind::Leather),
			"phantom" => Ok(BitcoinWalletKind::Phantom),
			"metamask" | "metamask-snap" => Ok(BitcoinWalletKind::MetaMaskSnap),
			other => Err(WalletError::Unsupported(format!("Unknown bitcoin wallet '{}'", other))),
		}
	}
}

/// Checks that a hex string decodes to a well-formed PSBT.
pub fn validate_psbt_hex(psbt_hex: &str) -> Result<Psbt, WalletError> {
	let bytes = hex::decode(psbt_hex.trim_start_matches("0x"))
		.map_err(|e| WalletError::InvalidPayload(format!("PSBT is not hex: {}", e)))?;
	Psbt::deserialize(&bytes)
		.map_err(|e| WalletError::InvalidPayload(format!("Malformed PSBT: {}", e)))
}

/// Bitcoin wallet reached through the wallet bridge.
pub struct BridgeBitcoinWallet {
	bridge: Arc<dyn WalletBridge>,
	kind: BitcoinWalletKind,
	address: Option<String>,
}

impl BridgeBitcoinWallet {
	/// Asks the bridge for the wallet's accounts. A wallet with no account
	/// is kept but reported as disconnected.
	pub async fn connect(bridge: Arc<dyn WalletBridge>, kind: BitcoinWalletKind) -> Self {
		let address = match bridge.call(kind.bridge_name(), "getAccounts", json!([])).await {
			Ok(accounts) => accounts
				.as_array()
				.and_then(|a| a.first())
				.and_then(|a| a.as_str())
				.map(str::to_string),
			Err(e) => {
				tracing::warn!(wallet = %kind, error = %e, "Bitcoin wallet not available");
				None
			},
		};
		Self {
			bridge,
			kind,
			address,
		}
	}

	fn require(&self, capability: BitcoinCapability) -> Result<(), WalletError> {
		if self.address.is_none() {
			return Err(WalletError::NotConnected);
		}
		if !self.supports(capability) {
			return Err(WalletError::Unsupported(format!(
				"{} does not support {:?}",
				self.kind, capability
			)));
		}
		Ok(())
	}
}

#[async_trait]
impl WalletAdapter for BridgeBitcoinWallet {
	fn family(&self) -> ChainFamily {
		ChainFamily::Bitcoin
	}

	fn is_connected(&self) -> bool {
		self.address.is_some()
	}

	fn current_address(&self) -> Result<String, WalletError> {
		self.address.clone().ok_or(WalletError::NotConnected)
	}

	async fn sign_identity_message(&self, payload: &str) -> Result<String, WalletError> {
		self.require(BitcoinCapability::SignIdentity)?;
		let signature = self
			.bridge
			.call(self.kind.bridge_name(), "signMessage", json!({ "message": payload }))
			.await?;
		expect_str(&signature, "signMessage")
	}

	async fn sign_and_send(&self, payload: &ExecutionPayload) -> Result<TransactionId, WalletError> {
		self.require(BitcoinCapability::SignPsbt)?;
		self.require(BitcoinCapability::Broadcast)?;
		validate_psbt_hex(&payload.data)?;

		let signed = self.sign_psbt(&payload.data).await?;
		self.push_psbt(&signed).await
	}
}

#[async_trait]
impl BitcoinWallet for BridgeBitcoinWallet {
	fn kind(&self) -> BitcoinWalletKind {
		self.kind
	}

	async fn sign_psbt(&self, psbt_hex: &str) -> Result<String, WalletError> {
		self.require(BitcoinCapability::SignPsbt)?;
		let signed = self
			.bridge
			.call(
				self.kind.bridge_name(),
				"signPsbt",
				json!({ "psbt": psbt_hex, "autoFinalized": true }),
			)
			.await?;
		expect_str(&signed, "signPsbt")
	}

	async fn push_psbt(&self, signed_psbt_hex: &str) -> Result<TransactionId, WalletError> {
		self.require(BitcoinCapability::Broadcast)?;
		let txid = self
			.bridge
			.call(self.kind.bridge_name(), "pushPsbt", json!({ "psbt": signed_psbt_hex }))
			.await?;
		let txid = expect_str(&txid, "pushPsbt")?;
		tracing::info!(txid = %txid, wallet = %self.kind, "Broadcast bitcoin transaction");
		Ok(TransactionId(txid))
	}
}
