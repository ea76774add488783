//! Wallet adapter module for the tip settlement system.
//!
//! This module defines the capability surface the engine needs from a
//! connected wallet: whether it is connected, its address, identity-message
//! signing and sign-and-send. Each chain family adds an extension trait for
//! the primitives only that family has (allowances and receipts on EVM,
//! confirmation polling on Solana, PSBT capabilities on Bitcoin, transaction
//! blocks on Sui).
//!
//! Connection state is owned by whoever created the adapter; the engine only
//! reads it.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tip_types::{ChainFamily, TransactionId, U256};

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	pub mod bitcoin;
	pub mod bridge;
	pub mod solana;
	pub mod sui;
}

pub use implementations::bitcoin::{BitcoinCapability, BitcoinWalletKind, BridgeBitcoinWallet};
pub use implementations::bridge::{HttpWalletBridge, WalletBridge};
pub use implementations::evm::alloy::AlloyEvmWallet;
pub use implementations::solana::KeypairSolanaWallet;
pub use implementations::sui::{BridgeSuiWallet, SuiArgument, SuiCommand, SuiTransactionBlock};

/// Errors that can occur during wallet operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
	/// The wallet is not connected, or has no account.
	#[error("Wallet not connected")]
	NotConnected,
	/// The user declined the signing prompt.
	#[error("User rejected the request: {0}")]
	Rejected(String),
	/// The connected wallet cannot perform the requested operation.
	#[error("Operation not supported by wallet: {0}")]
	Unsupported(String),
	/// The wallet has no provider for the requested chain.
	#[error("Chain {0} is not configured for this wallet")]
	UnsupportedChain(u64),
	/// The transaction payload could not be decoded.
	#[error("Invalid payload: {0}")]
	InvalidPayload(String),
	/// The transaction landed but failed on chain.
	#[error("Transaction failed on chain: {0}")]
	OnChain(String),
	/// A bounded wait ran out.
	#[error("Timed out: {0}")]
	Timeout(String),
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
}

/// Message fragments wallets use when the user dismisses a prompt.
const REJECTION_PATTERNS: [&str; 5] = [
	"user rejected",
	"user denied",
	"rejected the request",
	"user cancelled",
	"user canceled",
];

/// Returns true if a wallet error message means the user declined.
pub fn is_user_rejection(message: &str) -> bool {
	let lower = message.to_ascii_lowercase();
	REJECTION_PATTERNS.iter().any(|p| lower.contains(p))
}

impl WalletError {
	/// Classifies a raw wallet or provider message into `Rejected` or `Network`.
	pub fn from_message(message: impl Into<String>) -> Self {
		let message = message.into();
		if is_user_rejection(&message) {
			WalletError::Rejected(message)
		} else {
			WalletError::Network(message)
		}
	}
}

/// What a wallet is asked to sign and send.
///
/// `data` is interpreted per family: EVM call data, a base64 Solana versioned
/// transaction, a hex PSBT, or a JSON Sui transaction block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPayload {
	pub chain_id: u64,
	pub to: Option<String>,
	pub data: String,
	pub value: U256,
	/// Gas price override in wei (EVM only).
	pub gas_price: Option<u128>,
}

/// Trait defining the interface every wallet adapter implements.
///
/// Every call that needs the wallet fails with [`WalletError::NotConnected`]
/// while [`is_connected`](WalletAdapter::is_connected) is false.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
	/// Chain family this wallet signs for.
	fn family(&self) -> ChainFamily;

	fn is_connected(&self) -> bool;

	/// Address of the connected account.
	fn current_address(&self) -> Result<String, WalletError>;

	/// Signs the canonical identity message used for backend login.
	///
	/// Returns the signature in the family's usual text encoding.
	async fn sign_identity_message(&self, payload: &str) -> Result<String, WalletError>;

	/// Signs and broadcasts a payload, returning the chain-native id.
	async fn sign_and_send(&self, payload: &ExecutionPayload) -> Result<TransactionId, WalletError>;
}

/// EVM-only wallet primitives.
#[async_trait]
pub trait EvmWallet: WalletAdapter {
	/// Chain the wallet currently sends on.
	async fn chain_id(&self) -> Result<u64, WalletError>;

	async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

	/// Current network gas price in wei.
	async fn gas_price(&self) -> Result<u128, WalletError>;

	/// Reads `allowance(owner, spender)` on an ERC-20 token.
	async fn allowance(&self, token: &str, owner: &str, spender: &str)
		-> Result<U256, WalletError>;

	/// Submits `approve(spender, amount)` and returns its hash.
	async fn send_approval(
		&self,
		token: &str,
		spender: &str,
		amount: U256,
	) -> Result<TransactionId, WalletError>;

	/// Waits for a receipt, returning its success flag.
	///
	/// Fails with [`WalletError::Timeout`] once `timeout` elapses.
	async fn wait_for_receipt(
		&self,
		tx: &TransactionId,
		timeout: Duration,
	) -> Result<bool, WalletError>;
}

/// Solana-only wallet primitives.
#[async_trait]
pub trait SolanaWallet: WalletAdapter {
	/// Polls until the signature is confirmed.
	///
	/// A non-null on-chain error is [`WalletError::OnChain`]; running out of
	/// time is [`WalletError::Timeout`].
	async fn confirm_signature(
		&self,
		signature: &TransactionId,
		timeout: Duration,
	) -> Result<(), WalletError>;
}

/// Bitcoin-only wallet primitives.
#[async_trait]
pub trait BitcoinWallet: WalletAdapter {
	fn kind(&self) -> BitcoinWalletKind;

	fn supports(&self, capability: BitcoinCapability) -> bool {
		self.kind().capabilities().contains(&capability)
	}

	/// Signs a hex PSBT, returning the signed PSBT in hex.
	async fn sign_psbt(&self, psbt_hex: &str) -> Result<String, WalletError>;

	/// Broadcasts a signed PSBT, returning the txid.
	async fn push_psbt(&self, signed_psbt_hex: &str) -> Result<TransactionId, WalletError>;
}

/// Sui-only wallet primitives.
#[async_trait]
pub trait SuiWallet: WalletAdapter {
	/// Signs and executes a transaction block on a named network, e.g.
	/// "sui:mainnet", returning the digest.
	async fn sign_and_execute(
		&self,
		block: &SuiTransactionBlock,
		network: &str,
	) -> Result<TransactionId, WalletError>;
}
