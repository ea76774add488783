//! Solana wallet adapter backed by a local keypair and an RPC node.
//!
//! The aggregator returns a serialized, unsigned versioned transaction. The
//! adapter decodes it, places the connected key's signature at that key's
//! position among the required signers, submits it and polls for
//! confirmation within a bounded window.

use crate::{ExecutionPayload, SolanaWallet, WalletAdapter, WalletError};
use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine as _};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
	commitment_config::CommitmentConfig,
	signature::{read_keypair_file, Keypair, Signature, Signer},
	transaction::VersionedTransaction,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tip_types::{ChainFamily, TransactionId};

/// Parses a commitment name, defaulting to "confirmed".
pub fn commitment_from_str(commitment: &str) -> CommitmentConfig {
	match commitment {
		"processed" => CommitmentConfig::processed(),
		"finalized" => CommitmentConfig::finalized(),
		_ => CommitmentConfig::confirmed(),
	}
}

/// Decodes a base64 versioned transaction and signs it with `keypair`.
pub fn sign_versioned_transaction(
	encoded: &str,
	keypair: &Keypair,
) -> Result<VersionedTransaction, WalletError> {
	let bytes = BASE64_STANDARD
		.decode(encoded.trim())
		.map_err(|e| WalletError::InvalidPayload(format!("Invalid base64 encoding: {}", e)))?;
	let mut tx: VersionedTransaction = bincode::deserialize(&bytes)
		.map_err(|e| WalletError::InvalidPayload(format!("Invalid versioned transaction: {}", e)))?;

	let required = tx.message.header().num_required_signatures as usize;
	let signer_index = tx
		.message
		.static_account_keys()
		.iter()
		.take(required)
		.position(|key| *key == keypair.pubkey())
		.ok_or_else(|| {
			WalletError::InvalidPayload(format!(
				"Transaction does not require a signature from {}",
				keypair.pubkey()
			))
		})?;

	if tx.signatures.len() < required {
		tx.signatures.resize(required, Signature::default());
	}
	tx.signatures[signer_index] = keypair.sign_message(&tx.message.serialize());
	Ok(tx)
}

/// Solana wallet holding a local keypair.
pub struct KeypairSolanaWallet {
	client: Arc<RpcClient>,
	keypair: Option<Keypair>,
	commitment: CommitmentConfig,
	poll_interval: Duration,
}

impl KeypairSolanaWallet {
	pub fn new(
		rpc_url: &str,
		keypair: Option<Keypair>,
		commitment: &str,
		poll_interval: Duration,
	) -> Self {
		let commitment = commitment_from_str(commitment);
		Self {
			client: Arc::new(RpcClient::new_with_commitment(rpc_url.to_string(), commitment)),
			keypair,
			commitment,
			poll_interval,
		}
	}

	/// Loads the keypair from a JSON keypair file.
	pub fn from_keypair_file(
		rpc_url: &str,
		path: &str,
		commitment: &str,
		poll_interval: Duration,
	) -> Result<Self, WalletError> {
		let keypair = read_keypair_file(path)
			.map_err(|e| WalletError::InvalidPayload(format!("Cannot read keypair {}: {}", path, e)))?;
		Ok(Self::new(rpc_url, Some(keypair), commitment, poll_interval))
	}

	fn keypair(&self) -> Result<&Keypair, WalletError> {
		self.keypair.as_ref().ok_or(WalletError::NotConnected)
	}
}

#[async_trait]
impl WalletAdapter for KeypairSolanaWallet {
	fn family(&self) -> ChainFamily {
		ChainFamily::Solana
	}

	fn is_connected(&self) -> bool {
		self.keypair.is_some()
	}

	fn current_address(&self) -> Result<String, WalletError> {
		Ok(self.keypair()?.pubkey().to_string())
	}

	async fn sign_identity_message(&self, payload: &str) -> Result<String, WalletError> {
		Ok(self.keypair()?.sign_message(payload.as_bytes()).to_string())
	}

	async fn sign_and_send(&self, payload: &ExecutionPayload) -> Result<TransactionId, WalletError> {
		let tx = sign_versioned_transaction(&payload.data, self.keypair()?)?;
		let signature = self
			.client
			.send_transaction(&tx)
			.await
			.map_err(|e| WalletError::from_message(format!("Failed to send transaction: {}", e)))?;
		tracing::info!(signature = %signature, "Submitted solana transaction");
		Ok(TransactionId(signature.to_string()))
	}
}

#[async_trait]
impl SolanaWallet for KeypairSolanaWallet {
	async fn confirm_signature(
		&self,
		signature: &TransactionId,
		timeout: Duration,
	) -> Result<(), WalletError> {
		let sig = Signature::from_str(signature.as_str())
			.map_err(|e| WalletError::InvalidPayload(format!("Invalid signature: {}", e)))?;
		let start_time = tokio::time::Instant::now();

		loop {
			if start_time.elapsed() > timeout {
				return Err(WalletError::Timeout(format!(
					"Signature {} not confirmed after {} seconds",
					signature,
					timeout.as_secs()
				)));
			}

			let statuses = self
				.client
				.get_signature_statuses(&[sig])
				.await
				.map_err(|e| WalletError::Network(format!("Failed to get signature status: {}", e)))?;

			if let Some(Some(status)) = statuses.value.first() {
				if let Some(err) = &status.err {
					return Err(WalletError::OnChain(err.to_string()));
				}
				if status.satisfies_commitment(self.commitment) {
					return Ok(());
				}
			}

			tracing::debug!(signature = %signature, "Waiting for solana confirmation");
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}
