//! EVM wallet implementation using the Alloy library.
//!
//! One provider is built per configured network, all sharing the same local
//! signer. Switching chains selects a different provider; the chain must be
//! configured up front.

use crate::{EvmWallet, ExecutionPayload, WalletAdapter, WalletError};
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tip_types::{with_0x_prefix, without_0x_prefix, ChainFamily, SecretString, TransactionId};

/// allowance(address,address)
const ALLOWANCE_SELECTOR: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];
/// approve(address,uint256)
const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

fn push_address(call_data: &mut Vec<u8>, address: &Address) {
	call_data.extend_from_slice(&[0; 12]); // Pad to 32 bytes
	call_data.extend_from_slice(address.as_slice());
}

/// Call data for `allowance(owner, spender)`.
pub fn encode_allowance_call(owner: &Address, spender: &Address) -> Vec<u8> {
	let mut call_data = Vec::with_capacity(68);
	call_data.extend_from_slice(&ALLOWANCE_SELECTOR);
	push_address(&mut call_data, owner);
	push_address(&mut call_data, spender);
	call_data
}

/// Call data for `approve(spender, amount)`.
pub fn encode_approve_call(spender: &Address, amount: U256) -> Vec<u8> {
	let mut call_data = Vec::with_capacity(68);
	call_data.extend_from_slice(&APPROVE_SELECTOR);
	push_address(&mut call_data, spender);
	call_data.extend_from_slice(&amount.to_be_bytes::<32>());
	call_data
}

fn parse_address(value: &str, what: &str) -> Result<Address, WalletError> {
	value
		.parse()
		.map_err(|e| WalletError::InvalidPayload(format!("Invalid {} address: {}", what, e)))
}

/// Alloy-based EVM wallet.
pub struct AlloyEvmWallet {
	signer: Option<PrivateKeySigner>,
	providers: HashMap<u64, DynProvider>,
	active_chain: AtomicU64,
	poll_interval: Duration,
}

impl AlloyEvmWallet {
	/// Creates providers for every `(chain_id, rpc_url)` pair.
	///
	/// Without a private key the wallet can still read chain state but
	/// reports itself disconnected.
	pub fn new(
		private_key: Option<&SecretString>,
		rpc_urls: &HashMap<u64, String>,
		initial_chain: u64,
		poll_interval: Duration,
	) -> Result<Self, WalletError> {
		if rpc_urls.is_empty() {
			return Err(WalletError::Network(
				"At least one network must be configured".to_string(),
			));
		}

		let signer = private_key
			.map(|key| {
				key.with_exposed(|k| k.parse::<PrivateKeySigner>())
					.map_err(|e| WalletError::InvalidPayload(format!("Invalid private key: {}", e)))
			})
			.transpose()?;

		let mut providers = HashMap::new();
		for (chain_id, rpc_url) in rpc_urls {
			let url: reqwest::Url = rpc_url.parse().map_err(|e| {
				WalletError::Network(format!("Invalid RPC URL for network {}: {}", chain_id, e))
			})?;

			let provider = match &signer {
				Some(signer) => {
					let wallet = EthereumWallet::from(signer.clone().with_chain_id(Some(*chain_id)));
					ProviderBuilder::new().wallet(wallet).connect_http(url).erased()
				},
				None => ProviderBuilder::new().connect_http(url).erased(),
			};
			providers.insert(*chain_id, provider);
		}

		let initial_chain = if providers.contains_key(&initial_chain) {
			initial_chain
		} else {
			*providers.keys().min().unwrap_or(&initial_chain)
		};

		Ok(Self {
			signer,
			providers,
			active_chain: AtomicU64::new(initial_chain),
			poll_interval,
		})
	}

	fn signer(&self) -> Result<&PrivateKeySigner, WalletError> {
		self.signer.as_ref().ok_or(WalletError::NotConnected)
	}

	fn provider(&self, chain_id: u64) -> Result<&DynProvider, WalletError> {
		self.providers
			.get(&chain_id)
			.ok_or(WalletError::UnsupportedChain(chain_id))
	}

	fn active_provider(&self) -> Result<&DynProvider, WalletError> {
		self.provider(self.active_chain.load(Ordering::SeqCst))
	}
}

#[async_trait]
impl WalletAdapter for AlloyEvmWallet {
	fn family(&self) -> ChainFamily {
		ChainFamily::Evm
	}

	fn is_connected(&self) -> bool {
		self.signer.is_some()
	}

	fn current_address(&self) -> Result<String, WalletError> {
		Ok(self.signer()?.address().to_checksum(None))
	}

	async fn sign_identity_message(&self, payload: &str) -> Result<String, WalletError> {
		let signature = self
			.signer()?
			.sign_message(payload.as_bytes())
			.await
			.map_err(|e| WalletError::from_message(format!("Failed to sign message: {}", e)))?;
		Ok(with_0x_prefix(&hex::encode(signature.as_bytes())))
	}

	async fn sign_and_send(&self, payload: &ExecutionPayload) -> Result<TransactionId, WalletError> {
		let from = self.signer()?.address();
		let provider = self.provider(payload.chain_id)?;

		let to = parse_address(
			payload
				.to
				.as_deref()
				.ok_or_else(|| WalletError::InvalidPayload("Missing transaction target".into()))?,
			"target",
		)?;
		let input = hex::decode(without_0x_prefix(&payload.data))
			.map_err(|e| WalletError::InvalidPayload(format!("Invalid call data: {}", e)))?;

		let mut request = TransactionRequest::default()
			.from(from)
			.to(to)
			.input(input.into())
			.value(payload.value);
		if let Some(gas_price) = payload.gas_price {
			request = request.gas_price(gas_price);
		}

		// The provider's wallet handles signing
		let pending_tx = provider
			.send_transaction(request)
			.await
			.map_err(|e| WalletError::from_message(format!("Failed to send transaction: {}", e)))?;

		let tx_hash = with_0x_prefix(&hex::encode(pending_tx.tx_hash().0));
		tracing::info!(tx_hash = %tx_hash, chain_id = payload.chain_id, "Submitted transaction");
		Ok(TransactionId(tx_hash))
	}
}

#[async_trait]
impl EvmWallet for AlloyEvmWallet {
	async fn chain_id(&self) -> Result<u64, WalletError> {
		Ok(self.active_chain.load(Ordering::SeqCst))
	}

	async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
		self.provider(chain_id)?;
		self.active_chain.store(chain_id, Ordering::SeqCst);
		tracing::info!(chain_id, "Switched active chain");
		Ok(())
	}

	async fn gas_price(&self) -> Result<u128, WalletError> {
		self.active_provider()?
			.get_gas_price()
			.await
			.map_err(|e| WalletError::Network(format!("Failed to get gas price: {}", e)))
	}

	async fn allowance(
		&self,
		token: &str,
		owner: &str,
		spender: &str,
	) -> Result<U256, WalletError> {
		let token = parse_address(token, "token")?;
		let owner = parse_address(owner, "owner")?;
		let spender = parse_address(spender, "spender")?;

		let call_result = self
			.active_provider()?
			.call(
				TransactionRequest::default()
					.to(token)
					.input(encode_allowance_call(&owner, &spender).into()),
			)
			.await
			.map_err(|e| WalletError::Network(format!("Failed to call allowance: {}", e)))?;

		if call_result.len() < 32 {
			return Err(WalletError::Network(
				"Invalid allowance response".to_string(),
			));
		}
		Ok(U256::from_be_slice(&call_result[..32]))
	}

	async fn send_approval(
		&self,
		token: &str,
		spender: &str,
		amount: U256,
	) -> Result<TransactionId, WalletError> {
		let chain_id = self.active_chain.load(Ordering::SeqCst);
		let spender = parse_address(spender, "spender")?;
		self.sign_and_send(&ExecutionPayload {
			chain_id,
			to: Some(token.to_string()),
			data: hex::encode(encode_approve_call(&spender, amount)),
			value: U256::ZERO,
			gas_price: None,
		})
		.await
	}

	async fn wait_for_receipt(
		&self,
		tx: &TransactionId,
		timeout: Duration,
	) -> Result<bool, WalletError> {
		let tx_hash: B256 = tx
			.as_str()
			.parse()
			.map_err(|e| WalletError::InvalidPayload(format!("Invalid transaction hash: {}", e)))?;
		let provider = self.active_provider()?;
		let start_time = tokio::time::Instant::now();

		loop {
			if start_time.elapsed() > timeout {
				return Err(WalletError::Timeout(format!(
					"No receipt for {} after {} seconds",
					tx,
					timeout.as_secs()
				)));
			}

			match provider.get_transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => return Ok(receipt.status()),
				Ok(None) => {
					tracing::debug!(tx_hash = %tx, "Transaction not yet mined");
					tokio::time::sleep(self.poll_interval).await;
				},
				Err(e) => {
					return Err(WalletError::Network(format!(
						"Failed to get receipt: {}",
						e
					)));
				},
			}
		}
	}
}
