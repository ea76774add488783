//! Builds engine components from configuration.
//!
//! Only the executor for the tip's source family is built, so a config that
//! lacks, say, a Solana keypair can still send EVM tips.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tip_backend::{BackendError, HttpIdentityProver, HttpLedger, LedgerInterface};
use tip_config::{Config, ConfigError};
use tip_core::{
	BitcoinExecutor, ChainTipExecutor, EvmExecutor, SessionContext, SettlementEngine,
	SolanaExecutor, SuiExecutor,
};
use tip_quote::{LifiConfig, LifiQuoteClient, QuoteError};
use tip_types::{ChainDescriptor, ChainFamily, ChainRegistry};
use tip_wallet::{
	AlloyEvmWallet, BitcoinWalletKind, BridgeBitcoinWallet, BridgeSuiWallet, HttpWalletBridge,
	KeypairSolanaWallet, WalletBridge, WalletError,
};

/// Errors that can occur while wiring the engine.
#[derive(Debug, Error)]
pub enum BuildError {
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
	#[error("Wallet error: {0}")]
	Wallet(#[from] WalletError),
	#[error("Quote client error: {0}")]
	Quote(#[from] QuoteError),
	#[error("Backend client error: {0}")]
	Backend(#[from] BackendError),
}

const DEFAULT_SESSION_TTL_SECONDS: u64 = 3600;

fn bridge(config: &Config) -> Result<Arc<dyn WalletBridge>, BuildError> {
	let bridge = config
		.bridge
		.as_ref()
		.ok_or_else(|| BuildError::MissingComponent("[bridge] section".into()))?;
	Ok(Arc::new(HttpWalletBridge::new(
		&bridge.url,
		Duration::from_secs(bridge.timeout_seconds),
	)?))
}

/// Creates the executor and wallet for `chain`'s family.
pub async fn build_executor(
	config: &Config,
	chain: &ChainDescriptor,
) -> Result<Arc<dyn ChainTipExecutor>, BuildError> {
	let poll_interval = Duration::from_secs(config.engine.poll_interval_seconds);

	let executor: Arc<dyn ChainTipExecutor> = match chain.family {
		ChainFamily::Evm => {
			if !config.networks.contains_key(&chain.id) {
				return Err(BuildError::MissingComponent(format!(
					"[networks.{}] for {}",
					chain.id, chain.name
				)));
			}
			let rpc_urls: HashMap<u64, String> = config
				.networks
				.iter()
				.map(|(id, network)| (*id, network.rpc_url.clone()))
				.collect();
			let wallet = AlloyEvmWallet::new(
				config.wallets.evm_private_key.as_ref(),
				&rpc_urls,
				chain.id,
				poll_interval,
			)?;
			Arc::new(EvmExecutor::new(
				Arc::new(wallet),
				Duration::from_secs(config.engine.receipt_timeout_seconds),
			))
		},
		ChainFamily::Solana => {
			let solana = config
				.solana
				.as_ref()
				.ok_or_else(|| BuildError::MissingComponent("[solana] section".into()))?;
			let wallet = match &config.wallets.solana_keypair_path {
				Some(path) => KeypairSolanaWallet::from_keypair_file(
					&solana.rpc_url,
					path,
					&solana.commitment,
					poll_interval,
				)?,
				None => KeypairSolanaWallet::new(&solana.rpc_url, None, &solana.commitment, poll_interval),
			};
			Arc::new(SolanaExecutor::new(
				Arc::new(wallet),
				Duration::from_secs(config.engine.confirmation_timeout_seconds),
			))
		},
		ChainFamily::Bitcoin => {
			let kind: BitcoinWalletKind = config
				.wallets
				.bitcoin_wallet
				.as_deref()
				.ok_or_else(|| BuildError::MissingComponent("wallets.bitcoin_wallet".into()))?
				.parse()?;
			let wallet = BridgeBitcoinWallet::connect(bridge(config)?, kind).await;
			Arc::new(BitcoinExecutor::new(Arc::new(wallet)))
		},
		ChainFamily::Sui => {
			let sui = config
				.sui
				.as_ref()
				.ok_or_else(|| BuildError::MissingComponent("[sui] section".into()))?;
			let name = config
				.wallets
				.sui_wallet
				.as_deref()
				.ok_or_else(|| BuildError::MissingComponent("wallets.sui_wallet".into()))?;
			let wallet = BridgeSuiWallet::connect(bridge(config)?, name, &sui.network).await;
			Arc::new(SuiExecutor::new(
				Arc::new(wallet),
				&sui.network,
				&sui.settlement_address,
			))
		},
	};

	tracing::info!(chain = %chain.name, family = %chain.family, "Built executor");
	Ok(executor)
}

/// Creates the engine with the aggregator client, session context and,
/// when a backend is configured, wallet login.
pub fn build_engine(
	config: &Config,
	registry: Arc<ChainRegistry>,
	executor: Arc<dyn ChainTipExecutor>,
) -> Result<SettlementEngine, BuildError> {
	let quotes = LifiQuoteClient::new(LifiConfig {
		base_url: config.aggregator.base_url.clone(),
		integrator: config.aggregator.integrator.clone(),
		fee: config.aggregator.fee,
		api_key: config.aggregator.api_key.clone(),
		timeout: Duration::from_secs(config.aggregator.timeout_seconds),
		destination_token: config.settlement_token()?,
	})?;

	let ttl = config
		.backend
		.as_ref()
		.map(|b| b.session_ttl_seconds)
		.unwrap_or(DEFAULT_SESSION_TTL_SECONDS);

	let mut engine = SettlementEngine::new(
		config.engine.clone(),
		registry,
		Arc::new(quotes),
		Arc::new(SessionContext::new(Duration::from_secs(ttl))),
	)
	.with_executor(executor);

	if let Some(backend) = &config.backend {
		let identity =
			HttpIdentityProver::new(&backend.base_url, Duration::from_secs(backend.timeout_seconds))?;
		engine = engine.with_identity(Arc::new(identity));
	}
	Ok(engine)
}

/// Ledger client, if a backend is configured.
pub fn build_ledger(config: &Config) -> Result<Option<Arc<dyn LedgerInterface>>, BuildError> {
	match &config.backend {
		Some(backend) => {
			let ledger =
				HttpLedger::new(&backend.base_url, Duration::from_secs(backend.timeout_seconds))?;
			Ok(Some(Arc::new(ledger)))
		},
		None => Ok(None),
	}
}
