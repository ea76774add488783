//! Settlement engine.
//!
//! Drives one tip through the settlement state machine: validates the
//! request, picks the executor for the source chain's family, proves the
//! sender's identity (best effort), fetches and checks a route, then hands
//! off to the executor for approval, signing, broadcast and confirmation.
//! Status text for every stage goes to the caller's callback.

pub mod session;

use crate::executors::{ChainTipExecutor, ExecutionContext};
use crate::state::{Progress, SettlementState};
use crate::{SettlementError, StatusCallback};
use rust_decimal::Decimal;
use session::SessionContext;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tip_backend::{identity_message, IdentityInterface, LoginOutcome};
use tip_config::EngineConfig;
use tip_quote::QuoteInterface;
use tip_types::{
	current_timestamp, from_base_units, truncate_id, ChainFamily, ChainRegistry, ExecutionResult,
	GasTier, Quote, SecretString, TipRequest,
};
use tip_wallet::WalletAdapter;

/// Per-attempt overrides of the configured policy.
#[derive(Debug, Clone, Default)]
pub struct SettleOptions {
	pub slippage: Option<Decimal>,
	pub gas_tier: Option<GasTier>,
}

/// Main engine settling tips across chain families.
pub struct SettlementEngine {
	config: EngineConfig,
	registry: Arc<ChainRegistry>,
	quotes: Arc<dyn QuoteInterface>,
	executors: HashMap<ChainFamily, Arc<dyn ChainTipExecutor>>,
	identity: Option<Arc<dyn IdentityInterface>>,
	sessions: Arc<SessionContext>,
}

fn same_address(a: &str, b: &str) -> bool {
	if a.starts_with("0x") && b.starts_with("0x") {
		a.eq_ignore_ascii_case(b)
	} else {
		a == b
	}
}

impl SettlementEngine {
	pub fn new(
		config: EngineConfig,
		registry: Arc<ChainRegistry>,
		quotes: Arc<dyn QuoteInterface>,
		sessions: Arc<SessionContext>,
	) -> Self {
		Self {
			config,
			registry,
			quotes,
			executors: HashMap::new(),
			identity: None,
			sessions,
		}
	}

	/// Registers the executor for its family, replacing any previous one.
	pub fn with_executor(mut self, executor: Arc<dyn ChainTipExecutor>) -> Self {
		self.executors.insert(executor.family(), executor);
		self
	}

	/// Enables wallet login before each settlement.
	pub fn with_identity(mut self, identity: Arc<dyn IdentityInterface>) -> Self {
		self.identity = Some(identity);
		self
	}

	pub fn registry(&self) -> &ChainRegistry {
		&self.registry
	}

	pub fn executor(&self, family: ChainFamily) -> Option<&Arc<dyn ChainTipExecutor>> {
		self.executors.get(&family)
	}

	/// Live backend session for `address`, used to attribute ledger entries.
	pub async fn session_token(&self, address: &str) -> Option<SecretString> {
		self.sessions.get(address).await
	}

	/// Settles one tip, returning once the transaction is confirmed.
	///
	/// Nothing is retried. On failure the attempt ends in the Failed state and
	/// the error says which stage failed.
	pub async fn settle(
		&self,
		request: &TipRequest,
		options: &SettleOptions,
		on_status: &StatusCallback<'_>,
	) -> Result<ExecutionResult, SettlementError> {
		let progress = Progress::new(on_status);
		match self.run(request, options, &progress).await {
			Ok(result) => {
				tracing::info!(
					tx = %truncate_id(result.transaction_id.as_str()),
					streamer = %request.streamer_id,
					amount = %request.amount,
					asset = %request.asset.symbol,
					"Tip settled"
				);
				Ok(result)
			},
			Err(err) => {
				tracing::warn!(
					state = %progress.current(),
					streamer = %request.streamer_id,
					error = %err,
					"Tip settlement failed"
				);
				progress.fail(&err);
				Err(err)
			},
		}
	}

	async fn run(
		&self,
		request: &TipRequest,
		options: &SettleOptions,
		progress: &Progress<'_>,
	) -> Result<ExecutionResult, SettlementError> {
		request.validate(&self.registry)?;
		let chain = self.registry.describe(request.source_chain_id)?;
		let executor = self.executors.get(&chain.family).ok_or_else(|| {
			SettlementError::Internal(format!("No executor configured for {} chains", chain.family))
		})?;

		let wallet = executor.wallet();
		if !wallet.is_connected() {
			return Err(SettlementError::WalletNotConnected);
		}
		let address = wallet.current_address()?;
		if !same_address(&address, &request.sender_address) {
			return Err(SettlementError::InvalidRequest(format!(
				"Connected wallet {} is not the sender {}",
				address, request.sender_address
			)));
		}

		progress.advance(SettlementState::ProvingIdentity, Some("Verifying wallet..."))?;
		let session = self.prove_identity(wallet, &address).await;
		tracing::debug!(address = %address, attributed = session.is_some(), "Identity step finished");

		let quote = if executor.uses_aggregator() {
			progress.advance(SettlementState::Quoting, Some("Fetching quote..."))?;
			Some(self.fetch_quote(request, options).await?)
		} else {
			None
		};

		let result = executor
			.execute(&ExecutionContext {
				request,
				quote: quote.as_ref(),
				chain,
				gas_tier: options.gas_tier.unwrap_or(self.config.gas_tier),
				progress,
			})
			.await?;

		progress.advance(SettlementState::Succeeded, Some("Tip sent!"))?;
		Ok(result)
	}

	async fn fetch_quote(
		&self,
		request: &TipRequest,
		options: &SettleOptions,
	) -> Result<Quote, SettlementError> {
		let slippage = options.slippage.unwrap_or(self.config.slippage);
		let quote = self.quotes.get_quote(request, slippage).await?;

		if !quote.pays_to(&request.recipient_address) {
			return Err(SettlementError::QuoteFailed(format!(
				"Route pays {} instead of {}",
				quote.destination_address, request.recipient_address
			)));
		}
		if quote.source_chain_id != request.source_chain_id {
			return Err(SettlementError::QuoteFailed(format!(
				"Route starts on chain {} instead of {}",
				quote.source_chain_id, request.source_chain_id
			)));
		}
		tracing::debug!(
			tool = quote.tool.as_deref().unwrap_or("unknown"),
			from_amount = %from_base_units(quote.source_amount, request.asset.decimals)
				.unwrap_or_else(|_| quote.source_amount.to_string()),
			"Received route"
		);
		Ok(quote)
	}

	/// Reuses or obtains a backend session for `address`.
	///
	/// Failures are logged; the tip proceeds unattributed.
	async fn prove_identity(&self, wallet: &dyn WalletAdapter, address: &str) -> Option<SecretString> {
		if let Some(token) = self.sessions.get(address).await {
			tracing::debug!(address, "Reusing backend session");
			return Some(token);
		}
		let identity = self.identity.as_ref()?;

		let timestamp = current_timestamp();
		let message = identity_message(address, timestamp);
		let signature = match wallet.sign_identity_message(&message).await {
			Ok(signature) => signature,
			Err(e) => {
				tracing::warn!(address, error = %e, "Identity signature failed");
				return None;
			},
		};

		match identity.login(address, timestamp, &signature).await {
			Ok(LoginOutcome::Session { token, expires_in }) => {
				self.sessions
					.store(address, token.clone(), expires_in.map(Duration::from_secs))
					.await;
				tracing::info!(address, "Wallet login succeeded");
				Some(token)
			},
			Ok(LoginOutcome::SignupNeeded { .. }) => {
				tracing::info!(address, "No account linked to wallet, tipping anonymously");
				None
			},
			Err(e) => {
				tracing::warn!(address, error = %e, "Wallet login failed");
				None
			},
		}
	}
}
