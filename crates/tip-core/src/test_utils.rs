//! In-memory fakes for the wallet, quote, identity and ledger traits.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tip_backend::{BackendError, IdentityInterface, LedgerInterface, LoginOutcome, TipRecord};
use tip_quote::{QuoteError, QuoteInterface};
use tip_types::{
	Asset, ChainFamily, Quote, SecretString, TipRequest, TransactionId, TransactionPayload,
	BITCOIN_CHAIN_ID, BITCOIN_NATIVE_ADDRESS, EVM_NATIVE_ADDRESS, SOLANA_CHAIN_ID,
	SOLANA_NATIVE_ADDRESS, SUI_CHAIN_ID, SUI_NATIVE_ADDRESS, U256,
};
use tip_wallet::{
	BitcoinWallet, BitcoinWalletKind, EvmWallet, ExecutionPayload, SolanaWallet, SuiTransactionBlock,
	SuiWallet, WalletAdapter, WalletError,
};

pub const SENDER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const RECIPIENT: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
pub const SPENDER: &str = "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE";
pub const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const SOLANA_SENDER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
pub const BITCOIN_SENDER: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
pub const SUI_SENDER: &str =
	"0x6f2d3a5c1b0e9f8a7d6c5b4a39281706f5e4d3c2b1a09f8e7d6c5b4a39281706";
pub const SUI_SETTLEMENT: &str =
	"0x1111111111111111111111111111111111111111111111111111111111111111";

fn lock<T: Clone>(m: &Mutex<Vec<T>>) -> Vec<T> {
	m.lock().map(|v| v.clone()).unwrap_or_default()
}

fn push<T>(m: &Mutex<Vec<T>>, value: T) {
	if let Ok(mut v) = m.lock() {
		v.push(value);
	}
}

pub fn usdc() -> Asset {
	Asset {
		address: USDC.to_string(),
		symbol: "USDC".to_string(),
		decimals: 6,
	}
}

/// Native ETH "0.01" from Ethereum to a Base recipient.
pub fn eth_request() -> TipRequest {
	TipRequest {
		source_chain_id: 1,
		sender_address: SENDER.to_string(),
		asset: Asset {
			address: EVM_NATIVE_ADDRESS.to_string(),
			symbol: "ETH".to_string(),
			decimals: 18,
		},
		amount: "0.01".to_string(),
		recipient_address: RECIPIENT.to_string(),
		destination_chain_id: 8453,
		streamer_id: "alice".to_string(),
		message: "great stream, keep it going!!".to_string(),
		display_name: None,
	}
}

pub fn usdc_request() -> TipRequest {
	TipRequest {
		asset: usdc(),
		amount: "5".to_string(),
		..eth_request()
	}
}

pub fn solana_request() -> TipRequest {
	TipRequest {
		source_chain_id: SOLANA_CHAIN_ID,
		sender_address: SOLANA_SENDER.to_string(),
		asset: Asset {
			address: SOLANA_NATIVE_ADDRESS.to_string(),
			symbol: "SOL".to_string(),
			decimals: 9,
		},
		amount: "1".to_string(),
		..eth_request()
	}
}

pub fn bitcoin_request() -> TipRequest {
	TipRequest {
		source_chain_id: BITCOIN_CHAIN_ID,
		sender_address: BITCOIN_SENDER.to_string(),
		asset: Asset {
			address: BITCOIN_NATIVE_ADDRESS.to_string(),
			symbol: "BTC".to_string(),
			decimals: 8,
		},
		amount: "0.001".to_string(),
		..eth_request()
	}
}

pub fn sui_request() -> TipRequest {
	TipRequest {
		source_chain_id: SUI_CHAIN_ID,
		sender_address: SUI_SENDER.to_string(),
		asset: Asset {
			address: SUI_NATIVE_ADDRESS.to_string(),
			symbol: "SUI".to_string(),
			decimals: 9,
		},
		amount: "2".to_string(),
		..eth_request()
	}
}

/// A route that pays `request.recipient_address` the way the aggregator
/// would describe it.
pub fn quote_for(request: &TipRequest) -> Quote {
	let amount = request.base_units().unwrap();
	let native = request.asset.address == EVM_NATIVE_ADDRESS
		|| request.asset.address == SOLANA_NATIVE_ADDRESS
		|| request.asset.address == BITCOIN_NATIVE_ADDRESS;
	Quote {
		source_chain_id: request.source_chain_id,
		destination_chain_id: request.destination_chain_id,
		source_token: request.asset.address.clone(),
		destination_token: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
		destination_address: request.recipient_address.clone(),
		source_amount: amount,
		payload: TransactionPayload {
			to: Some(SPENDER.to_string()),
			data: "0xdeadbeef".to_string(),
			value: if native { amount } else { U256::ZERO },
		},
		approval_spender: Some(SPENDER.to_string()),
		tool: Some("stargate".to_string()),
	}
}

/// Scripted EVM wallet that records every call by name.
pub struct FakeEvmWallet {
	connected: AtomicBool,
	chain: AtomicU64,
	allowance: U256,
	receipts_succeed: bool,
	receipts_missing: bool,
	rejection: Option<String>,
	gas_price: u128,
	counter: AtomicUsize,
	calls: Mutex<Vec<String>>,
	approvals: Mutex<Vec<U256>>,
	sent: Mutex<Vec<ExecutionPayload>>,
}

impl FakeEvmWallet {
	pub fn new(chain_id: u64) -> Self {
		Self {
			connected: AtomicBool::new(true),
			chain: AtomicU64::new(chain_id),
			allowance: U256::ZERO,
			receipts_succeed: true,
			receipts_missing: false,
			rejection: None,
			gas_price: 100,
			counter: AtomicUsize::new(0),
			calls: Mutex::new(Vec::new()),
			approvals: Mutex::new(Vec::new()),
			sent: Mutex::new(Vec::new()),
		}
	}

	pub fn with_allowance(mut self, allowance: U256) -> Self {
		self.allowance = allowance;
		self
	}

	pub fn with_reverting_receipts(mut self) -> Self {
		self.receipts_succeed = false;
		self
	}

	/// Receipts never show up within the wait bound.
	pub fn with_missing_receipts(mut self) -> Self {
		self.receipts_missing = true;
		self
	}

	/// Every signing prompt fails with `message`.
	pub fn rejecting(mut self, message: &str) -> Self {
		self.rejection = Some(message.to_string());
		self
	}

	pub fn disconnected(self) -> Self {
		self.connected.store(false, Ordering::SeqCst);
		self
	}

	pub fn calls(&self) -> Vec<String> {
		lock(&self.calls)
	}

	pub fn approvals(&self) -> Vec<U256> {
		lock(&self.approvals)
	}

	pub fn sent(&self) -> Vec<ExecutionPayload> {
		lock(&self.sent)
	}

	fn record(&self, call: impl Into<String>) {
		push(&self.calls, call.into());
	}

	fn prompt(&self) -> Result<(), WalletError> {
		if !self.connected.load(Ordering::SeqCst) {
			return Err(WalletError::NotConnected);
		}
		match &self.rejection {
			Some(message) => Err(WalletError::from_message(message.clone())),
			None => Ok(()),
		}
	}

	fn next_hash(&self) -> TransactionId {
		let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
		TransactionId(format!("0x{:064x}", n))
	}
}

#[async_trait]
impl WalletAdapter for FakeEvmWallet {
	fn family(&self) -> ChainFamily {
		ChainFamily::Evm
	}

	fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	fn current_address(&self) -> Result<String, WalletError> {
		if !self.is_connected() {
			return Err(WalletError::NotConnected);
		}
		Ok(SENDER.to_string())
	}

	async fn sign_identity_message(&self, _payload: &str) -> Result<String, WalletError> {
		self.record("sign_identity");
		self.prompt()?;
		Ok(format!("0x{}", "ab".repeat(65)))
	}

	async fn sign_and_send(&self, payload: &ExecutionPayload) -> Result<TransactionId, WalletError> {
		self.record("send");
		self.prompt()?;
		push(&self.sent, payload.clone());
		Ok(self.next_hash())
	}
}

#[async_trait]
impl EvmWallet for FakeEvmWallet {
	async fn chain_id(&self) -> Result<u64, WalletError> {
		Ok(self.chain.load(Ordering::SeqCst))
	}

	async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
		self.record(format!("switch:{}", chain_id));
		self.chain.store(chain_id, Ordering::SeqCst);
		Ok(())
	}

	async fn gas_price(&self) -> Result<u128, WalletError> {
		Ok(self.gas_price)
	}

	async fn allowance(&self, _token: &str, _owner: &str, _spender: &str) -> Result<U256, WalletError> {
		self.record("allowance");
		Ok(self.allowance)
	}

	async fn send_approval(
		&self,
		_token: &str,
		_spender: &str,
		amount: U256,
	) -> Result<TransactionId, WalletError> {
		self.record("approve");
		self.prompt()?;
		push(&self.approvals, amount);
		Ok(self.next_hash())
	}

	async fn wait_for_receipt(
		&self,
		tx: &TransactionId,
		_timeout: Duration,
	) -> Result<bool, WalletError> {
		self.record("receipt");
		if self.receipts_missing {
			return Err(WalletError::Timeout(format!("No receipt for {}", tx)));
		}
		Ok(self.receipts_succeed)
	}
}

/// Solana wallet whose confirmation outcome is scripted.
pub struct FakeSolanaWallet {
	confirmation: Result<(), WalletError>,
	calls: Mutex<Vec<String>>,
}

impl FakeSolanaWallet {
	pub fn new() -> Self {
		Self {
			confirmation: Ok(()),
			calls: Mutex::new(Vec::new()),
		}
	}

	pub fn failing_on_chain(mut self, err: &str) -> Self {
		self.confirmation = Err(WalletError::OnChain(err.to_string()));
		self
	}

	pub fn never_confirming(mut self) -> Self {
		self.confirmation = Err(WalletError::Timeout("Signature not confirmed".to_string()));
		self
	}

	pub fn calls(&self) -> Vec<String> {
		lock(&self.calls)
	}
}

#[async_trait]
impl WalletAdapter for FakeSolanaWallet {
	fn family(&self) -> ChainFamily {
		ChainFamily::Solana
	}

	fn is_connected(&self) -> bool {
		true
	}

	fn current_address(&self) -> Result<String, WalletError> {
		Ok(SOLANA_SENDER.to_string())
	}

	async fn sign_identity_message(&self, _payload: &str) -> Result<String, WalletError> {
		push(&self.calls, "sign_identity".to_string());
		Ok("5VERYLONGBASE58SIGNATURE".to_string())
	}

	async fn sign_and_send(&self, payload: &ExecutionPayload) -> Result<TransactionId, WalletError> {
		push(&self.calls, format!("send:{}", payload.data));
		Ok(TransactionId("4sGjMW1sUnHzSxGspuhpqLDx6wiyjNtZAMdL4VZHirAn".to_string()))
	}
}

#[async_trait]
impl SolanaWallet for FakeSolanaWallet {
	async fn confirm_signature(
		&self,
		_signature: &TransactionId,
		_timeout: Duration,
	) -> Result<(), WalletError> {
		push(&self.calls, "confirm".to_string());
		self.confirmation.clone()
	}
}

/// Bitcoin wallet of a given kind; capabilities follow the kind.
pub struct FakeBitcoinWallet {
	kind: BitcoinWalletKind,
	calls: Mutex<Vec<String>>,
}

impl FakeBitcoinWallet {
	pub fn new(kind: BitcoinWalletKind) -> Self {
		Self {
			kind,
			calls: Mutex::new(Vec::new()),
		}
	}

	pub fn calls(&self) -> Vec<String> {
		lock(&self.calls)
	}
}

#[async_trait]
impl WalletAdapter for FakeBitcoinWallet {
	fn family(&self) -> ChainFamily {
		ChainFamily::Bitcoin
	}

	fn is_connected(&self) -> bool {
		true
	}

	fn current_address(&self) -> Result<String, WalletError> {
		Ok(BITCOIN_SENDER.to_string())
	}

	async fn sign_identity_message(&self, _payload: &str) -> Result<String, WalletError> {
		push(&self.calls, "sign_identity".to_string());
		Ok("H3ZmYWtlLXNpZw==".to_string())
	}

	async fn sign_and_send(&self, payload: &ExecutionPayload) -> Result<TransactionId, WalletError> {
		let signed = self.sign_psbt(&payload.data).await?;
		self.push_psbt(&signed).await
	}
}

#[async_trait]
impl BitcoinWallet for FakeBitcoinWallet {
	fn kind(&self) -> BitcoinWalletKind {
		self.kind
	}

	async fn sign_psbt(&self, psbt_hex: &str) -> Result<String, WalletError> {
		push(&self.calls, "sign_psbt".to_string());
		Ok(psbt_hex.to_string())
	}

	async fn push_psbt(&self, _signed_psbt_hex: &str) -> Result<TransactionId, WalletError> {
		push(&self.calls, "push_psbt".to_string());
		Ok(TransactionId(
			"f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16".to_string(),
		))
	}
}

/// Sui wallet recording executed blocks.
pub struct FakeSuiWallet {
	executed: Mutex<Vec<(SuiTransactionBlock, String)>>,
}

impl FakeSuiWallet {
	pub fn new() -> Self {
		Self {
			executed: Mutex::new(Vec::new()),
		}
	}

	pub fn executed(&self) -> Vec<(SuiTransactionBlock, String)> {
		lock(&self.executed)
	}
}

#[async_trait]
impl WalletAdapter for FakeSuiWallet {
	fn family(&self) -> ChainFamily {
		ChainFamily::Sui
	}

	fn is_connected(&self) -> bool {
		true
	}

	fn current_address(&self) -> Result<String, WalletError> {
		Ok(SUI_SENDER.to_string())
	}

	async fn sign_identity_message(&self, _payload: &str) -> Result<String, WalletError> {
		Ok("AFakeSuiSignature".to_string())
	}

	async fn sign_and_send(&self, _payload: &ExecutionPayload) -> Result<TransactionId, WalletError> {
		Err(WalletError::Unsupported(
			"use sign_and_execute for Sui transaction blocks".into(),
		))
	}
}

#[async_trait]
impl SuiWallet for FakeSuiWallet {
	async fn sign_and_execute(
		&self,
		block: &SuiTransactionBlock,
		network: &str,
	) -> Result<TransactionId, WalletError> {
		push(&self.executed, (block.clone(), network.to_string()));
		Ok(TransactionId("9mT3nGvWzbyKxQ7DzBTCn8wfHdUa1hYK5oJq2rL4sXpE".to_string()))
	}
}

/// Aggregator returning a fixed response.
pub struct FakeQuoteClient {
	response: Result<Quote, QuoteError>,
	delay: Option<Duration>,
	calls: AtomicUsize,
	slippages: Mutex<Vec<Decimal>>,
}

impl FakeQuoteClient {
	pub fn returning(quote: Quote) -> Self {
		Self {
			response: Ok(quote),
			delay: None,
			calls: AtomicUsize::new(0),
			slippages: Mutex::new(Vec::new()),
		}
	}

	pub fn failing(err: QuoteError) -> Self {
		Self {
			response: Err(err),
			delay: None,
			calls: AtomicUsize::new(0),
			slippages: Mutex::new(Vec::new()),
		}
	}

	/// Answers only after `delay`.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn slippages(&self) -> Vec<Decimal> {
		lock(&self.slippages)
	}
}

#[async_trait]
impl QuoteInterface for FakeQuoteClient {
	async fn get_quote(&self, _request: &TipRequest, slippage: Decimal) -> Result<Quote, QuoteError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		push(&self.slippages, slippage);
		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}
		self.response.clone()
	}
}

/// Login endpoint with a scripted outcome.
pub struct FakeIdentity {
	outcome: Result<LoginOutcome, BackendError>,
	logins: AtomicUsize,
}

impl FakeIdentity {
	pub fn session(token: &str) -> Self {
		Self {
			outcome: Ok(LoginOutcome::Session {
				token: SecretString::from(token),
				expires_in: None,
			}),
			logins: AtomicUsize::new(0),
		}
	}

	pub fn failing(err: BackendError) -> Self {
		Self {
			outcome: Err(err),
			logins: AtomicUsize::new(0),
		}
	}

	pub fn signup_needed() -> Self {
		Self {
			outcome: Ok(LoginOutcome::SignupNeeded {
				signup_token: SecretString::from("signup-1"),
			}),
			logins: AtomicUsize::new(0),
		}
	}

	pub fn logins(&self) -> usize {
		self.logins.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl IdentityInterface for FakeIdentity {
	async fn login(
		&self,
		_address: &str,
		_timestamp: u64,
		_signature: &str,
	) -> Result<LoginOutcome, BackendError> {
		self.logins.fetch_add(1, Ordering::SeqCst);
		self.outcome.clone()
	}
}

/// Ledger that keeps every record it receives.
pub struct FakeLedger {
	failure: Option<BackendError>,
	records: Mutex<Vec<(TipRecord, Option<String>)>>,
}

impl FakeLedger {
	pub fn new() -> Self {
		Self {
			failure: None,
			records: Mutex::new(Vec::new()),
		}
	}

	pub fn failing(err: BackendError) -> Self {
		Self {
			failure: Some(err),
			records: Mutex::new(Vec::new()),
		}
	}

	pub fn records(&self) -> Vec<(TipRecord, Option<String>)> {
		lock(&self.records)
	}
}

#[async_trait]
impl LedgerInterface for FakeLedger {
	async fn record_tip(
		&self,
		record: &TipRecord,
		session: Option<&SecretString>,
	) -> Result<(), BackendError> {
		push(
			&self.records,
			(record.clone(), session.map(|s| s.expose_secret().to_string())),
		);
		match &self.failure {
			Some(err) => Err(err.clone()),
			None => Ok(()),
		}
	}
}
