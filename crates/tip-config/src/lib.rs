//! Configuration module for the tip settlement system.
//!
//! Configuration is loaded from a single TOML file. String values may
//! reference environment variables as `${VAR}` or `${VAR:-default}`, which
//! keeps private keys and API keys out of the file itself. The parsed
//! configuration is validated before it is returned, so an unknown chain id
//! is reported at startup rather than during a tip.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tip_types::{ChainDescriptor, ChainFamily, ChainRegistry, GasTier, SecretString};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Bitcoin wallets the engine knows how to negotiate capabilities with.
pub const BITCOIN_WALLET_KINDS: [&str; 5] = ["unisat", "xverse", "leather", "phantom", "metamask"];

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Settlement attempt policy.
	#[serde(default)]
	pub engine: EngineConfig,
	/// Where recipients receive value.
	pub settlement: SettlementConfig,
	/// Quote aggregator endpoint and fee policy.
	#[serde(default)]
	pub aggregator: AggregatorConfig,
	/// Backend used for identity login and the tip ledger.
	pub backend: Option<BackendConfig>,
	/// EVM networks keyed by chain id.
	#[serde(default, deserialize_with = "deserialize_networks")]
	pub networks: HashMap<u64, NetworkConfig>,
	pub solana: Option<SolanaConfig>,
	pub sui: Option<SuiConfig>,
	/// Wallet bridge used for browser-only Bitcoin and Sui wallets.
	pub bridge: Option<BridgeConfig>,
	#[serde(default)]
	pub wallets: WalletsConfig,
}

/// Settlement attempt policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
	/// Maximum slippage as a fraction, e.g. 0.005 for 0.5%.
	#[serde(default = "default_slippage")]
	pub slippage: Decimal,
	#[serde(default)]
	pub gas_tier: GasTier,
	/// Upper bound on waiting for an EVM receipt (approval or tip).
	#[serde(default = "default_receipt_timeout_seconds")]
	pub receipt_timeout_seconds: u64,
	/// Upper bound on polling for Solana confirmation.
	#[serde(default = "default_confirmation_timeout_seconds")]
	pub confirmation_timeout_seconds: u64,
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			slippage: default_slippage(),
			gas_tier: GasTier::default(),
			receipt_timeout_seconds: default_receipt_timeout_seconds(),
			confirmation_timeout_seconds: default_confirmation_timeout_seconds(),
			poll_interval_seconds: default_poll_interval_seconds(),
		}
	}
}

fn default_slippage() -> Decimal {
	Decimal::new(5, 3) // 0.5%
}

fn default_receipt_timeout_seconds() -> u64 {
	180
}

fn default_confirmation_timeout_seconds() -> u64 {
	90
}

fn default_poll_interval_seconds() -> u64 {
	2
}

/// Destination of every tip.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettlementConfig {
	/// Chain the recipient receives value on.
	pub chain_id: u64,
	/// Asset received on the destination chain. Defaults to its native asset.
	pub token: Option<String>,
}

/// Quote aggregator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregatorConfig {
	#[serde(default = "default_aggregator_url")]
	pub base_url: String,
	/// Integrator name the aggregator attributes fees to.
	#[serde(default = "default_integrator")]
	pub integrator: String,
	/// Integrator fee as a fraction of the tip.
	#[serde(default = "default_fee")]
	pub fee: Decimal,
	pub api_key: Option<SecretString>,
	#[serde(default = "default_http_timeout_seconds")]
	pub timeout_seconds: u64,
}

impl Default for AggregatorConfig {
	fn default() -> Self {
		Self {
			base_url: default_aggregator_url(),
			integrator: default_integrator(),
			fee: default_fee(),
			api_key: None,
			timeout_seconds: default_http_timeout_seconds(),
		}
	}
}

fn default_aggregator_url() -> String {
	"https://li.quest/v1".to_string()
}

fn default_integrator() -> String {
	"only-tokens-tips".to_string()
}

fn default_fee() -> Decimal {
	Decimal::new(1, 2) // 1%
}

fn default_http_timeout_seconds() -> u64 {
	30
}

/// Backend used for wallet login and tip recording.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
	pub base_url: String,
	/// How long a session token obtained by wallet login is reused.
	#[serde(default = "default_session_ttl_seconds")]
	pub session_ttl_seconds: u64,
	#[serde(default = "default_backend_timeout_seconds")]
	pub timeout_seconds: u64,
}

fn default_session_ttl_seconds() -> u64 {
	3600
}

fn default_backend_timeout_seconds() -> u64 {
	10
}

/// An EVM network the sender may pay from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub rpc_url: String,
	/// Display name; required for chains outside the built-in registry.
	pub name: Option<String>,
	/// Native asset symbol for chains outside the built-in registry.
	pub native_symbol: Option<String>,
}

/// Solana RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolanaConfig {
	pub rpc_url: String,
	#[serde(default = "default_commitment")]
	pub commitment: String,
}

fn default_commitment() -> String {
	"confirmed".to_string()
}

/// Sui configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SuiConfig {
	/// Network name passed to the wallet, e.g. "sui:mainnet".
	#[serde(default = "default_sui_network")]
	pub network: String,
	/// Fixed address that receives Sui tips.
	pub settlement_address: String,
}

fn default_sui_network() -> String {
	"sui:mainnet".to_string()
}

/// Wallet bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
	pub url: String,
	/// Bound on account and broadcast calls. Signing prompts wait for the user.
	#[serde(default = "default_http_timeout_seconds")]
	pub timeout_seconds: u64,
}

/// Local signing material and connected wallet selection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WalletsConfig {
	pub evm_private_key: Option<SecretString>,
	pub solana_keypair_path: Option<String>,
	/// Bitcoin wallet behind the bridge, one of [`BITCOIN_WALLET_KINDS`].
	pub bitcoin_wallet: Option<String>,
	/// Sui wallet name on the bridge, e.g. "slush".
	pub sui_wallet: Option<String>,
}

/// Deserializes `[networks.<chain_id>]` tables, whose keys TOML can only
/// express as strings.
fn deserialize_networks<'de, D>(deserializer: D) -> Result<HashMap<u64, NetworkConfig>, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	string_map
		.into_iter()
		.map(|(key, value)| {
			key.parse::<u64>()
				.map(|chain_id| (chain_id, value))
				.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))
		})
		.collect()
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of VAR_NAME and supports defaults
/// with ${VAR_NAME:-default_value}. Input is limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};
		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads and validates configuration from a TOML file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	/// Builds the chain registry: the built-in chains plus any configured
	/// EVM network that the built-in table does not know.
	pub fn registry(&self) -> Result<ChainRegistry, ConfigError> {
		let builtin = ChainRegistry::new();
		let mut extra = Vec::new();
		for (chain_id, network) in &self.networks {
			if builtin.contains(*chain_id) {
				continue;
			}
			let name = network.name.as_deref().ok_or_else(|| {
				ConfigError::Validation(format!(
					"Network {} is not a known chain and must declare a name",
					chain_id
				))
			})?;
			let symbol = network.native_symbol.as_deref().unwrap_or("ETH");
			extra.push(ChainDescriptor::evm(
				*chain_id,
				&name.to_ascii_lowercase(),
				name,
				symbol,
			));
		}
		ChainRegistry::with_chains(extra).map_err(|e| ConfigError::Validation(e.to_string()))
	}

	/// Asset the recipient receives on the settlement chain.
	pub fn settlement_token(&self) -> Result<String, ConfigError> {
		if let Some(token) = &self.settlement.token {
			return Ok(token.clone());
		}
		let registry = self.registry()?;
		let chain = registry
			.describe(self.settlement.chain_id)
			.map_err(|e| ConfigError::Validation(e.to_string()))?;
		Ok(chain.native.address.clone())
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		let registry = self.registry()?;

		// Engine policy
		if self.engine.slippage <= Decimal::ZERO || self.engine.slippage > Decimal::new(5, 1) {
			return Err(ConfigError::Validation(format!(
				"slippage must be in (0, 0.5], got {}",
				self.engine.slippage
			)));
		}
		if self.engine.receipt_timeout_seconds == 0
			|| self.engine.confirmation_timeout_seconds == 0
		{
			return Err(ConfigError::Validation(
				"receipt and confirmation timeouts must be greater than 0".into(),
			));
		}
		if self.engine.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"poll_interval_seconds must be greater than 0".into(),
			));
		}

		// Settlement destination
		if !registry.contains(self.settlement.chain_id) {
			return Err(ConfigError::Validation(format!(
				"Settlement chain {} is not a known chain",
				self.settlement.chain_id
			)));
		}

		// Aggregator
		if self.aggregator.base_url.is_empty() {
			return Err(ConfigError::Validation(
				"aggregator.base_url cannot be empty".into(),
			));
		}
		if self.aggregator.integrator.is_empty() {
			return Err(ConfigError::Validation(
				"aggregator.integrator cannot be empty".into(),
			));
		}
		if self.aggregator.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"aggregator.timeout_seconds must be greater than 0".into(),
			));
		}
		if self.aggregator.fee < Decimal::ZERO || self.aggregator.fee >= Decimal::new(1, 1) {
			return Err(ConfigError::Validation(format!(
				"aggregator.fee must be in [0, 0.1), got {}",
				self.aggregator.fee
			)));
		}

		// Backend
		if let Some(backend) = &self.backend {
			if backend.base_url.is_empty() {
				return Err(ConfigError::Validation(
					"backend.base_url cannot be empty".into(),
				));
			}
			if backend.timeout_seconds == 0 {
				return Err(ConfigError::Validation(
					"backend.timeout_seconds must be greater than 0".into(),
				));
			}
			if backend.session_ttl_seconds == 0 {
				return Err(ConfigError::Validation(
					"backend.session_ttl_seconds must be greater than 0".into(),
				));
			}
		}

		// Networks must be EVM chains
		for (chain_id, network) in &self.networks {
			let chain = registry
				.describe(*chain_id)
				.map_err(|e| ConfigError::Validation(e.to_string()))?;
			if chain.family != ChainFamily::Evm {
				return Err(ConfigError::Validation(format!(
					"Network {} ({}) is not an EVM chain",
					chain_id, chain.name
				)));
			}
			if network.rpc_url.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {} must have an rpc_url",
					chain_id
				)));
			}
		}

		if let Some(bridge) = &self.bridge {
			if bridge.url.is_empty() {
				return Err(ConfigError::Validation("bridge.url cannot be empty".into()));
			}
			if bridge.timeout_seconds == 0 {
				return Err(ConfigError::Validation(
					"bridge.timeout_seconds must be greater than 0".into(),
				));
			}
		}

		// Sui settlement address
		if let Some(sui) = &self.sui {
			if !ChainFamily::Sui.validate_address(&sui.settlement_address) {
				return Err(ConfigError::Validation(format!(
					"sui.settlement_address '{}' is not a Sui address",
					sui.settlement_address
				)));
			}
		}

		if let Some(kind) = &self.wallets.bitcoin_wallet {
			if !BITCOIN_WALLET_KINDS.contains(&kind.to_ascii_lowercase().as_str()) {
				return Err(ConfigError::Validation(format!(
					"Unknown bitcoin wallet '{}', expected one of {:?}",
					kind, BITCOIN_WALLET_KINDS
				)));
			}
			if self.bridge.is_none() {
				return Err(ConfigError::Validation(
					"A bitcoin wallet requires a [bridge] section".into(),
				));
			}
		}

		if self.wallets.sui_wallet.is_some() {
			if self.sui.is_none() {
				return Err(ConfigError::Validation(
					"A sui wallet requires a [sui] section".into(),
				));
			}
			if self.bridge.is_none() {
				return Err(ConfigError::Validation(
					"A sui wallet requires a [bridge] section".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string, resolving environment variables
/// and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tip_types::{EVM_NATIVE_ADDRESS, SOLANA_CHAIN_ID};

	const MINIMAL: &str = r#"
[settlement]
chain_id = 8453

[networks.1]
rpc_url = "http://localhost:8545"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TIP_TEST_HOST", "localhost");
		std::env::set_var("TIP_TEST_PORT", "8545");

		let input = "rpc_url = \"http://${TIP_TEST_HOST}:${TIP_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "rpc_url = \"http://localhost:8545\"");

		std::env::remove_var("TIP_TEST_HOST");
		std::env::remove_var("TIP_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "api_key = \"${TIP_MISSING_VAR:-fallback}\"";
		assert_eq!(resolve_env_vars(input).unwrap(), "api_key = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("key = \"${TIP_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("TIP_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.engine.slippage, Decimal::new(5, 3));
		assert_eq!(config.engine.gas_tier, GasTier::Auto);
		assert_eq!(config.aggregator.base_url, "https://li.quest/v1");
		assert_eq!(config.aggregator.fee, Decimal::new(1, 2));
		assert_eq!(config.settlement_token().unwrap(), EVM_NATIVE_ADDRESS);
		assert!(config.backend.is_none());
	}

	#[test]
	fn test_full_config() {
		std::env::set_var("TIP_TEST_EVM_KEY", "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80");
		let config_str = r#"
[engine]
slippage = "0.01"
gas_tier = "fast"
receipt_timeout_seconds = 60

[settlement]
chain_id = 8453
token = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"

[aggregator]
integrator = "my-tips"
fee = "0.02"
api_key = "${TIP_TEST_LIFI_KEY:-none}"

[backend]
base_url = "https://api.example.com"

[networks.1]
rpc_url = "http://localhost:8545"

[networks.324]
rpc_url = "http://localhost:3050"
name = "zkSync"

[solana]
rpc_url = "http://localhost:8899"

[sui]
settlement_address = "0x7d20dcdb2bca4f508ea9613994683eb4e76e9c4ed371169677c1be02aaf0b58e"

[bridge]
url = "http://localhost:7070"

[wallets]
evm_private_key = "${TIP_TEST_EVM_KEY}"
bitcoin_wallet = "unisat"
"#;
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.engine.gas_tier, GasTier::Fast);
		assert_eq!(config.engine.receipt_timeout_seconds, 60);
		assert_eq!(config.aggregator.api_key.as_ref().unwrap().expose_secret(), "none");
		assert_eq!(
			config.settlement_token().unwrap(),
			"0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
		);
		let registry = config.registry().unwrap();
		assert_eq!(registry.describe(324).unwrap().name, "zkSync");
		assert_eq!(config.sui.as_ref().unwrap().network, "sui:mainnet");
		assert!(config.wallets.evm_private_key.is_some());
		std::env::remove_var("TIP_TEST_EVM_KEY");
	}

	#[test]
	fn test_unknown_settlement_chain_rejected() {
		let config_str = "[settlement]\nchain_id = 999\n";
		let err = Config::from_str(config_str).unwrap_err();
		assert!(err.to_string().contains("Settlement chain 999"));
	}

	#[test]
	fn test_unknown_network_without_name_rejected() {
		let config_str = r#"
[settlement]
chain_id = 8453

[networks.777]
rpc_url = "http://localhost:8545"
"#;
		let err = Config::from_str(config_str).unwrap_err();
		assert!(err.to_string().contains("must declare a name"));
	}

	#[test]
	fn test_non_evm_network_rejected() {
		let config_str = format!(
			"[settlement]\nchain_id = 8453\n\n[networks.{}]\nrpc_url = \"http://localhost:8899\"\n",
			SOLANA_CHAIN_ID
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("is not an EVM chain"));
	}

	#[test]
	fn test_slippage_bounds() {
		let config_str = "[engine]\nslippage = \"0.9\"\n\n[settlement]\nchain_id = 8453\n";
		assert!(Config::from_str(config_str)
			.unwrap_err()
			.to_string()
			.contains("slippage"));
	}

	#[test]
	fn test_zero_http_timeouts_rejected() {
		let config_str = "[settlement]\nchain_id = 8453\n\n[aggregator]\ntimeout_seconds = 0\n";
		assert!(Config::from_str(config_str)
			.unwrap_err()
			.to_string()
			.contains("aggregator.timeout_seconds"));

		let config_str = "[settlement]\nchain_id = 8453\n\n[bridge]\nurl = \"http://localhost:7070\"\ntimeout_seconds = 0\n";
		assert!(Config::from_str(config_str)
			.unwrap_err()
			.to_string()
			.contains("bridge.timeout_seconds"));

		let config_str = "[settlement]\nchain_id = 8453\n\n[backend]\nbase_url = \"http://localhost:3000\"\ntimeout_seconds = 0\n";
		assert!(Config::from_str(config_str)
			.unwrap_err()
			.to_string()
			.contains("backend.timeout_seconds"));
	}

	#[test]
	fn test_bitcoin_wallet_requires_bridge() {
		let config_str = "[settlement]\nchain_id = 8453\n\n[wallets]\nbitcoin_wallet = \"xverse\"\n";
		assert!(Config::from_str(config_str)
			.unwrap_err()
			.to_string()
			.contains("[bridge]"));

		let config_str = "[settlement]\nchain_id = 8453\n\n[wallets]\nbitcoin_wallet = \"electrum\"\n";
		assert!(Config::from_str(config_str)
			.unwrap_err()
			.to_string()
			.contains("Unknown bitcoin wallet"));
	}

	#[test]
	fn test_invalid_sui_address_rejected() {
		let config_str = "[settlement]\nchain_id = 8453\n\n[sui]\nsettlement_address = \"alice\"\n";
		assert!(Config::from_str(config_str)
			.unwrap_err()
			.to_string()
			.contains("sui.settlement_address"));
	}

	#[test]
	fn test_sui_wallet_requires_sui_section() {
		let config_str = "[settlement]\nchain_id = 8453\n\n[bridge]\nurl = \"http://localhost:7070\"\n\n[wallets]\nsui_wallet = \"slush\"\n";
		assert!(Config::from_str(config_str)
			.unwrap_err()
			.to_string()
			.contains("[sui]"));
	}

	#[tokio::test]
	async fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(MINIMAL.as_bytes()).unwrap();

		let config = Config::from_file(file.path()).await.unwrap();
		assert_eq!(config.settlement.chain_id, 8453);
		assert!(config.networks.contains_key(&1));
	}

	#[tokio::test]
	async fn test_from_missing_file() {
		let err = Config::from_file("/nonexistent/tipper.toml").await.unwrap_err();
		assert!(matches!(err, ConfigError::Io(_)));
	}
}
