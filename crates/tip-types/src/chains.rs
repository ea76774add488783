//! Chain registry for multi-family tip settlement.
//!
//! Every chain the engine can settle from or to is described by a
//! [`ChainDescriptor`]: its aggregator chain id, the family that decides how
//! transactions are signed, and the native asset used for amount conversion.
//! The registry is immutable once built and performs no I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Native asset sentinel used by the aggregator for EVM chains.
pub const EVM_NATIVE_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
/// Native asset sentinel for SOL (the system program id).
pub const SOLANA_NATIVE_ADDRESS: &str = "11111111111111111111111111111111";
/// Native asset sentinel for BTC.
pub const BITCOIN_NATIVE_ADDRESS: &str = "bitcoin";
/// Native asset sentinel for SUI.
pub const SUI_NATIVE_ADDRESS: &str = "0x2::sui::SUI";

/// Aggregator chain id for Bitcoin mainnet.
pub const BITCOIN_CHAIN_ID: u64 = 20_000_000_000_001;
/// Aggregator chain id for Solana mainnet.
pub const SOLANA_CHAIN_ID: u64 = 1_151_111_081_099_710;
/// Aggregator chain id for Sui mainnet.
pub const SUI_CHAIN_ID: u64 = 9_270_000_000_000_000;

static EVM_ADDRESS: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("valid EVM address pattern"));
static SOLANA_ADDRESS: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("valid Solana address pattern")
});
static BITCOIN_ADDRESS: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^(1|3|bc1)[a-zA-Z0-9]{25,39}$").expect("valid Bitcoin address pattern")
});
static SUI_ADDRESS: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{1,64}$").expect("valid Sui address pattern"));

/// Errors that can occur when looking up chains.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
	/// The chain id is not part of the registry.
	#[error("Unknown chain id: {0}")]
	UnknownChain(u64),
	/// A chain with the same id was registered twice.
	#[error("Chain {0} is already registered")]
	DuplicateChain(u64),
	/// A chain name could not be parsed into a family.
	#[error("Unknown chain family: {0}")]
	UnknownFamily(String),
}

/// A class of blockchains sharing one transaction and signing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
	/// Account based chains with contract calls and ERC-20 allowances.
	Evm,
	/// Solana, signing versioned transactions.
	Solana,
	/// Bitcoin, signing PSBTs over UTXOs.
	Bitcoin,
	/// Sui, executing programmable transaction blocks.
	Sui,
}

impl ChainFamily {
	/// Every supported family, in display order.
	pub const ALL: [ChainFamily; 4] = [
		ChainFamily::Bitcoin,
		ChainFamily::Solana,
		ChainFamily::Sui,
		ChainFamily::Evm,
	];

	/// Checks that `address` is well formed for this family.
	pub fn validate_address(&self, address: &str) -> bool {
		if address.is_empty() {
			return false;
		}
		match self {
			ChainFamily::Evm => EVM_ADDRESS.is_match(address),
			ChainFamily::Solana => SOLANA_ADDRESS.is_match(address),
			ChainFamily::Bitcoin => BITCOIN_ADDRESS.is_match(address),
			ChainFamily::Sui => SUI_ADDRESS.is_match(address),
		}
	}

	/// The aggregator sentinel identifying this family's native asset.
	pub fn native_address(&self) -> &'static str {
		match self {
			ChainFamily::Evm => EVM_NATIVE_ADDRESS,
			ChainFamily::Solana => SOLANA_NATIVE_ADDRESS,
			ChainFamily::Bitcoin => BITCOIN_NATIVE_ADDRESS,
			ChainFamily::Sui => SUI_NATIVE_ADDRESS,
		}
	}
}

impl fmt::Display for ChainFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ChainFamily::Evm => "EVM",
			ChainFamily::Solana => "Solana",
			ChainFamily::Bitcoin => "Bitcoin",
			ChainFamily::Sui => "Sui",
		};
		write!(f, "{}", name)
	}
}

impl FromStr for ChainFamily {
	type Err = RegistryError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"evm" => Ok(ChainFamily::Evm),
			"solana" | "sol" => Ok(ChainFamily::Solana),
			"bitcoin" | "btc" => Ok(ChainFamily::Bitcoin),
			"sui" => Ok(ChainFamily::Sui),
			other => Err(RegistryError::UnknownFamily(other.to_string())),
		}
	}
}

/// Descriptor of a chain's native asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeAsset {
	pub symbol: String,
	pub name: String,
	pub decimals: u8,
	/// Sentinel address the aggregator uses for the native asset.
	pub address: String,
}

/// Immutable description of one supported chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
	/// Aggregator chain id.
	pub id: u64,
	/// Short key such as "eth" or "sol".
	pub key: String,
	/// Human readable name used in status messages.
	pub name: String,
	pub family: ChainFamily,
	pub native: NativeAsset,
}

impl ChainDescriptor {
	/// Describes an EVM chain whose native asset is 18-decimal.
	pub fn evm(id: u64, key: &str, name: &str, symbol: &str) -> Self {
		Self {
			id,
			key: key.to_string(),
			name: name.to_string(),
			family: ChainFamily::Evm,
			native: NativeAsset {
				symbol: symbol.to_string(),
				name: symbol.to_string(),
				decimals: 18,
				address: EVM_NATIVE_ADDRESS.to_string(),
			},
		}
	}

	fn non_evm(id: u64, key: &str, name: &str, family: ChainFamily, symbol: &str, decimals: u8) -> Self {
		Self {
			id,
			key: key.to_string(),
			name: name.to_string(),
			family,
			native: NativeAsset {
				symbol: symbol.to_string(),
				name: name.to_string(),
				decimals,
				address: family.native_address().to_string(),
			},
		}
	}

	/// Returns true if `asset_address` denotes this chain's native asset.
	///
	/// EVM hex addresses compare case-insensitively.
	pub fn is_native(&self, asset_address: &str) -> bool {
		match self.family {
			ChainFamily::Evm => asset_address.eq_ignore_ascii_case(&self.native.address),
			_ => asset_address == self.native.address,
		}
	}

	/// Checks an address against this chain's family format.
	pub fn validate_address(&self, address: &str) -> bool {
		self.family.validate_address(address)
	}
}

/// Static table of supported chains keyed by aggregator chain id.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
	chains: HashMap<u64, ChainDescriptor>,
}

impl ChainRegistry {
	/// Creates the registry with the built-in chain set.
	pub fn new() -> Self {
		let chains = builtin_chains()
			.into_iter()
			.map(|chain| (chain.id, chain))
			.collect();
		Self { chains }
	}

	/// Creates the built-in registry extended with additional chains.
	///
	/// Extra chains must not reuse a built-in id.
	pub fn with_chains(extra: Vec<ChainDescriptor>) -> Result<Self, RegistryError> {
		let mut registry = Self::new();
		for chain in extra {
			if registry.chains.contains_key(&chain.id) {
				return Err(RegistryError::DuplicateChain(chain.id));
			}
			registry.chains.insert(chain.id, chain);
		}
		Ok(registry)
	}

	/// Looks up a chain descriptor.
	pub fn describe(&self, chain_id: u64) -> Result<&ChainDescriptor, RegistryError> {
		self.chains
			.get(&chain_id)
			.ok_or(RegistryError::UnknownChain(chain_id))
	}

	/// Validates an address for the given chain.
	pub fn validate_address(&self, chain_id: u64, address: &str) -> Result<bool, RegistryError> {
		Ok(self.describe(chain_id)?.validate_address(address))
	}

	/// Returns true if the chain id is registered.
	pub fn contains(&self, chain_id: u64) -> bool {
		self.chains.contains_key(&chain_id)
	}

	/// Iterates over all registered chains in no particular order.
	pub fn chains(&self) -> impl Iterator<Item = &ChainDescriptor> {
		self.chains.values()
	}
}

impl Default for ChainRegistry {
	fn default() -> Self {
		Self::new()
	}
}

fn builtin_chains() -> Vec<ChainDescriptor> {
	vec![
		ChainDescriptor::non_evm(BITCOIN_CHAIN_ID, "btc", "Bitcoin", ChainFamily::Bitcoin, "BTC", 8),
		ChainDescriptor::non_evm(SOLANA_CHAIN_ID, "sol", "Solana", ChainFamily::Solana, "SOL", 9),
		ChainDescriptor::non_evm(SUI_CHAIN_ID, "sui", "Sui", ChainFamily::Sui, "SUI", 9),
		ChainDescriptor::evm(1, "eth", "Ethereum", "ETH"),
		ChainDescriptor::evm(10, "opt", "Optimism", "ETH"),
		ChainDescriptor::evm(56, "bsc", "BNB Chain", "BNB"),
		ChainDescriptor::evm(137, "pol", "Polygon", "POL"),
		ChainDescriptor::evm(8453, "bas", "Base", "ETH"),
		ChainDescriptor::evm(42161, "arb", "Arbitrum", "ETH"),
	]
}
