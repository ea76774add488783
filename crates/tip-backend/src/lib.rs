//! Backend collaborators for the tip settlement system.
//!
//! Two services live behind the backend: wallet login, which turns an
//! identity signature into a session token, and the tip ledger, which records
//! completed tips for the streamer's overlay. Neither affects whether a tip
//! settles; the engine treats both as best effort.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tip_types::{ExecutionResult, SecretString};

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

pub use implementations::http::{HttpIdentityProver, HttpLedger};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// The backend answered with a non-success status.
	#[error("Backend returned {status}: {message}")]
	Rejected { status: u16, message: String },
	/// The response body did not have the expected shape.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

/// The message a wallet signs to prove it controls `address`.
#[derive(Debug, Clone, Serialize)]
struct IdentityMessage<'a> {
	address: &'a str,
	timestamp: u64,
}

/// Canonical identity message: `{"address":"<addr>","timestamp":<unix>}`.
pub fn identity_message(address: &str, timestamp: u64) -> String {
	// Field order is fixed by the struct, so the output is canonical.
	serde_json::to_string(&IdentityMessage { address, timestamp })
		.unwrap_or_else(|_| format!(r#"{{"address":"{}","timestamp":{}}}"#, address, timestamp))
}

/// Result of a wallet login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
	/// The wallet belongs to an account; the token authenticates ledger calls.
	Session {
		token: SecretString,
		/// Lifetime the backend granted, in seconds.
		expires_in: Option<u64>,
	},
	/// No account is linked to this wallet yet.
	SignupNeeded { signup_token: SecretString },
}

/// Trait for exchanging an identity signature for a session.
#[async_trait]
pub trait IdentityInterface: Send + Sync {
	async fn login(
		&self,
		address: &str,
		timestamp: u64,
		signature: &str,
	) -> Result<LoginOutcome, BackendError>;
}

/// Ledger entry for a completed tip, in the backend's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipRecord {
	pub streamer_id: String,
	/// Display name, or "Anonymous".
	pub sender: String,
	pub message: String,
	pub amount: String,
	pub tx_hash: String,
	pub asset: String,
	/// Source chain, used as the record's main chain id.
	pub chain_id: String,
	pub source_chain: String,
	pub dest_chain: String,
	pub source_address: String,
	pub dest_address: String,
}

impl From<&ExecutionResult> for TipRecord {
	fn from(result: &ExecutionResult) -> Self {
		let sender = result
			.display_name
			.as_deref()
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.unwrap_or("Anonymous")
			.to_string();
		Self {
			streamer_id: result.streamer_id.clone(),
			sender,
			message: result.message.clone(),
			amount: result.amount.clone(),
			tx_hash: result.transaction_id.to_string(),
			asset: result.asset_symbol.clone(),
			chain_id: result.source_chain_id.to_string(),
			source_chain: result.source_chain_id.to_string(),
			dest_chain: result.destination_chain_id.to_string(),
			source_address: result.source_address.clone(),
			dest_address: result.destination_address.clone(),
		}
	}
}

/// Trait for recording completed tips.
#[async_trait]
pub trait LedgerInterface: Send + Sync {
	/// Records a tip, authenticated with `session` when one is available.
	async fn record_tip(
		&self,
		record: &TipRecord,
		session: Option<&SecretString>,
	) -> Result<(), BackendError>;
}
