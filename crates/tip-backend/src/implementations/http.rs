//! HTTP clients for the tip backend.

use crate::{BackendError, IdentityInterface, LedgerInterface, LoginOutcome, TipRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tip_types::SecretString;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
	address: &'a str,
	timestamp: u64,
	signature: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
	#[serde(default)]
	status: Option<String>,
	#[serde(default)]
	token: Option<String>,
	#[serde(default)]
	signup_token: Option<String>,
	#[serde(default)]
	expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
	error: String,
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
	reqwest::Client::builder()
		.timeout(timeout)
		.build()
		.map_err(|e| BackendError::Network(format!("Failed to build HTTP client: {}", e)))
}

/// Turns a non-success response into [`BackendError::Rejected`].
async fn rejection(response: reqwest::Response) -> BackendError {
	let status = response.status().as_u16();
	let body = response.text().await.unwrap_or_default();
	let message = serde_json::from_str::<ErrorResponse>(&body)
		.map(|e| e.error)
		.unwrap_or(body);
	BackendError::Rejected { status, message }
}

/// Wallet login over `POST {base_url}/api/auth/wallet/login`.
pub struct HttpIdentityProver {
	client: reqwest::Client,
	base_url: String,
}

impl HttpIdentityProver {
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
		Ok(Self {
			client: build_client(timeout)?,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}
}

#[async_trait]
impl IdentityInterface for HttpIdentityProver {
	async fn login(
		&self,
		address: &str,
		timestamp: u64,
		signature: &str,
	) -> Result<LoginOutcome, BackendError> {
		let response = self
			.client
			.post(format!("{}/api/auth/wallet/login", self.base_url))
			.json(&LoginRequest {
				address,
				timestamp,
				signature,
			})
			.send()
			.await
			.map_err(|e| BackendError::Network(format!("Login request failed: {}", e)))?;

		if !response.status().is_success() {
			return Err(rejection(response).await);
		}

		let body: LoginResponse = response
			.json()
			.await
			.map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

		if body.status.as_deref() == Some("signup_needed") {
			let signup_token = body.signup_token.ok_or_else(|| {
				BackendError::InvalidResponse("signup_needed without signup_token".into())
			})?;
			return Ok(LoginOutcome::SignupNeeded {
				signup_token: SecretString::new(signup_token),
			});
		}

		let token = body
			.token
			.ok_or_else(|| BackendError::InvalidResponse("Missing token".into()))?;
		Ok(LoginOutcome::Session {
			token: SecretString::new(token),
			expires_in: body.expires_in,
		})
	}
}

/// Tip ledger over `POST {base_url}/api/tips`.
pub struct HttpLedger {
	client: reqwest::Client,
	base_url: String,
}

impl HttpLedger {
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
		Ok(Self {
			client: build_client(timeout)?,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}
}

#[async_trait]
impl LedgerInterface for HttpLedger {
	async fn record_tip(
		&self,
		record: &TipRecord,
		session: Option<&SecretString>,
	) -> Result<(), BackendError> {
		let mut request = self
			.client
			.post(format!("{}/api/tips", self.base_url))
			.json(record);
		if let Some(token) = session {
			request = request.bearer_auth(token.expose_secret());
		}

		let response = request
			.send()
			.await
			.map_err(|e| BackendError::Network(format!("Ledger request failed: {}", e)))?;

		if !response.status().is_success() {
			return Err(rejection(response).await);
		}
		tracing::info!(tx_hash = %record.tx_hash, streamer = %record.streamer_id, "Recorded tip");
		Ok(())
	}
}
