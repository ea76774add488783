//! Wallet bridge connector for browser-only wallets.
//!
//! Bitcoin wallets such as Unisat or Xverse and Sui wallets only exist as
//! browser extensions. The bridge is a small companion service that relays
//! JSON calls to the extension and returns its answer, so the adapters here
//! can drive them the same way a page would.

use crate::WalletError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Trait for relaying calls to a browser wallet.
#[async_trait]
pub trait WalletBridge: Send + Sync {
	/// Invokes `method` on `wallet` with `params` and returns the result.
	async fn call(&self, wallet: &str, method: &str, params: Value) -> Result<Value, WalletError>;
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
	id: Uuid,
	wallet: &'a str,
	method: &'a str,
	params: Value,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<BridgeFailure>,
}

#[derive(Debug, Deserialize)]
struct BridgeFailure {
	#[serde(default)]
	code: Option<String>,
	message: String,
}

/// Methods that open a prompt in the wallet. They wait for the user with no
/// deadline; every other call is bounded by the bridge timeout.
const PROMPT_METHODS: &[&str] = &[
	"signMessage",
	"signPersonalMessage",
	"signPsbt",
	"signAndExecuteTransactionBlock",
];

/// Bridge reached over HTTP at `POST {url}/rpc`.
pub struct HttpWalletBridge {
	client: reqwest::Client,
	url: String,
	timeout: Duration,
}

impl HttpWalletBridge {
	pub fn new(url: &str, timeout: Duration) -> Result<Self, WalletError> {
		let client = reqwest::Client::builder()
			.connect_timeout(timeout)
			.build()
			.map_err(|e| WalletError::Network(format!("Failed to build bridge client: {}", e)))?;
		Ok(Self {
			client,
			url: url.trim_end_matches('/').to_string(),
			timeout,
		})
	}
}

#[async_trait]
impl WalletBridge for HttpWalletBridge {
	async fn call(&self, wallet: &str, method: &str, params: Value) -> Result<Value, WalletError> {
		let id = Uuid::new_v4();
		tracing::debug!(%id, wallet, method, "Bridge call");
		let mut builder = self.client.post(format!("{}/rpc", self.url)).json(&BridgeRequest {
			id,
			wallet,
			method,
			params,
		});
		if !PROMPT_METHODS.contains(&method) {
			builder = builder.timeout(self.timeout);
		}
		let response = builder
			.send()
			.await
			.map_err(|e| WalletError::Network(format!("Bridge unreachable: {}", e)))?;

		let body: BridgeResponse = response
			.json()
			.await
			.map_err(|e| WalletError::Network(format!("Invalid bridge response: {}", e)))?;

		if let Some(failure) = body.error {
			return Err(match failure.code.as_deref() {
				Some("not_connected") => WalletError::NotConnected,
				Some("unsupported") => WalletError::Unsupported(failure.message),
				_ => WalletError::from_message(failure.message),
			});
		}
		body.result
			.ok_or_else(|| WalletError::Network(format!("Bridge returned no result for {}", method)))
	}
}

/// Reads a string result or fails with a descriptive error.
pub(crate) fn expect_str(value: &Value, method: &str) -> Result<String, WalletError> {
	value
		.as_str()
		.map(str::to_string)
		.ok_or_else(|| WalletError::Network(format!("{} returned a non-string result", method)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{routing::post, Json, Router};
	use serde_json::json;

	async fn spawn_bridge() -> String {
		async fn rpc(Json(body): Json<Value>) -> Json<Value> {
			match body["method"].as_str() {
				Some("getAccounts") => Json(json!({ "result": ["bc1qexampleaddress000000000000000000"] })),
				Some("signPsbt") => Json(json!({ "error": { "message": "User rejected the request" } })),
				Some("pushPsbt") => {
					Json(json!({ "error": { "code": "unsupported", "message": "pushPsbt" } }))
				},
				_ => Json(json!({ "error": { "code": "not_connected", "message": "no wallet" } })),
			}
		}

		let app = Router::new().route("/rpc", post(rpc));
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}", addr)
	}

	async fn spawn_slow_bridge(delay: Duration) -> String {
		let app = Router::new().route(
			"/rpc",
			post(move |Json(body): Json<Value>| async move {
				tokio::time::sleep(delay).await;
				match body["method"].as_str() {
					Some("signPsbt") => Json(json!({ "result": "70736274ff" })),
					_ => Json(json!({ "result": ["bc1qexampleaddress000000000000000000"] })),
				}
			}),
		);
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}", addr)
	}

	#[tokio::test]
	async fn test_signing_prompt_waits_past_timeout() {
		let url = spawn_slow_bridge(Duration::from_millis(800)).await;
		let bridge = HttpWalletBridge::new(&url, Duration::from_millis(200)).unwrap();

		let signed = bridge
			.call("unisat", "signPsbt", json!({ "psbt": "70736274ff" }))
			.await
			.unwrap();
		assert_eq!(signed, "70736274ff");

		assert!(matches!(
			bridge.call("unisat", "getAccounts", json!([])).await,
			Err(WalletError::Network(_))
		));
	}

	#[tokio::test]
	async fn test_bridge_results_and_errors() {
		let url = spawn_bridge().await;
		let bridge = HttpWalletBridge::new(&url, Duration::from_secs(5)).unwrap();

		let accounts = bridge.call("unisat", "getAccounts", json!([])).await.unwrap();
		assert_eq!(accounts[0], "bc1qexampleaddress000000000000000000");

		assert!(matches!(
			bridge.call("unisat", "signPsbt", json!({})).await,
			Err(WalletError::Rejected(_))
		));
		assert!(matches!(
			bridge.call("xverse", "pushPsbt", json!({})).await,
			Err(WalletError::Unsupported(_))
		));
		assert_eq!(
			bridge.call("leather", "other", json!({})).await,
			Err(WalletError::NotConnected)
		);
	}
}
