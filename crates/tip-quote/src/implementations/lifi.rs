//! LI.FI quote client.
//!
//! Calls `GET {base_url}/quote` and maps the response into a [`Quote`].
//! Only the fields the engine needs are deserialized; everything else in the
//! aggregator's response is ignored.

use crate::{QuoteError, QuoteInterface};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tip_types::{Quote, SecretString, TipRequest, TransactionPayload, U256};

/// LI.FI client configuration.
#[derive(Debug, Clone)]
pub struct LifiConfig {
	pub base_url: String,
	pub integrator: String,
	/// Integrator fee as a fraction of the tip.
	pub fee: Decimal,
	pub api_key: Option<SecretString>,
	pub timeout: Duration,
	/// Asset recipients receive on the destination chain.
	pub destination_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiToken {
	address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiAction {
	from_chain_id: u64,
	to_chain_id: u64,
	from_token: LifiToken,
	to_token: LifiToken,
	#[serde(default)]
	to_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiEstimate {
	from_amount: String,
	#[serde(default)]
	approval_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiTransactionRequest {
	#[serde(default)]
	to: Option<String>,
	#[serde(default)]
	data: Option<String>,
	#[serde(default)]
	value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiQuoteResponse {
	#[serde(default)]
	tool: Option<String>,
	action: LifiAction,
	estimate: LifiEstimate,
	#[serde(default)]
	transaction_request: Option<LifiTransactionRequest>,
}

#[derive(Debug, Deserialize)]
struct LifiErrorResponse {
	message: String,
}

/// Parses a decimal or `0x`-prefixed hex amount.
fn parse_amount(value: &str, field: &str) -> Result<U256, QuoteError> {
	U256::from_str(value.trim())
		.map_err(|e| QuoteError::Invalid(format!("Invalid {} '{}': {}", field, value, e)))
}

/// Maps a raw aggregator response body into a [`Quote`].
pub fn parse_quote(body: &str) -> Result<Quote, QuoteError> {
	let response: LifiQuoteResponse = serde_json::from_str(body)
		.map_err(|e| QuoteError::Invalid(format!("Malformed quote response: {}", e)))?;

	let tx = response
		.transaction_request
		.ok_or_else(|| QuoteError::Invalid("Missing transactionRequest".into()))?;
	let data = tx
		.data
		.filter(|d| !d.is_empty())
		.ok_or_else(|| QuoteError::Invalid("Missing transactionRequest.data".into()))?;
	let value = match tx.value.as_deref() {
		Some(v) if !v.is_empty() => parse_amount(v, "transactionRequest.value")?,
		_ => U256::ZERO,
	};
	let destination_address = response
		.action
		.to_address
		.ok_or_else(|| QuoteError::Invalid("Missing action.toAddress".into()))?;

	// Older responses omit approvalAddress; the router itself is the spender.
	let approval_spender = response.estimate.approval_address.or_else(|| tx.to.clone());

	Ok(Quote {
		source_chain_id: response.action.from_chain_id,
		destination_chain_id: response.action.to_chain_id,
		source_token: response.action.from_token.address,
		destination_token: response.action.to_token.address,
		destination_address,
		source_amount: parse_amount(&response.estimate.from_amount, "estimate.fromAmount")?,
		payload: TransactionPayload {
			to: tx.to,
			data,
			value,
		},
		approval_spender,
		tool: response.tool,
	})
}

/// Quote client for the LI.FI API.
pub struct LifiQuoteClient {
	client: reqwest::Client,
	config: LifiConfig,
}

impl LifiQuoteClient {
	pub fn new(config: LifiConfig) -> Result<Self, QuoteError> {
		let client = reqwest::Client::builder()
			.timeout(config.timeout)
			.build()
			.map_err(|e| QuoteError::Network(format!("Failed to build HTTP client: {}", e)))?;
		Ok(Self { client, config })
	}

	/// Query parameters for a tip, in the order the API documents them.
	fn query(&self, request: &TipRequest, slippage: Decimal) -> Result<Vec<(&'static str, String)>, QuoteError> {
		let from_amount = request
			.base_units()
			.map_err(|e| QuoteError::Request(e.to_string()))?;
		Ok(vec![
			("fromChain", request.source_chain_id.to_string()),
			("toChain", request.destination_chain_id.to_string()),
			("fromToken", request.asset.address.clone()),
			("toToken", self.config.destination_token.clone()),
			("toAddress", request.recipient_address.clone()),
			("fromAmount", from_amount.to_string()),
			("fromAddress", request.sender_address.clone()),
			("integrator", self.config.integrator.clone()),
			("fee", self.config.fee.normalize().to_string()),
			("slippage", slippage.normalize().to_string()),
		])
	}
}

#[async_trait]
impl QuoteInterface for LifiQuoteClient {
	async fn get_quote(&self, request: &TipRequest, slippage: Decimal) -> Result<Quote, QuoteError> {
		let query = self.query(request, slippage)?;
		let url = format!("{}/quote", self.config.base_url.trim_end_matches('/'));

		let mut builder = self.client.get(&url).query(&query);
		if let Some(api_key) = self.config.api_key.as_ref().filter(|k| !k.is_empty()) {
			builder = builder.header("x-lifi-api-key", api_key.expose_secret());
		}

		tracing::debug!(
			from_chain = request.source_chain_id,
			to_chain = request.destination_chain_id,
			from_token = %request.asset.address,
			"Requesting quote"
		);

		let response = builder
			.send()
			.await
			.map_err(|e| QuoteError::Network(format!("Quote request failed: {}", e)))?;
		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| QuoteError::Network(format!("Failed to read quote response: {}", e)))?;

		if !status.is_success() {
			let message = serde_json::from_str::<LifiErrorResponse>(&body)
				.map(|e| e.message)
				.unwrap_or(body);
			return Err(QuoteError::Rejected {
				status: status.as_u16(),
				message,
			});
		}

		let quote = parse_quote(&body)?;
		tracing::info!(
			tool = quote.tool.as_deref().unwrap_or("unknown"),
			from_amount = %quote.source_amount,
			"Received quote"
		);
		Ok(quote)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{extract::Query, http::HeaderMap, http::StatusCode, routing::get, Json, Router};
	use serde_json::{json, Value};
	use std::collections::HashMap;
	use tip_types::{Asset, EVM_NATIVE_ADDRESS};

	const RECIPIENT: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
	const ROUTER: &str = "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE";

	fn quote_body(to_address: &str) -> Value {
		json!({
			"tool": "across",
			"action": {
				"fromChainId": 1,
				"toChainId": 8453,
				"fromToken": { "address": EVM_NATIVE_ADDRESS, "symbol": "ETH" },
				"toToken": { "address": EVM_NATIVE_ADDRESS, "symbol": "ETH" },
				"fromAmount": "10000000000000000",
				"toAddress": to_address
			},
			"estimate": { "fromAmount": "10000000000000000", "toAmount": "9800000000000000" },
			"transactionRequest": {
				"to": ROUTER,
				"data": "0xdeadbeef",
				"value": "0x2386f26fc10000",
				"chainId": 1
			}
		})
	}

	fn request() -> TipRequest {
		TipRequest {
			source_chain_id: 1,
			sender_address: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string(),
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

	fn config(base_url: String) -> LifiConfig {
		LifiConfig {
			base_url,
			integrator: "only-tokens-tips".to_string(),
			fee: Decimal::new(1, 2),
			api_key: Some(SecretString::from("test-key")),
			timeout: Duration::from_secs(5),
			destination_token: EVM_NATIVE_ADDRESS.to_string(),
		}
	}

	async fn spawn_aggregator() -> String {
		async fn quote(
			headers: HeaderMap,
			Query(params): Query<HashMap<String, String>>,
		) -> (StatusCode, Json<Value>) {
			if headers.get("x-lifi-api-key").map(|v| v.as_bytes()) != Some(b"test-key".as_slice()) {
				return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "missing key" })));
			}
			if params.get("fromAmount").map(String::as_str) != Some("10000000000000000")
				|| params.get("fee").map(String::as_str) != Some("0.01")
				|| params.get("slippage").map(String::as_str) != Some("0.005")
				|| params.get("integrator").map(String::as_str) != Some("only-tokens-tips")
			{
				return (StatusCode::BAD_REQUEST, Json(json!({ "message": "unexpected query" })));
			}
			match params.get("toAddress") {
				Some(to) if to == RECIPIENT => (StatusCode::OK, Json(quote_body(to))),
				_ => (StatusCode::NOT_FOUND, Json(json!({ "message": "No available quotes" }))),
			}
		}

		let app = Router::new().route("/v1/quote", get(quote));
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}/v1", addr)
	}

	#[test]
	fn test_parse_quote() {
		let quote = parse_quote(&quote_body(RECIPIENT).to_string()).unwrap();
		assert_eq!(quote.source_chain_id, 1);
		assert_eq!(quote.destination_chain_id, 8453);
		assert_eq!(quote.destination_address, RECIPIENT);
		assert_eq!(quote.source_amount, U256::from(10_000_000_000_000_000u64));
		assert_eq!(quote.payload.value, U256::from(10_000_000_000_000_000u64));
		assert_eq!(quote.payload.data, "0xdeadbeef");
		// Spender falls back to the router
		assert_eq!(quote.approval_spender.as_deref(), Some(ROUTER));
		assert!(quote.pays_to(RECIPIENT));
	}

	#[test]
	fn test_parse_prefers_approval_address() {
		let mut body = quote_body(RECIPIENT);
		body["estimate"]["approvalAddress"] = json!("0x0000000000000000000000000000000000000abc");
		let quote = parse_quote(&body.to_string()).unwrap();
		assert_eq!(
			quote.approval_spender.as_deref(),
			Some("0x0000000000000000000000000000000000000abc")
		);
	}

	#[test]
	fn test_parse_requires_data() {
		let mut body = quote_body(RECIPIENT);
		body["transactionRequest"]
			.as_object_mut()
			.unwrap()
			.remove("data");
		assert!(matches!(
			parse_quote(&body.to_string()),
			Err(QuoteError::Invalid(_))
		));

		let mut body = quote_body(RECIPIENT);
		body.as_object_mut().unwrap().remove("transactionRequest");
		assert!(matches!(
			parse_quote(&body.to_string()),
			Err(QuoteError::Invalid(_))
		));
	}

	#[tokio::test]
	async fn test_get_quote() {
		let url = spawn_aggregator().await;
		let client = LifiQuoteClient::new(config(url)).unwrap();

		let quote = client.get_quote(&request(), Decimal::new(5, 3)).await.unwrap();
		assert_eq!(quote.destination_address, RECIPIENT);
		assert_eq!(quote.tool.as_deref(), Some("across"));
	}

	#[tokio::test]
	async fn test_non_success_status() {
		let url = spawn_aggregator().await;
		let client = LifiQuoteClient::new(config(url)).unwrap();
		let mut request = request();
		request.recipient_address = "0x0000000000000000000000000000000000000001".to_string();

		let err = client.get_quote(&request, Decimal::new(5, 3)).await.unwrap_err();
		assert_eq!(
			err,
			QuoteError::Rejected {
				status: 404,
				message: "No available quotes".to_string()
			}
		);
	}

	#[tokio::test]
	async fn test_missing_api_key_rejected() {
		let url = spawn_aggregator().await;
		let mut config = config(url);
		config.api_key = None;
		let client = LifiQuoteClient::new(config).unwrap();

		assert!(matches!(
			client.get_quote(&request(), Decimal::new(5, 3)).await,
			Err(QuoteError::Rejected { status: 401, .. })
		));
	}
}
