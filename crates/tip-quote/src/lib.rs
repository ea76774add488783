//! Quote module for the tip settlement system.
//!
//! Routing and pricing are delegated to a cross-chain aggregator. This module
//! turns a tip request into an aggregator route request and the response into
//! an executable [`Quote`]. It never signs anything.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tip_types::{Quote, TipRequest};

/// Re-export implementations
pub mod implementations {
	pub mod lifi;
}

pub use implementations::lifi::{LifiConfig, LifiQuoteClient};

/// Errors that can occur while fetching a quote.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
	/// Error that occurs during network communication with the aggregator.
	#[error("Network error: {0}")]
	Network(String),
	/// The aggregator answered with a non-success status.
	#[error("Aggregator returned {status}: {message}")]
	Rejected { status: u16, message: String },
	/// The response is missing fields required to execute the route.
	#[error("Invalid quote: {0}")]
	Invalid(String),
	/// The tip request cannot be turned into a quote request.
	#[error("Invalid quote request: {0}")]
	Request(String),
}

/// Trait defining the interface for route aggregators.
#[async_trait]
pub trait QuoteInterface: Send + Sync {
	/// Fetches a fresh route for `request` with the given maximum slippage
	/// (a fraction, e.g. 0.005).
	async fn get_quote(&self, request: &TipRequest, slippage: Decimal) -> Result<Quote, QuoteError>;
}
