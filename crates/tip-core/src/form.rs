//! Tip form: the caller-facing boundary around one settlement.
//!
//! The form owns the sender's draft (token, amount, message, display name),
//! prevents overlapping submissions, turns failures into the message shown to
//! the sender and, after a successful settlement, notifies the ledger in the
//! background. The ledger outcome never changes the settlement result.

use crate::engine::{SettleOptions, SettlementEngine};
use crate::{SettlementError, StatusCallback};
use std::sync::Arc;
use tip_backend::{LedgerInterface, TipRecord};
use tip_types::{Asset, ExecutionResult, SecretString, TipRequest};
use tokio::task::JoinHandle;

/// Streamer the form sends tips to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipTarget {
	pub streamer_id: String,
	pub recipient_address: String,
	pub destination_chain_id: u64,
}

/// A settled tip and its pending ledger notification.
#[derive(Debug)]
pub struct TipOutcome {
	pub result: ExecutionResult,
	/// `None` when no ledger is configured.
	pub ledger: Option<JoinHandle<()>>,
}

/// Records `result` on the ledger in a background task.
///
/// Failures are logged and otherwise ignored.
pub fn dispatch_ledger(
	ledger: Arc<dyn LedgerInterface>,
	result: &ExecutionResult,
	session: Option<SecretString>,
) -> JoinHandle<()> {
	let record = TipRecord::from(result);
	tokio::spawn(async move {
		if session.is_none() {
			tracing::debug!(tx_hash = %record.tx_hash, "Recording tip without a session");
		}
		if let Err(e) = ledger.record_tip(&record, session.as_ref()).await {
			tracing::warn!(tx_hash = %record.tx_hash, error = %e, "Failed to record tip");
		}
	})
}

/// Holds the busy flag for one submission and releases it on drop, including
/// when the submission future is cancelled.
struct BusyFlag<'a>(&'a mut bool);

impl<'a> BusyFlag<'a> {
	fn raise(flag: &'a mut bool) -> Self {
		*flag = true;
		Self(flag)
	}
}

impl Drop for BusyFlag<'_> {
	fn drop(&mut self) {
		*self.0 = false;
	}
}

pub struct TipForm {
	engine: Arc<SettlementEngine>,
	ledger: Option<Arc<dyn LedgerInterface>>,
	target: TipTarget,
	pub source_chain_id: Option<u64>,
	pub asset: Option<Asset>,
	pub amount: String,
	pub message: String,
	pub display_name: Option<String>,
	busy: bool,
	error: Option<String>,
}

impl TipForm {
	pub fn new(
		engine: Arc<SettlementEngine>,
		ledger: Option<Arc<dyn LedgerInterface>>,
		target: TipTarget,
	) -> Self {
		Self {
			engine,
			ledger,
			target,
			source_chain_id: None,
			asset: None,
			amount: String::new(),
			message: String::new(),
			display_name: None,
			busy: false,
			error: None,
		}
	}

	pub fn is_busy(&self) -> bool {
		self.busy
	}

	/// Message for the last failed submission.
	pub fn error(&self) -> Option<&str> {
		self.error.as_deref()
	}

	fn request(&self, sender_address: &str) -> Result<TipRequest, SettlementError> {
		let source_chain_id = self
			.source_chain_id
			.ok_or_else(|| SettlementError::InvalidRequest("Select a chain".into()))?;
		let asset = self
			.asset
			.clone()
			.ok_or_else(|| SettlementError::InvalidRequest("Select a token".into()))?;
		Ok(TipRequest {
			source_chain_id,
			sender_address: sender_address.to_string(),
			asset,
			amount: self.amount.trim().to_string(),
			recipient_address: self.target.recipient_address.clone(),
			destination_chain_id: self.target.destination_chain_id,
			streamer_id: self.target.streamer_id.clone(),
			message: self.message.clone(),
			display_name: self.display_name.clone(),
		})
	}

	/// Settles the current draft from `sender_address`.
	///
	/// On success the amount and message are cleared and the ledger is
	/// notified; on failure the draft is kept and [`error`](Self::error) holds
	/// the message for the sender.
	pub async fn submit(
		&mut self,
		sender_address: &str,
		options: &SettleOptions,
		on_status: &StatusCallback<'_>,
	) -> Result<TipOutcome, SettlementError> {
		if self.busy {
			return Err(SettlementError::Internal("A tip is already being sent".into()));
		}
		self.error = None;
		let request = self.request(sender_address);

		let settled = {
			let _busy = BusyFlag::raise(&mut self.busy);
			match request {
				Ok(request) => self.engine.settle(&request, options, on_status).await,
				Err(e) => Err(e),
			}
		};

		match settled {
			Ok(result) => {
				self.amount.clear();
				self.message.clear();
				let ledger = match &self.ledger {
					Some(ledger) => {
						let session = self.engine.session_token(sender_address).await;
						Some(dispatch_ledger(ledger.clone(), &result, session))
					},
					None => None,
				};
				Ok(TipOutcome { result, ledger })
			},
			Err(err) => {
				self.error = Some(err.user_message());
				Err(err)
			},
		}
	}
}
