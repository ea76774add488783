//! Settlement state machine.
//!
//! Idle -> ProvingIdentity -> Quoting -> (ApprovingIfNeeded) -> Signing ->
//! Broadcasting -> Confirming -> Succeeded. Any non-terminal state may move
//! to Failed. Quoting is skipped by families that do not use the aggregator.

use crate::{SettlementError, StatusCallback};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;

/// Stage of one settlement attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementState {
	Idle,
	ProvingIdentity,
	Quoting,
	ApprovingIfNeeded,
	Signing,
	Broadcasting,
	Confirming,
	Succeeded,
	Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum StateKind {
	Idle,
	ProvingIdentity,
	Quoting,
	ApprovingIfNeeded,
	Signing,
	Broadcasting,
	Confirming,
	Succeeded,
	Failed,
}

impl SettlementState {
	fn kind(&self) -> StateKind {
		match self {
			SettlementState::Idle => StateKind::Idle,
			SettlementState::ProvingIdentity => StateKind::ProvingIdentity,
			SettlementState::Quoting => StateKind::Quoting,
			SettlementState::ApprovingIfNeeded => StateKind::ApprovingIfNeeded,
			SettlementState::Signing => StateKind::Signing,
			SettlementState::Broadcasting => StateKind::Broadcasting,
			SettlementState::Confirming => StateKind::Confirming,
			SettlementState::Succeeded => StateKind::Succeeded,
			SettlementState::Failed(_) => StateKind::Failed,
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, SettlementState::Succeeded | SettlementState::Failed(_))
	}

	/// Checks if a state transition is valid
	pub fn can_transition_to(&self, next: &SettlementState) -> bool {
		// Static transition table - each state maps to allowed next states
		static TRANSITIONS: Lazy<HashMap<StateKind, HashSet<StateKind>>> = Lazy::new(|| {
			use StateKind::*;
			let mut m = HashMap::new();
			m.insert(Idle, HashSet::from([ProvingIdentity, Failed]));
			m.insert(ProvingIdentity, HashSet::from([Quoting, Signing, Failed]));
			m.insert(Quoting, HashSet::from([ApprovingIfNeeded, Signing, Failed]));
			m.insert(ApprovingIfNeeded, HashSet::from([Signing, Failed]));
			m.insert(Signing, HashSet::from([Broadcasting, Failed]));
			m.insert(Broadcasting, HashSet::from([Confirming, Failed]));
			m.insert(Confirming, HashSet::from([Succeeded, Failed]));
			m.insert(Succeeded, HashSet::new()); // terminal
			m.insert(Failed, HashSet::new()); // terminal
			m
		});

		TRANSITIONS
			.get(&self.kind())
			.is_some_and(|set| set.contains(&next.kind()))
	}
}

impl fmt::Display for SettlementState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SettlementState::Failed(reason) => write!(f, "Failed({})", reason),
			other => write!(f, "{:?}", other),
		}
	}
}

/// Tracks one attempt's state and forwards status text to the caller.
pub struct Progress<'a> {
	state: Mutex<SettlementState>,
	history: Mutex<Vec<SettlementState>>,
	on_status: &'a StatusCallback<'a>,
}

impl<'a> Progress<'a> {
	pub fn new(on_status: &'a StatusCallback<'a>) -> Self {
		Self {
			state: Mutex::new(SettlementState::Idle),
			history: Mutex::new(vec![SettlementState::Idle]),
			on_status,
		}
	}

	pub fn current(&self) -> SettlementState {
		self.state
			.lock()
			.map(|s| s.clone())
			.unwrap_or_else(|poisoned| poisoned.into_inner().clone())
	}

	/// Every state entered so far, starting with Idle.
	pub fn history(&self) -> Vec<SettlementState> {
		self.history
			.lock()
			.map(|h| h.clone())
			.unwrap_or_else(|poisoned| poisoned.into_inner().clone())
	}

	/// Moves to `next`, reporting `message` if given.
	pub fn advance(&self, next: SettlementState, message: Option<&str>) -> Result<(), SettlementError> {
		{
			let mut state = self
				.state
				.lock()
				.map_err(|_| SettlementError::Internal("Settlement state lock poisoned".into()))?;
			if !state.can_transition_to(&next) {
				return Err(SettlementError::Internal(format!(
					"Invalid state transition from {} to {}",
					*state, next
				)));
			}
			tracing::debug!(from = %*state, to = %next, "Settlement transition");
			*state = next.clone();
		}
		if let Ok(mut history) = self.history.lock() {
			history.push(next);
		}
		if let Some(message) = message {
			self.status(message);
		}
		Ok(())
	}

	/// Reports a status line without changing state.
	pub fn status(&self, message: &str) {
		(self.on_status)(message);
	}

	/// Moves to Failed unless already terminal.
	pub fn fail(&self, reason: &SettlementError) {
		if self.current().is_terminal() {
			return;
		}
		// Failed is reachable from every non-terminal state
		let _ = self.advance(SettlementState::Failed(reason.to_string()), None);
	}
}
