//! Backend session tokens keyed by wallet address.

use std::collections::HashMap;
use std::time::Duration;
use tip_types::SecretString;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Session {
	token: SecretString,
	expires_at: Instant,
}

/// Session tokens obtained from wallet login, one per address.
///
/// A token is returned only until its lifetime runs out; the backend's
/// `expires_in` wins over the configured default.
pub struct SessionContext {
	ttl: Duration,
	sessions: RwLock<HashMap<String, Session>>,
}

/// EVM addresses are case-insensitive; other families are not.
fn session_key(address: &str) -> String {
	if address.starts_with("0x") {
		address.to_ascii_lowercase()
	} else {
		address.to_string()
	}
}

impl SessionContext {
	pub fn new(ttl: Duration) -> Self {
		Self {
			ttl,
			sessions: RwLock::new(HashMap::new()),
		}
	}

	/// Live token for `address`, if any.
	pub async fn get(&self, address: &str) -> Option<SecretString> {
		let sessions = self.sessions.read().await;
		sessions
			.get(&session_key(address))
			.filter(|s| s.expires_at > Instant::now())
			.map(|s| s.token.clone())
	}

	/// Stores `token` for `address`.
	///
	/// A lifetime too large to represent falls back to the configured TTL.
	pub async fn store(&self, address: &str, token: SecretString, expires_in: Option<Duration>) {
		let now = Instant::now();
		let expires_at = match expires_in.and_then(|d| now.checked_add(d)) {
			Some(at) => at,
			None => match now.checked_add(self.ttl) {
				Some(at) => at,
				None => {
					tracing::warn!(ttl_secs = self.ttl.as_secs(), "Session TTL out of range, not storing");
					return;
				},
			},
		};
		self.sessions
			.write()
			.await
			.insert(session_key(address), Session { token, expires_at });
	}
}
