//! EVM gas price policy.

use tip_types::GasTier;

/// Gas price override for a tier, given the network's current price in wei.
///
/// `Auto` leaves pricing to the provider.
pub fn resolve_gas_price(tier: GasTier, base: u128) -> Option<u128> {
	match tier {
		GasTier::Auto => None,
		GasTier::Fast => Some(base.saturating_mul(12) / 10),
		GasTier::Instant => Some(base.saturating_mul(15) / 10),
	}
}
