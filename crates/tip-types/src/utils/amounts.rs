//! Conversion between human amounts and smallest on-chain units.
//!
//! Senders type amounts such as "0.01"; aggregators and chains expect
//! integers in the asset's smallest unit (wei, lamports, satoshis, MIST).
//! Conversion is exact: amounts with more fractional digits than the asset
//! supports are rejected instead of rounded.

use alloy_primitives::utils::{format_units, parse_units};
use alloy_primitives::U256;
use thiserror::Error;

/// Errors that can occur while converting amounts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
	/// The amount is not a plain non-negative decimal number.
	#[error("Invalid amount '{0}'")]
	Invalid(String),
	/// The amount is zero.
	#[error("Amount must be greater than zero")]
	NotPositive,
	/// The amount has more fractional digits than the asset's decimals.
	#[error("Amount '{amount}' has more than {decimals} decimal places")]
	TooPrecise { amount: String, decimals: u8 },
	/// The value does not fit the requested unit.
	#[error("Unit conversion failed: {0}")]
	Units(String),
}

/// Converts a decimal string in human units into smallest units.
///
/// `to_base_units("1", 8)` is one bitcoin in satoshis, `100000000`.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
	let amount = amount.trim();
	let well_formed = !amount.is_empty()
		&& amount.chars().all(|c| c.is_ascii_digit() || c == '.')
		&& amount.matches('.').count() <= 1
		&& amount != ".";
	if !well_formed {
		return Err(AmountError::Invalid(amount.to_string()));
	}

	if let Some((_, fraction)) = amount.split_once('.') {
		if fraction.len() > decimals as usize {
			return Err(AmountError::TooPrecise {
				amount: amount.to_string(),
				decimals,
			});
		}
	}

	let value = parse_units(amount, decimals)
		.map_err(|e| AmountError::Units(e.to_string()))?
		.get_absolute();

	if value.is_zero() {
		return Err(AmountError::NotPositive);
	}
	Ok(value)
}

/// Converts smallest units back into a trimmed decimal string.
///
/// `from_base_units(10000000000000000, 18)` returns `"0.01"`.
pub fn from_base_units(value: U256, decimals: u8) -> Result<String, AmountError> {
	let formatted = format_units(value, decimals).map_err(|e| AmountError::Units(e.to_string()))?;
	if !formatted.contains('.') {
		return Ok(formatted);
	}
	let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
	Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_boundary_conversions() {
		assert_eq!(to_base_units("1", 8).unwrap(), U256::from(100_000_000u64));
		assert_eq!(to_base_units("1", 9).unwrap(), U256::from(1_000_000_000u64));
		assert_eq!(
			to_base_units("0.1", 18).unwrap(),
			U256::from(100_000_000_000_000_000u64)
		);
		assert_eq!(
			to_base_units("0.01", 18).unwrap(),
			U256::from(10_000_000_000_000_000u64)
		);
		assert_eq!(to_base_units("2.5", 6).unwrap(), U256::from(2_500_000u64));
	}

	#[test]
	fn test_rejects_bad_amounts() {
		assert_eq!(to_base_units("0", 18).unwrap_err(), AmountError::NotPositive);
		assert_eq!(to_base_units("0.000", 18).unwrap_err(), AmountError::NotPositive);
		assert!(matches!(
			to_base_units("-1", 18).unwrap_err(),
			AmountError::Invalid(_)
		));
		assert!(matches!(
			to_base_units("1e5", 18).unwrap_err(),
			AmountError::Invalid(_)
		));
		assert!(matches!(
			to_base_units("1.2.3", 18).unwrap_err(),
			AmountError::Invalid(_)
		));
		assert!(matches!(to_base_units("", 18).unwrap_err(), AmountError::Invalid(_)));
		assert_eq!(
			to_base_units("0.000000001", 8).unwrap_err(),
			AmountError::TooPrecise {
				amount: "0.000000001".to_string(),
				decimals: 8
			}
		);
	}

	#[test]
	fn test_from_base_units_trims() {
		assert_eq!(
			from_base_units(U256::from(10_000_000_000_000_000u64), 18).unwrap(),
			"0.01"
		);
		assert_eq!(from_base_units(U256::from(100_000_000u64), 8).unwrap(), "1");
	}
}
