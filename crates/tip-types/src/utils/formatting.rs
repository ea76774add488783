//! String formatting helpers for hex values and log output.

/// Shortens a transaction id or address for log lines.
///
/// Ids of 14 characters or fewer are returned unchanged, longer ones keep the
/// first 8 and last 4 characters.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 14 || !id.is_ascii() {
		id.to_string()
	} else {
		format!("{}..{}", &id[..8], &id[id.len() - 4..])
	}
}

/// Adds a "0x" prefix unless one is already present.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") || hex_str.starts_with("0X") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Strips a leading "0x" or "0X" if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("0xabc"), "0xabc");
		assert_eq!(
			truncate_id("0x1234567890abcdef1234567890abcdef"),
			"0x123456..cdef"
		);
	}

	#[test]
	fn test_prefix_helpers() {
		assert_eq!(with_0x_prefix("deadbeef"), "0xdeadbeef");
		assert_eq!(with_0x_prefix("0Xdeadbeef"), "0Xdeadbeef");
		assert_eq!(without_0x_prefix("0xdeadbeef"), "deadbeef");
		assert_eq!(without_0x_prefix("deadbeef"), "deadbeef");
	}
}
