//! String formatting utilities.
//!
//! Provides helpers for rendering identifiers and rupiah amounts in logs
//! and in the operator-facing output.

/// Truncates an identifier for log output.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

/// Formats a rupiah amount the way the Indonesian locale groups digits.
///
/// `16000` becomes `Rp 16.000`.
pub fn format_rupiah(amount: u64) -> String {
	let digits = amount.to_string();
	let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
	for (i, ch) in digits.chars().enumerate() {
		if i > 0 && (digits.len() - i) % 3 == 0 {
			grouped.push('.');
		}
		grouped.push(ch);
	}
	format!("Rp {}", grouped)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("short"), "short");
		assert_eq!(truncate_id("12345678"), "12345678");
		assert_eq!(
			truncate_id("6f1c2a9e-2b1d-4c55-8e0a-0d5d3b0c9f11"),
			"6f1c2a9e.."
		);
	}

	#[test]
	fn test_format_rupiah() {
		assert_eq!(format_rupiah(0), "Rp 0");
		assert_eq!(format_rupiah(950), "Rp 950");
		assert_eq!(format_rupiah(16000), "Rp 16.000");
		assert_eq!(format_rupiah(1250000), "Rp 1.250.000");
	}
}
