//! API envelope types for the marketplace backend.
//!
//! Every backend endpoint wraps its payload in the same envelope. Listing
//! endpoints add pagination metadata, and error responses carry a message
//! that may be a single string or a list of validation messages.

use serde::{Deserialize, Serialize};

/// Standard response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
	#[serde(default)]
	pub status_code: Option<u16>,
	#[serde(default)]
	pub message: Option<String>,
	pub data: T,
	#[serde(default)]
	pub meta: Option<PaginationMeta>,
}

/// Pagination metadata returned by listing endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
	pub total: u64,
	pub page: u32,
	pub limit: u32,
	pub total_pages: u32,
}

impl PaginationMeta {
	/// Metadata for a listing that fits in a single page.
	pub fn single_page(total: usize, limit: u32) -> Self {
		Self {
			total: total as u64,
			page: 1,
			limit,
			total_pages: if total == 0 { 0 } else { 1 },
		}
	}

	pub fn has_next(&self) -> bool {
		self.page < self.total_pages
	}
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
	pub data: Vec<T>,
	pub meta: PaginationMeta,
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
	#[serde(default)]
	pub status_code: Option<u16>,
	/// Either a string or an array of strings.
	#[serde(default)]
	pub message: Option<serde_json::Value>,
	#[serde(default)]
	pub error: Option<String>,
}

impl ErrorBody {
	/// Human-readable message, joining validation message lists with "; ".
	pub fn message_text(&self) -> Option<String> {
		let text = match self.message.as_ref()? {
			serde_json::Value::String(s) => s.clone(),
			serde_json::Value::Array(items) => items
				.iter()
				.map(|item| match item {
					serde_json::Value::String(s) => s.clone(),
					other => other.to_string(),
				})
				.collect::<Vec<_>>()
				.join("; "),
			serde_json::Value::Null => return self.error.clone(),
			other => other.to_string(),
		};
		if text.trim().is_empty() {
			self.error.clone()
		} else {
			Some(text)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_body_message_string() {
		let body: ErrorBody =
			serde_json::from_str(r#"{"statusCode":404,"message":"Order not found"}"#).unwrap();
		assert_eq!(body.message_text().as_deref(), Some("Order not found"));
	}

	#[test]
	fn test_error_body_message_list() {
		let body: ErrorBody = serde_json::from_str(
			r#"{"statusCode":400,"message":["reason must be longer","reason should not be empty"],"error":"Bad Request"}"#,
		)
		.unwrap();
		assert_eq!(
			body.message_text().as_deref(),
			Some("reason must be longer; reason should not be empty")
		);
	}

	#[test]
	fn test_error_body_falls_back_to_error_field() {
		let body: ErrorBody =
			serde_json::from_str(r#"{"statusCode":500,"error":"Internal Server Error"}"#).unwrap();
		assert_eq!(body.message_text().as_deref(), Some("Internal Server Error"));
	}

	#[test]
	fn test_pagination_has_next() {
		let meta = PaginationMeta {
			total: 25,
			page: 1,
			limit: 10,
			total_pages: 3,
		};
		assert!(meta.has_next());
		assert!(!PaginationMeta::single_page(4, 10).has_next());
	}
}
