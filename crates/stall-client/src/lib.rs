//! Marketplace backend client for the stall console.
//!
//! The console talks to the marketplace through the interfaces defined here.
//! [`implementations::http`] is the real REST client; the in-memory mock in
//! [`implementations::mock`] enforces the same order transition rules and
//! backs the tests of the upper layers.

use async_trait::async_trait;
use stall_types::{
	MenuItem, MenuItemInput, MenuItemUpdate, Order, OrderQuery, Page, Review, ReviewQuery, Stall,
	StallUpdate, Transition, ValidationError,
};
use thiserror::Error;

pub mod implementations {
	pub mod http;
	#[cfg(any(test, feature = "testing"))]
	pub mod mock;
}

/// Errors returned by backend calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
	#[error("Not found: {0}")]
	NotFound(String),
	/// The backend refused a state change that conflicts with the current state.
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error("Validation failed: {0}")]
	Validation(String),
	/// Missing or rejected session. The session has already been torn down.
	#[error("Unauthorized: {0}")]
	Unauthorized(String),
	/// Transport failure, timeout, throttling or a server-side error.
	#[error("Service unavailable: {0}")]
	Unavailable(String),
	#[error("Unexpected response: {0}")]
	Unknown(String),
}

impl BackendError {
	/// Maps a non-success HTTP status to an error.
	pub fn from_status(status: u16, message: impl Into<String>) -> Self {
		let message = message.into();
		match status {
			401 => Self::Unauthorized(message),
			403 | 404 => Self::NotFound(message),
			409 => Self::Conflict(message),
			400 | 422 => Self::Validation(message),
			408 | 429 | 500..=599 => Self::Unavailable(message),
			_ => Self::Unknown(format!("HTTP {}: {}", status, message)),
		}
	}
}

impl From<ValidationError> for BackendError {
	fn from(err: ValidationError) -> Self {
		Self::Validation(err.to_string())
	}
}

/// Order endpoints under `/orders/my-stall/orders`.
#[async_trait]
pub trait OrderBackend: Send + Sync {
	async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>, BackendError>;

	async fn get_order(&self, order_id: &str) -> Result<Order, BackendError>;

	/// Requests a status change and returns the authoritative record.
	async fn transition(
		&self,
		order_id: &str,
		transition: &Transition,
	) -> Result<Order, BackendError>;
}

/// Menu endpoints under `/stalls/my-stall/menu-items`.
#[async_trait]
pub trait MenuBackend: Send + Sync {
	async fn list_menu_items(&self) -> Result<Vec<MenuItem>, BackendError>;

	async fn get_menu_item(&self, item_id: &str) -> Result<MenuItem, BackendError>;

	async fn create_menu_item(&self, input: &MenuItemInput) -> Result<MenuItem, BackendError>;

	async fn update_menu_item(
		&self,
		item_id: &str,
		update: &MenuItemUpdate,
	) -> Result<MenuItem, BackendError>;

	async fn delete_menu_item(&self, item_id: &str) -> Result<(), BackendError>;
}

/// Stall profile endpoints under `/stalls/my-stall`.
#[async_trait]
pub trait StallBackend: Send + Sync {
	async fn get_stall(&self) -> Result<Stall, BackendError>;

	async fn update_stall(&self, update: &StallUpdate) -> Result<Stall, BackendError>;

	async fn delete_stall(&self) -> Result<(), BackendError>;
}

#[async_trait]
pub trait ReviewBackend: Send + Sync {
	async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<Review>, BackendError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_mapping() {
		assert!(matches!(
			BackendError::from_status(401, "x"),
			BackendError::Unauthorized(_)
		));
		assert!(matches!(
			BackendError::from_status(403, "x"),
			BackendError::NotFound(_)
		));
		assert!(matches!(
			BackendError::from_status(404, "x"),
			BackendError::NotFound(_)
		));
		assert!(matches!(
			BackendError::from_status(409, "x"),
			BackendError::Conflict(_)
		));
		assert!(matches!(
			BackendError::from_status(422, "x"),
			BackendError::Validation(_)
		));
		for status in [408, 429, 500, 503] {
			assert!(matches!(
				BackendError::from_status(status, "x"),
				BackendError::Unavailable(_)
			));
		}
		assert_eq!(
			BackendError::from_status(418, "teapot"),
			BackendError::Unknown("HTTP 418: teapot".into())
		);
	}
}
