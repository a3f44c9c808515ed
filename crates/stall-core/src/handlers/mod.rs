//! Operator-facing handlers.
//!
//! Each handler couples a backend with the board the operator sees: the
//! order desk drives order transitions, the menu handler the catalog and the
//! profile handler the stall profile and its reviews.

pub mod menu;
pub mod order;
pub mod profile;

pub use menu::MenuHandler;
pub use order::{OrderDesk, OrderFilter};
pub use profile::ProfileHandler;

use stall_client::BackendError;
use stall_types::ValidationError;
use thiserror::Error;

/// Errors from menu and profile operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Invalid input: {0}")]
	Validation(String),
	#[error("Unauthorized: {0}")]
	Unauthorized(String),
	#[error("Service unavailable: {0}")]
	Unavailable(String),
	#[error("Unexpected error: {0}")]
	Unknown(String),
}

impl From<BackendError> for HandlerError {
	fn from(err: BackendError) -> Self {
		match err {
			BackendError::NotFound(m) => Self::NotFound(m),
			BackendError::Validation(m) => Self::Validation(m),
			BackendError::Unauthorized(m) => Self::Unauthorized(m),
			BackendError::Unavailable(m) => Self::Unavailable(m),
			BackendError::Conflict(m) | BackendError::Unknown(m) => Self::Unknown(m),
		}
	}
}

impl From<ValidationError> for HandlerError {
	fn from(err: ValidationError) -> Self {
		Self::Validation(err.to_string())
	}
}
