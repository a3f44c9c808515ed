//! Authentication payloads.

use serde::{Deserialize, Serialize};

use crate::secret_string::serialize_exposed;
use crate::SecretString;

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
	/// Email address or username.
	pub identifier: String,
	#[serde(serialize_with = "serialize_exposed")]
	pub password: SecretString,
}

/// The signed-in stall owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
	pub id: String,
	pub username: String,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub role: Option<String>,
}

/// Payload of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginGrant {
	pub token: SecretString,
	pub user: SessionUser,
}
