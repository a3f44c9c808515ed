//! Configuration module for the stall console.
//!
//! Configuration is read from a TOML file. Values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`; they are substituted before
//! parsing and the result is validated before it is handed to the rest of
//! the console.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message, not the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the console.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this console instance.
	pub console: ConsoleConfig,
	/// Marketplace backend connection settings.
	pub backend: BackendConfig,
	/// Session lifetime and persistence.
	pub session: SessionConfig,
	/// Order desk behaviour.
	#[serde(default)]
	pub orders: OrdersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsoleConfig {
	/// Label used in logs to tell console instances apart.
	pub id: String,
}

/// Marketplace backend connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
	/// Base URL every endpoint path is appended to.
	pub base_url: String,
	/// Upper bound for a whole request, response body included.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
	#[serde(default = "default_connect_timeout_seconds")]
	pub connect_timeout_seconds: u64,
}

impl BackendConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds)
	}

	pub fn connect_timeout(&self) -> Duration {
		Duration::from_secs(self.connect_timeout_seconds)
	}
}

fn default_timeout_seconds() -> u64 {
	15
}

fn default_connect_timeout_seconds() -> u64 {
	5
}

/// Session lifetime and persistence.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
	/// How long a stored session stays valid locally.
	/// Defaults to one hour, the lifetime of the backend token.
	#[serde(default = "default_session_ttl_seconds")]
	pub ttl_seconds: u64,
	/// Where the session is persisted.
	pub storage: StorageConfig,
}

impl SessionConfig {
	pub fn ttl(&self) -> Duration {
		Duration::from_secs(self.ttl_seconds)
	}
}

fn default_session_ttl_seconds() -> u64 {
	3600
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Order desk behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrdersConfig {
	/// Shortest rejection reason accepted, in characters.
	#[serde(default = "default_min_rejection_reason_len")]
	pub min_rejection_reason_len: usize,
	/// Orders fetched per refresh.
	#[serde(default = "default_page_size")]
	pub page_size: u32,
}

impl Default for OrdersConfig {
	fn default() -> Self {
		Self {
			min_rejection_reason_len: default_min_rejection_reason_len(),
			page_size: default_page_size(),
		}
	}
}

fn default_min_rejection_reason_len() -> usize {
	10
}

fn default_page_size() -> u32 {
	100
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	/// Minimal configuration pointing at `base_url` with in-memory session storage.
	#[cfg(any(test, feature = "testing"))]
	pub fn for_testing(base_url: &str) -> Self {
		let mut implementations = HashMap::new();
		implementations.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);
		Self {
			console: ConsoleConfig {
				id: "test-console".to_string(),
			},
			backend: BackendConfig {
				base_url: base_url.to_string(),
				timeout_seconds: 2,
				connect_timeout_seconds: 1,
			},
			session: SessionConfig {
				ttl_seconds: default_session_ttl_seconds(),
				storage: StorageConfig {
					primary: "memory".to_string(),
					implementations,
				},
			},
			orders: OrdersConfig::default(),
		}
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.console.id.trim().is_empty() {
			return Err(ConfigError::Validation("Console ID cannot be empty".into()));
		}

		let base_url = self.backend.base_url.trim();
		if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
			return Err(ConfigError::Validation(format!(
				"backend.base_url must start with http:// or https://, got '{}'",
				self.backend.base_url
			)));
		}
		for (name, value) in [
			("timeout_seconds", self.backend.timeout_seconds),
			("connect_timeout_seconds", self.backend.connect_timeout_seconds),
		] {
			if value == 0 || value > 300 {
				return Err(ConfigError::Validation(format!(
					"backend.{} must be between 1 and 300, got {}",
					name, value
				)));
			}
		}

		if self.session.ttl_seconds == 0 {
			return Err(ConfigError::Validation(
				"session.ttl_seconds must be greater than 0".into(),
			));
		}
		if self.session.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one session storage implementation must be configured".into(),
			));
		}
		if !self
			.session
			.storage
			.implementations
			.contains_key(&self.session.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.session.storage.primary
			)));
		}

		if self.orders.min_rejection_reason_len == 0 {
			return Err(ConfigError::Validation(
				"orders.min_rejection_reason_len must be at least 1".into(),
			));
		}
		if self.orders.page_size == 0 || self.orders.page_size > 100 {
			return Err(ConfigError::Validation(format!(
				"orders.page_size must be between 1 and 100, got {}",
				self.orders.page_size
			)));
		}

		Ok(())
	}
}

/// Parses, resolves environment variables and validates.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let mut config: Config = toml::from_str(&resolved)?;
		config.backend.base_url = config.backend.base_url.trim_end_matches('/').to_string();
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const MINIMAL: &str = r#"
[console]
id = "kantin-console"

[backend]
base_url = "https://api.kantin.example/"

[session.storage]
primary = "memory"
[session.storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("STALL_TEST_HOST", "localhost");
		std::env::set_var("STALL_TEST_PORT", "3000");

		let input = "url = \"http://${STALL_TEST_HOST}:${STALL_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "url = \"http://localhost:3000\"");

		std::env::remove_var("STALL_TEST_HOST");
		std::env::remove_var("STALL_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${STALL_MISSING_VAR:-fallback}\"";
		assert_eq!(resolve_env_vars(input).unwrap(), "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${STALL_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("STALL_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.console.id, "kantin-console");
		assert_eq!(config.backend.base_url, "https://api.kantin.example");
		assert_eq!(config.backend.timeout(), Duration::from_secs(15));
		assert_eq!(config.backend.connect_timeout(), Duration::from_secs(5));
		assert_eq!(config.session.ttl(), Duration::from_secs(3600));
		assert_eq!(config.orders.min_rejection_reason_len, 10);
		assert_eq!(config.orders.page_size, 100);
	}

	#[test]
	fn test_rejects_non_http_base_url() {
		let input = MINIMAL.replace("https://api.kantin.example/", "ftp://api");
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("base_url"));
	}

	#[test]
	fn test_rejects_unknown_primary_storage() {
		let input = MINIMAL.replace("primary = \"memory\"", "primary = \"file\"");
		let err = input.parse::<Config>().unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary storage 'file' not found in implementations"));
	}

	#[test]
	fn test_rejects_zero_timeout_and_page_size() {
		let input = MINIMAL.replace(
			"base_url = \"https://api.kantin.example/\"",
			"base_url = \"https://api.kantin.example\"\ntimeout_seconds = 0",
		);
		assert!(input.parse::<Config>().is_err());

		let input = format!("{}\n[orders]\npage_size = 500\n", MINIMAL);
		assert!(input.parse::<Config>().unwrap_err().to_string().contains("page_size"));
	}

	#[tokio::test]
	async fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			"{}\n[orders]\nmin_rejection_reason_len = 15\npage_size = 20\n",
			MINIMAL
		)
		.unwrap();

		let config = Config::from_file(file.path()).await.unwrap();
		assert_eq!(config.orders.min_rejection_reason_len, 15);
		assert_eq!(config.orders.page_size, 20);
	}

	#[tokio::test]
	async fn test_from_missing_file() {
		let err = Config::from_file("/nonexistent/stallctl.toml").await.unwrap_err();
		assert!(matches!(err, ConfigError::Io(_)));
	}

	#[test]
	fn test_for_testing_is_valid() {
		assert!(Config::for_testing("http://127.0.0.1:9").validate().is_ok());
	}
}
