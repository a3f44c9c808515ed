//! Storage module for the stall console.
//!
//! Provides a small key/value abstraction used to persist console state
//! (currently the signed-in session) with optional expiry, and a typed
//! service on top of it that handles JSON serialization.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use stall_types::{ConfigSchema, ImplementationRegistry};
use std::time::Duration;
use thiserror::Error;

pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found")]
	NotFound,
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// A stored entry exists but cannot be read back.
	#[error("Corrupted entry: {0}")]
	Corrupted(String),
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface for storage backends.
///
/// Keys are `namespace:id` strings. An expired entry behaves exactly like a
/// missing one.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes. `None` lets the backend pick its configured TTL.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError>;

	/// Deleting a missing key is not an error.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Removes expired entries, returning how many were dropped.
	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		Ok(0)
	}
}

/// Signature every storage implementation's factory has.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// All built-in storage implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Typed storage on top of a [`StorageInterface`].
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a value as JSON under `namespace:id`.
	pub async fn store_with_ttl<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&Self::key(namespace, id), bytes, ttl)
			.await
	}

	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.store_with_ttl(namespace, id, data, None).await
	}

	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.backend.cleanup_expired().await
	}

	/// Validates an implementation's configuration section.
	pub fn validate_config(&self, config: &toml::Value) -> Result<(), StorageError> {
		self.backend
			.config_schema()
			.validate(config)
			.map_err(|e| StorageError::Configuration(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Record {
		name: String,
		visits: u32,
	}

	#[tokio::test]
	async fn test_typed_round_trip_and_remove() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let record = Record {
			name: "kasir".into(),
			visits: 3,
		};

		service.store("session", "current", &record).await.unwrap();
		assert!(service.exists("session", "current").await.unwrap());
		let loaded: Record = service.retrieve("session", "current").await.unwrap();
		assert_eq!(loaded, record);

		service.remove("session", "current").await.unwrap();
		assert!(matches!(
			service.retrieve::<Record>("session", "current").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_retrieve_wrong_shape_is_serialization_error() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		service.store("session", "current", &"plain").await.unwrap();
		assert!(matches!(
			service.retrieve::<Record>("session", "current").await,
			Err(StorageError::Serialization(_))
		));
	}

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["file", "memory"]);
	}
}
