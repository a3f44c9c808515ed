//! Builder for assembling a console from configuration.
//!
//! Storage backends are created through factory functions selected by
//! `session.storage.primary`, the same way every pluggable component is
//! loaded. Marketplace backends are the HTTP client unless the caller hands
//! in its own set.

use crate::handlers::{MenuHandler, OrderDesk, ProfileHandler};
use stall_client::implementations::http::{HttpAuth, HttpBackend, HttpTransport};
use stall_client::{MenuBackend, OrderBackend, ReviewBackend, StallBackend};
use stall_config::Config;
use stall_session::{AuthBackend, SessionManager};
use stall_storage::{StorageError, StorageInterface, StorageService};
use stall_types::EventBus;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building a console.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Factory functions for each pluggable component, keyed by implementation name.
pub struct ConsoleFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

/// The marketplace endpoints a console talks to.
pub struct Backends {
	pub orders: Arc<dyn OrderBackend>,
	pub menu: Arc<dyn MenuBackend>,
	pub stall: Arc<dyn StallBackend>,
	pub reviews: Arc<dyn ReviewBackend>,
}

impl Backends {
	/// Uses one backend for every endpoint group.
	pub fn shared<B>(backend: Arc<B>) -> Self
	where
		B: OrderBackend + MenuBackend + StallBackend + ReviewBackend + 'static,
	{
		Self {
			orders: backend.clone(),
			menu: backend.clone(),
			stall: backend.clone(),
			reviews: backend,
		}
	}
}

/// A fully wired console.
pub struct Console {
	config: Config,
	session: Arc<SessionManager>,
	orders: OrderDesk,
	menu: MenuHandler,
	profile: ProfileHandler,
	events: EventBus,
}

impl Console {
	pub fn orders(&self) -> &OrderDesk {
		&self.orders
	}

	pub fn menu(&self) -> &MenuHandler {
		&self.menu
	}

	/// Stall profile and reviews.
	pub fn profile(&self) -> &ProfileHandler {
		&self.profile
	}

	pub fn session(&self) -> &Arc<SessionManager> {
		&self.session
	}

	pub fn events(&self) -> &EventBus {
		&self.events
	}

	pub fn config(&self) -> &Config {
		&self.config
	}
}

pub struct ConsoleBuilder {
	config: Config,
}

impl ConsoleBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds a console talking to the configured marketplace over HTTP.
	pub async fn build<SF>(self, factories: ConsoleFactories<SF>) -> Result<Console, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let storage = self.create_storage(&factories).await?;
		let events = EventBus::default();

		let transport = HttpTransport::new(&self.config.backend)
			.map_err(|e| BuilderError::Backend(e.to_string()))?;
		let session = Arc::new(SessionManager::new(
			storage,
			Arc::new(HttpAuth::new(transport.clone())),
			self.config.session.ttl(),
			events.clone(),
		));
		let backend = Arc::new(HttpBackend::new(transport, session.clone()));
		tracing::info!(
			component = "backend",
			base_url = %self.config.backend.base_url,
			timeout_seconds = self.config.backend.timeout_seconds,
			"Loaded"
		);

		self.assemble(session, Backends::shared(backend), events)
			.await
	}

	/// Builds a console on top of caller-supplied backends.
	pub async fn build_with_backends<SF>(
		self,
		factories: ConsoleFactories<SF>,
		auth: Arc<dyn AuthBackend>,
		backends: Backends,
	) -> Result<Console, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let storage = self.create_storage(&factories).await?;
		let events = EventBus::default();
		let session = Arc::new(SessionManager::new(
			storage,
			auth,
			self.config.session.ttl(),
			events.clone(),
		));
		self.assemble(session, backends, events).await
	}

	/// Creates the primary storage and drops entries that already expired.
	async fn create_storage<SF>(
		&self,
		factories: &ConsoleFactories<SF>,
	) -> Result<Arc<StorageService>, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let storage_config = &self.config.session.storage;
		let primary = &storage_config.primary;

		let config = storage_config.implementations.get(primary).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' has no configuration section",
				primary
			))
		})?;
		let factory = factories.storage_factories.get(primary).ok_or_else(|| {
			BuilderError::Config(format!("Unknown storage implementation '{}'", primary))
		})?;

		let storage = match factory(config) {
			Ok(implementation) => {
				tracing::info!(component = "storage", implementation = %primary, "Loaded");
				Arc::new(StorageService::new(implementation))
			},
			Err(e) => {
				tracing::error!(
					component = "storage",
					implementation = %primary,
					error = %e,
					"Failed to create storage implementation"
				);
				return Err(BuilderError::Storage(format!(
					"Failed to create storage implementation '{}': {}",
					primary, e
				)));
			},
		};

		match storage.cleanup_expired().await {
			Ok(0) => {},
			Ok(removed) => tracing::info!(component = "storage", removed, "Removed expired entries"),
			Err(e) => {
				tracing::warn!(component = "storage", error = %e, "Expired entry cleanup failed")
			},
		}
		Ok(storage)
	}

	async fn assemble(
		self,
		session: Arc<SessionManager>,
		backends: Backends,
		events: EventBus,
	) -> Result<Console, BuilderError> {
		match session.restore().await {
			Ok(Some(user)) => {
				tracing::info!(username = %user.username, "Restored stored session")
			},
			Ok(None) => tracing::debug!("No stored session"),
			Err(e) => return Err(BuilderError::Storage(e.to_string())),
		}

		let orders = OrderDesk::new(
			backends.orders,
			self.config.orders.min_rejection_reason_len,
			events.clone(),
		);
		let menu = MenuHandler::new(backends.menu, events.clone());
		let profile = ProfileHandler::new(backends.stall, backends.reviews);

		tracing::info!(console_id = %self.config.console.id, "Console ready");
		Ok(Console {
			config: self.config,
			session,
			orders,
			menu,
			profile,
			events,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stall_client::implementations::mock::{fixtures, MockBackend, MOCK_IDENTIFIER, MOCK_PASSWORD};
	use stall_types::{ConsoleEvent, OrderEvent, OrderStatus, SecretString};

	fn factories() -> ConsoleFactories<stall_storage::StorageFactory> {
		ConsoleFactories {
			storage_factories: stall_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	async fn mock_console(backend: Arc<MockBackend>) -> Console {
		ConsoleBuilder::new(Config::for_testing("http://127.0.0.1:9"))
			.build_with_backends(factories(), backend.clone(), Backends::shared(backend))
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn test_build_over_http_starts_logged_out() {
		let console = ConsoleBuilder::new(Config::for_testing("http://127.0.0.1:9"))
			.build(factories())
			.await
			.unwrap();
		assert!(!console.session().is_logged_in().await);
		assert_eq!(console.config().console.id, "test-console");
	}

	fn file_storage_config(dir: &tempfile::TempDir) -> Config {
		let mut config = Config::for_testing("http://127.0.0.1:9");
		let mut section = toml::map::Map::new();
		section.insert(
			"storage_path".into(),
			toml::Value::String(dir.path().display().to_string()),
		);
		config.session.storage.primary = "file".into();
		config
			.session
			.storage
			.implementations
			.insert("file".into(), toml::Value::Table(section));
		config
	}

	#[tokio::test]
	async fn test_corrupted_session_file_starts_logged_out() {
		let dir = tempfile::tempdir().unwrap();
		let entry = dir.path().join("session_current.bin");
		std::fs::write(&entry, b"garbage").unwrap();

		let console = ConsoleBuilder::new(file_storage_config(&dir))
			.build(factories())
			.await
			.unwrap();
		assert!(!console.session().is_logged_in().await);
		assert!(!entry.exists());
	}

	#[tokio::test]
	async fn test_build_sweeps_expired_entries() {
		let dir = tempfile::tempdir().unwrap();
		// Header with an expiry of one second past the epoch
		let mut stale = b"STLS".to_vec();
		stale.extend_from_slice(&1u16.to_le_bytes());
		stale.extend_from_slice(&1u64.to_le_bytes());
		stale.extend_from_slice(&[0, 0]);
		stale.extend_from_slice(b"{}");
		let stale_entry = dir.path().join("session_previous.bin");
		std::fs::write(&stale_entry, stale).unwrap();

		ConsoleBuilder::new(file_storage_config(&dir))
			.build(factories())
			.await
			.unwrap();
		assert!(!stale_entry.exists());
	}

	#[tokio::test]
	async fn test_unknown_primary_storage() {
		let mut config = Config::for_testing("http://127.0.0.1:9");
		config.session.storage.primary = "redis".into();
		config
			.session
			.storage
			.implementations
			.insert("redis".into(), toml::Value::Table(Default::default()));

		let result = ConsoleBuilder::new(config).build(factories()).await;
		assert!(matches!(result, Err(BuilderError::Config(_))));
	}

	#[tokio::test]
	async fn test_console_end_to_end_with_mock() {
		let backend = Arc::new(MockBackend::with_orders(vec![fixtures::order(
			"O1",
			OrderStatus::WaitingConfirmation,
		)]));
		let console = mock_console(backend.clone()).await;
		let mut events = console.events().subscribe();

		console
			.session()
			.login(MOCK_IDENTIFIER, SecretString::from(MOCK_PASSWORD))
			.await
			.unwrap();
		console
			.orders()
			.refresh(crate::OrderFilter::All, 1, 100)
			.await
			.unwrap();
		let order = console.orders().confirm_payment("O1").await.unwrap();
		assert_eq!(order.status, OrderStatus::Processing);

		let mut saw_transition = false;
		while let Ok(event) = events.try_recv() {
			if let ConsoleEvent::Order(OrderEvent::Transitioned { order_id, .. }) = event {
				saw_transition = order_id == "O1";
			}
		}
		assert!(saw_transition);
	}
}
