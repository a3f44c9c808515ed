//! Session module for the stall console.
//!
//! The signed-in session (bearer token plus user) is an explicit object owned
//! by [`SessionManager`]. Backends ask it for the bearer token and call
//! [`SessionManager::expire`] with that token when the marketplace rejects
//! it, which purges the stored credentials and tells subscribers to send the
//! operator back to the login prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stall_storage::{StorageError, StorageService};
use stall_types::{
	secret_string::serialize_exposed, ConsoleEvent, EventBus, LoginGrant, LoginRequest,
	SecretString, SessionEvent, SessionUser, StorageKey,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors reported by the authentication endpoints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
	/// Wrong credentials or a token the backend no longer accepts.
	#[error("Authentication rejected: {0}")]
	Rejected(String),
	#[error("Service unavailable: {0}")]
	Unavailable(String),
	#[error("Unexpected response: {0}")]
	Unknown(String),
}

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("Not logged in")]
	NotLoggedIn,
	#[error("Invalid input: {0}")]
	Validation(String),
	#[error(transparent)]
	Auth(#[from] AuthError),
	#[error("Session storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Authentication endpoints of the marketplace backend.
#[async_trait]
pub trait AuthBackend: Send + Sync {
	/// `POST /auth/login`.
	async fn login(&self, request: &LoginRequest) -> Result<LoginGrant, AuthError>;

	/// `POST /auth/logout`.
	async fn logout(&self, token: &SecretString) -> Result<(), AuthError>;

	/// `GET /auth/check`. `Ok(false)` when the token is no longer valid.
	async fn check(&self, token: &SecretString) -> Result<bool, AuthError>;
}

/// Why a session is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
	LoggedOut,
	/// The backend answered 401.
	Unauthorized,
}

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	#[serde(serialize_with = "serialize_exposed")]
	pub token: SecretString,
	pub user: SessionUser,
}

impl From<LoginGrant> for Session {
	fn from(grant: LoginGrant) -> Self {
		Self {
			token: grant.token,
			user: grant.user,
		}
	}
}

const CURRENT: &str = "current";

/// Owns the current session and its persisted copy.
pub struct SessionManager {
	storage: Arc<StorageService>,
	auth: Arc<dyn AuthBackend>,
	ttl: Duration,
	current: RwLock<Option<Session>>,
	events: EventBus,
}

impl SessionManager {
	pub fn new(
		storage: Arc<StorageService>,
		auth: Arc<dyn AuthBackend>,
		ttl: Duration,
		events: EventBus,
	) -> Self {
		Self {
			storage,
			auth,
			ttl,
			current: RwLock::new(None),
			events,
		}
	}

	/// Loads a previously stored, unexpired session.
	pub async fn restore(&self) -> Result<Option<SessionUser>, SessionError> {
		let stored: Session = match self
			.storage
			.retrieve(StorageKey::Session.as_str(), CURRENT)
			.await
		{
			Ok(session) => session,
			Err(StorageError::NotFound) => return Ok(None),
			Err(StorageError::Serialization(e) | StorageError::Corrupted(e)) => {
				tracing::warn!(error = %e, "Discarding unreadable stored session");
				self.storage
					.remove(StorageKey::Session.as_str(), CURRENT)
					.await?;
				return Ok(None);
			},
			Err(e) => return Err(e.into()),
		};

		let user = stored.user.clone();
		*self.current.write().await = Some(stored);
		tracing::debug!(username = %user.username, "Restored session");
		Ok(Some(user))
	}

	pub async fn login(
		&self,
		identifier: &str,
		password: SecretString,
	) -> Result<SessionUser, SessionError> {
		let identifier = identifier.trim();
		if identifier.is_empty() {
			return Err(SessionError::Validation(
				"email or username is required".into(),
			));
		}
		if password.is_empty() {
			return Err(SessionError::Validation("password is required".into()));
		}

		let request = LoginRequest {
			identifier: identifier.to_string(),
			password,
		};
		let session = Session::from(self.auth.login(&request).await?);
		if session.token.is_empty() {
			return Err(AuthError::Unknown("login response carried no token".into()).into());
		}

		self.storage
			.store_with_ttl(
				StorageKey::Session.as_str(),
				CURRENT,
				&session,
				Some(self.ttl),
			)
			.await?;

		let user = session.user.clone();
		*self.current.write().await = Some(session);
		tracing::info!(username = %user.username, "Logged in");
		self.events
			.publish(ConsoleEvent::Session(SessionEvent::LoggedIn {
				username: user.username.clone(),
			}))
			.ok();
		Ok(user)
	}

	/// Signs out. The local session is destroyed even if the backend call fails.
	pub async fn logout(&self) -> Result<(), SessionError> {
		let token = self.current.read().await.as_ref().map(|s| s.token.clone());
		if let Some(token) = token {
			if let Err(e) = self.auth.logout(&token).await {
				tracing::warn!(error = %e, "Backend logout failed, clearing local session anyway");
			}
		}
		self.teardown(TeardownReason::LoggedOut).await;
		Ok(())
	}

	/// Asks the backend whether the token is still valid.
	///
	/// A rejected token tears the session down.
	pub async fn check(&self) -> Result<bool, SessionError> {
		let Ok(token) = self.bearer().await else {
			return Ok(false);
		};
		match self.auth.check(&token).await {
			Ok(true) => Ok(true),
			Ok(false) | Err(AuthError::Rejected(_)) => {
				self.expire(&token).await;
				Ok(false)
			},
			Err(e) => Err(e.into()),
		}
	}

	pub async fn bearer(&self) -> Result<SecretString, SessionError> {
		self.current
			.read()
			.await
			.as_ref()
			.map(|s| s.token.clone())
			.ok_or(SessionError::NotLoggedIn)
	}

	pub async fn user(&self) -> Option<SessionUser> {
		self.current.read().await.as_ref().map(|s| s.user.clone())
	}

	pub async fn is_logged_in(&self) -> bool {
		self.current.read().await.is_some()
	}

	/// Destroys the session and purges stored credentials.
	///
	/// Only the call that actually removed a session publishes an event, so
	/// a burst of 401 responses yields a single `Expired`.
	pub async fn teardown(&self, reason: TeardownReason) {
		let previous = self.current.write().await.take();
		self.purge(previous, reason).await;
	}

	/// Tears the session down because the backend rejected `token`.
	///
	/// Does nothing when `token` is no longer the current one, so a late 401
	/// for a request sent before a re-login leaves the new session alone.
	pub async fn expire(&self, token: &SecretString) {
		let previous = {
			let mut current = self.current.write().await;
			match current.as_ref() {
				Some(session) if session.token == *token => current.take(),
				Some(_) => {
					tracing::debug!("Ignoring rejection of a superseded token");
					return;
				},
				None => None,
			}
		};
		self.purge(previous, TeardownReason::Unauthorized).await;
	}

	async fn purge(&self, previous: Option<Session>, reason: TeardownReason) {
		if let Err(e) = self
			.storage
			.remove(StorageKey::Session.as_str(), CURRENT)
			.await
		{
			tracing::warn!(error = %e, "Failed to purge stored session");
		}

		let Some(previous) = previous else {
			return;
		};
		let event = match reason {
			TeardownReason::LoggedOut => {
				tracing::info!(username = %previous.user.username, "Logged out");
				SessionEvent::LoggedOut
			},
			TeardownReason::Unauthorized => {
				tracing::warn!(username = %previous.user.username, "Session expired or revoked");
				SessionEvent::Expired
			},
		};
		self.events.publish(ConsoleEvent::Session(event)).ok();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stall_storage::implementations::memory::MemoryStorage;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

	#[derive(Default)]
	struct FakeAuth {
		token_valid: AtomicBool,
		logout_fails: AtomicBool,
		logouts: AtomicUsize,
		logins: AtomicUsize,
	}

	#[async_trait]
	impl AuthBackend for FakeAuth {
		async fn login(&self, request: &LoginRequest) -> Result<LoginGrant, AuthError> {
			if request.password.expose_secret() != "rahasia123" {
				return Err(AuthError::Rejected("Invalid credentials".into()));
			}
			self.token_valid.store(true, Ordering::SeqCst);
			let token = match self.logins.fetch_add(1, Ordering::SeqCst) {
				0 => "jwt-token".to_string(),
				n => format!("jwt-token-{}", n + 1),
			};
			Ok(LoginGrant {
				token: token.into(),
				user: SessionUser {
					id: "U1".into(),
					username: request.identifier.clone(),
					email: None,
					role: Some("seller".into()),
				},
			})
		}

		async fn logout(&self, _token: &SecretString) -> Result<(), AuthError> {
			self.logouts.fetch_add(1, Ordering::SeqCst);
			if self.logout_fails.load(Ordering::SeqCst) {
				return Err(AuthError::Unavailable("connection refused".into()));
			}
			Ok(())
		}

		async fn check(&self, _token: &SecretString) -> Result<bool, AuthError> {
			Ok(self.token_valid.load(Ordering::SeqCst))
		}
	}

	fn manager(auth: Arc<FakeAuth>) -> (SessionManager, Arc<StorageService>, EventBus) {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let events = EventBus::new(16);
		let manager = SessionManager::new(
			storage.clone(),
			auth,
			Duration::from_secs(3600),
			events.clone(),
		);
		(manager, storage, events)
	}

	#[tokio::test]
	async fn test_login_persists_real_token() {
		let (manager, storage, _) = manager(Arc::new(FakeAuth::default()));

		let user = manager.login(" bu.sri ", "rahasia123".into()).await.unwrap();
		assert_eq!(user.username, "bu.sri");
		assert_eq!(manager.bearer().await.unwrap().expose_secret(), "jwt-token");

		let stored: Session = storage.retrieve("session", "current").await.unwrap();
		assert_eq!(stored.token.expose_secret(), "jwt-token");
	}

	#[tokio::test]
	async fn test_restore_after_restart() {
		let auth = Arc::new(FakeAuth::default());
		let (manager, storage, events) = manager(auth.clone());
		manager.login("bu.sri", "rahasia123".into()).await.unwrap();

		let restarted = SessionManager::new(storage, auth, Duration::from_secs(3600), events);
		assert!(restarted.bearer().await.is_err());
		let user = restarted.restore().await.unwrap().unwrap();
		assert_eq!(user.username, "bu.sri");
		assert!(restarted.is_logged_in().await);
	}

	#[tokio::test]
	async fn test_rejected_login_and_input_validation() {
		let (manager, _, _) = manager(Arc::new(FakeAuth::default()));

		assert!(matches!(
			manager.login("bu.sri", "salah".into()).await,
			Err(SessionError::Auth(AuthError::Rejected(_)))
		));
		assert!(matches!(
			manager.login("  ", "rahasia123".into()).await,
			Err(SessionError::Validation(_))
		));
		assert!(matches!(
			manager.bearer().await,
			Err(SessionError::NotLoggedIn)
		));
	}

	#[tokio::test]
	async fn test_unauthorized_teardown_purges_and_emits_once() {
		let (manager, storage, events) = manager(Arc::new(FakeAuth::default()));
		manager.login("bu.sri", "rahasia123".into()).await.unwrap();
		let mut rx = events.subscribe();

		manager.teardown(TeardownReason::Unauthorized).await;
		manager.teardown(TeardownReason::Unauthorized).await;

		assert!(!storage.exists("session", "current").await.unwrap());
		assert!(manager.bearer().await.is_err());
		assert_eq!(
			rx.recv().await.unwrap(),
			ConsoleEvent::Session(SessionEvent::Expired)
		);
		assert!(rx.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_logout_clears_even_when_backend_fails() {
		let auth = Arc::new(FakeAuth::default());
		auth.logout_fails.store(true, Ordering::SeqCst);
		let (manager, storage, events) = manager(auth.clone());
		manager.login("bu.sri", "rahasia123".into()).await.unwrap();
		let mut rx = events.subscribe();

		manager.logout().await.unwrap();

		assert_eq!(auth.logouts.load(Ordering::SeqCst), 1);
		assert!(!storage.exists("session", "current").await.unwrap());
		assert_eq!(
			rx.recv().await.unwrap(),
			ConsoleEvent::Session(SessionEvent::LoggedOut)
		);
	}

	#[tokio::test]
	async fn test_check_tears_down_invalid_token() {
		let auth = Arc::new(FakeAuth::default());
		let (manager, _, _) = manager(auth.clone());
		assert!(!manager.check().await.unwrap());

		manager.login("bu.sri", "rahasia123".into()).await.unwrap();
		assert!(manager.check().await.unwrap());

		auth.token_valid.store(false, Ordering::SeqCst);
		assert!(!manager.check().await.unwrap());
		assert!(!manager.is_logged_in().await);
	}

	#[tokio::test]
	async fn test_rejection_of_old_token_spares_new_session() {
		let (manager, storage, events) = manager(Arc::new(FakeAuth::default()));
		manager.login("bu.sri", "rahasia123".into()).await.unwrap();
		let old_token = manager.bearer().await.unwrap();

		manager.logout().await.unwrap();
		manager.login("bu.sri", "rahasia123".into()).await.unwrap();
		let new_token = manager.bearer().await.unwrap();
		assert_ne!(old_token, new_token);
		let mut rx = events.subscribe();

		// A request sent with the old token comes back 401 after the re-login
		manager.expire(&old_token).await;
		assert!(manager.is_logged_in().await);
		assert_eq!(manager.bearer().await.unwrap(), new_token);
		assert!(storage.exists("session", "current").await.unwrap());
		assert!(rx.try_recv().is_err());

		manager.expire(&new_token).await;
		assert!(!manager.is_logged_in().await);
		assert!(!storage.exists("session", "current").await.unwrap());
		assert_eq!(
			rx.recv().await.unwrap(),
			ConsoleEvent::Session(SessionEvent::Expired)
		);
	}

	#[tokio::test]
	async fn test_corrupted_stored_session_is_discarded() {
		use stall_storage::implementations::file::{FileStorage, TtlConfig};

		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("session_current.bin"), b"garbage").unwrap();
		let storage = Arc::new(StorageService::new(Box::new(FileStorage::new(
			dir.path().to_path_buf(),
			TtlConfig::default(),
		))));
		let manager = SessionManager::new(
			storage,
			Arc::new(FakeAuth::default()),
			Duration::from_secs(3600),
			EventBus::new(16),
		);

		assert!(manager.restore().await.unwrap().is_none());
		assert!(!manager.is_logged_in().await);
		assert!(!dir.path().join("session_current.bin").exists());
	}
}
