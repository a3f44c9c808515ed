//! REST client for the marketplace backend.
//!
//! Every call carries the session's bearer token. A `401` on any call tears
//! down the session that token belongs to before the error reaches the
//! caller. Ids are checked before they are spliced into a path.

use crate::{BackendError, MenuBackend, OrderBackend, ReviewBackend, StallBackend};
use async_trait::async_trait;
use reqwest::{multipart::Form, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use stall_config::BackendConfig;
use stall_session::{AuthBackend, AuthError, SessionManager};
use stall_types::{
	truncate_id, ApiEnvelope, ErrorBody, LoginGrant, LoginRequest, MenuItem, MenuItemInput,
	MenuItemUpdate, Order, OrderQuery, Page, PaginationMeta, RejectPaymentRequest, Review,
	ReviewQuery, SecretString, Stall, StallUpdate, Transition,
};
use std::sync::Arc;
use std::time::Duration;

const ORDERS_PATH: &str = "/orders/my-stall/orders";
const MENU_ITEMS_PATH: &str = "/stalls/my-stall/menu-items";
const MY_STALL_PATH: &str = "/stalls/my-stall";
const REVIEWS_PATH: &str = "/reviews/my-stall/reviews";

/// Shared HTTP client bound to the backend base URL.
///
/// Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: reqwest::Client,
	base_url: String,
}

impl HttpTransport {
	pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
		Self::with_timeouts(&config.base_url, config.timeout(), config.connect_timeout())
	}

	pub fn with_timeouts(
		base_url: &str,
		timeout: Duration,
		connect_timeout: Duration,
	) -> Result<Self, BackendError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.connect_timeout(connect_timeout)
			.build()
			.map_err(|e| BackendError::Unknown(format!("Failed to build HTTP client: {}", e)))?;
		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	fn request(&self, method: Method, path: &str) -> RequestBuilder {
		self.client
			.request(method, format!("{}{}", self.base_url, path))
	}

	/// Sends a request and returns the body of a successful response.
	async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, BackendError> {
		let response = request.send().await.map_err(transport_error)?;
		let status = response.status();
		let body = response.bytes().await.map_err(transport_error)?;

		if status.is_success() {
			return Ok(body.to_vec());
		}

		let message = serde_json::from_slice::<ErrorBody>(&body)
			.ok()
			.and_then(|b| b.message_text())
			.or_else(|| status.canonical_reason().map(str::to_string))
			.unwrap_or_else(|| "request failed".to_string());
		tracing::debug!(status = status.as_u16(), %message, "Backend returned an error");
		Err(BackendError::from_status(status.as_u16(), message))
	}
}

fn transport_error(err: reqwest::Error) -> BackendError {
	if err.is_timeout() {
		BackendError::Unavailable("request timed out".into())
	} else if err.is_connect() {
		BackendError::Unavailable(format!("cannot reach backend: {}", err))
	} else if err.is_decode() {
		BackendError::Unknown(err.to_string())
	} else {
		BackendError::Unavailable(err.to_string())
	}
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<ApiEnvelope<T>, BackendError> {
	serde_json::from_slice(body)
		.map_err(|e| BackendError::Unknown(format!("malformed response: {}", e)))
}

fn form(fields: Vec<(&'static str, String)>) -> Form {
	fields
		.into_iter()
		.fold(Form::new(), |form, (name, value)| form.text(name, value))
}

/// Returns `id` if it is safe to use as one path segment.
fn path_segment(id: &str) -> Result<&str, BackendError> {
	let unsafe_char =
		|c: char| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control();
	if id.is_empty() || id == "." || id == ".." || id.chars().any(unsafe_char) {
		return Err(BackendError::Validation(format!("invalid id: {:?}", id)));
	}
	Ok(id)
}

/// A request signed with the bearer token it carries.
struct Authorized {
	request: RequestBuilder,
	token: SecretString,
}

impl Authorized {
	fn map(self, f: impl FnOnce(RequestBuilder) -> RequestBuilder) -> Self {
		Self {
			request: f(self.request),
			token: self.token,
		}
	}
}

/// Authenticated client for the seller endpoints.
pub struct HttpBackend {
	transport: HttpTransport,
	session: Arc<SessionManager>,
}

impl HttpBackend {
	pub fn new(transport: HttpTransport, session: Arc<SessionManager>) -> Self {
		Self { transport, session }
	}

	async fn authorized(&self, method: Method, path: &str) -> Result<Authorized, BackendError> {
		let token = self
			.session
			.bearer()
			.await
			.map_err(|_| BackendError::Unauthorized("not logged in".into()))?;
		let request = self
			.transport
			.request(method, path)
			.bearer_auth(token.expose_secret());
		Ok(Authorized { request, token })
	}

	async fn call(&self, authorized: Authorized) -> Result<Vec<u8>, BackendError> {
		let Authorized { request, token } = authorized;
		match self.transport.send(request).await {
			Err(BackendError::Unauthorized(message)) => {
				self.session.expire(&token).await;
				Err(BackendError::Unauthorized(message))
			},
			other => other,
		}
	}

	async fn fetch<T: DeserializeOwned>(&self, request: Authorized) -> Result<T, BackendError> {
		let body = self.call(request).await?;
		Ok(decode::<T>(&body)?.data)
	}

	async fn fetch_page<T: DeserializeOwned>(
		&self,
		request: Authorized,
		limit: u32,
	) -> Result<Page<T>, BackendError> {
		let body = self.call(request).await?;
		let ApiEnvelope { data, meta, .. } = decode::<Vec<T>>(&body)?;
		let meta = meta.unwrap_or_else(|| PaginationMeta::single_page(data.len(), limit));
		Ok(Page { data, meta })
	}
}

#[async_trait]
impl OrderBackend for HttpBackend {
	async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>, BackendError> {
		let request = self
			.authorized(Method::GET, ORDERS_PATH)
			.await?
			.map(|r| r.query(&query.to_pairs()));
		self.fetch_page(request, query.limit).await
	}

	async fn get_order(&self, order_id: &str) -> Result<Order, BackendError> {
		let path = format!("{}/{}", ORDERS_PATH, path_segment(order_id)?);
		let request = self.authorized(Method::GET, &path).await?;
		self.fetch(request).await
	}

	async fn transition(
		&self,
		order_id: &str,
		transition: &Transition,
	) -> Result<Order, BackendError> {
		let path = format!(
			"{}/{}/{}",
			ORDERS_PATH,
			path_segment(order_id)?,
			transition.kind().endpoint()
		);
		let mut request = self.authorized(Method::PATCH, &path).await?;
		if let Transition::RejectPayment { reason } = transition {
			request = request.map(|r| {
				r.json(&RejectPaymentRequest {
					reason: reason.clone(),
				})
			});
		}

		tracing::debug!(order_id = %truncate_id(order_id), action = %transition.kind(), "Requesting transition");
		self.fetch(request).await
	}
}

#[async_trait]
impl MenuBackend for HttpBackend {
	async fn list_menu_items(&self) -> Result<Vec<MenuItem>, BackendError> {
		let request = self.authorized(Method::GET, MENU_ITEMS_PATH).await?;
		self.fetch(request).await
	}

	async fn get_menu_item(&self, item_id: &str) -> Result<MenuItem, BackendError> {
		let path = format!("{}/{}", MENU_ITEMS_PATH, path_segment(item_id)?);
		let request = self.authorized(Method::GET, &path).await?;
		self.fetch(request).await
	}

	async fn create_menu_item(&self, input: &MenuItemInput) -> Result<MenuItem, BackendError> {
		input.validate()?;
		let request = self
			.authorized(Method::POST, MENU_ITEMS_PATH)
			.await?
			.map(|r| r.multipart(form(input.to_form_fields())));
		self.fetch(request).await
	}

	async fn update_menu_item(
		&self,
		item_id: &str,
		update: &MenuItemUpdate,
	) -> Result<MenuItem, BackendError> {
		update.validate()?;
		let path = format!("{}/{}", MENU_ITEMS_PATH, path_segment(item_id)?);
		let request = self
			.authorized(Method::PATCH, &path)
			.await?
			.map(|r| r.multipart(form(update.to_form_fields())));
		self.fetch(request).await
	}

	async fn delete_menu_item(&self, item_id: &str) -> Result<(), BackendError> {
		let path = format!("{}/{}", MENU_ITEMS_PATH, path_segment(item_id)?);
		let request = self.authorized(Method::DELETE, &path).await?;
		self.call(request).await.map(|_| ())
	}
}

#[async_trait]
impl StallBackend for HttpBackend {
	async fn get_stall(&self) -> Result<Stall, BackendError> {
		let request = self.authorized(Method::GET, MY_STALL_PATH).await?;
		self.fetch(request).await
	}

	async fn update_stall(&self, update: &StallUpdate) -> Result<Stall, BackendError> {
		update.validate()?;
		let request = self
			.authorized(Method::PATCH, MY_STALL_PATH)
			.await?
			.map(|r| r.multipart(form(update.to_form_fields())));
		self.fetch(request).await
	}

	async fn delete_stall(&self) -> Result<(), BackendError> {
		let request = self.authorized(Method::DELETE, MY_STALL_PATH).await?;
		self.call(request).await.map(|_| ())
	}
}

#[async_trait]
impl ReviewBackend for HttpBackend {
	async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<Review>, BackendError> {
		query.validate()?;
		let request = self
			.authorized(Method::GET, REVIEWS_PATH)
			.await?
			.map(|r| r.query(&query.to_pairs()));
		self.fetch_page(request, query.limit).await
	}
}

/// Unauthenticated transport for the `/auth` endpoints.
pub struct HttpAuth {
	transport: HttpTransport,
}

impl HttpAuth {
	pub fn new(transport: HttpTransport) -> Self {
		Self { transport }
	}
}

fn auth_error(err: BackendError) -> AuthError {
	match err {
		BackendError::Unauthorized(m) | BackendError::Validation(m) | BackendError::NotFound(m) => {
			AuthError::Rejected(m)
		},
		BackendError::Unavailable(m) => AuthError::Unavailable(m),
		BackendError::Conflict(m) | BackendError::Unknown(m) => AuthError::Unknown(m),
	}
}

#[async_trait]
impl AuthBackend for HttpAuth {
	async fn login(&self, request: &LoginRequest) -> Result<LoginGrant, AuthError> {
		let body = self
			.transport
			.send(
				self.transport
					.request(Method::POST, "/auth/login")
					.json(request),
			)
			.await
			.map_err(auth_error)?;
		decode::<LoginGrant>(&body)
			.map(|envelope| envelope.data)
			.map_err(auth_error)
	}

	async fn logout(&self, token: &SecretString) -> Result<(), AuthError> {
		let request = self
			.transport
			.request(Method::POST, "/auth/logout")
			.bearer_auth(token.expose_secret());
		self.transport
			.send(request)
			.await
			.map(|_| ())
			.map_err(auth_error)
	}

	async fn check(&self, token: &SecretString) -> Result<bool, AuthError> {
		let request = self
			.transport
			.request(Method::GET, "/auth/check")
			.bearer_auth(token.expose_secret());
		match self.transport.send(request).await {
			Ok(_) => Ok(true),
			Err(BackendError::Unauthorized(_)) => Ok(false),
			Err(e) => Err(auth_error(e)),
		}
	}
}
