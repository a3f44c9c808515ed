//! In-memory marketplace backend.
//!
//! Applies the same order transition rules the real backend enforces, counts
//! calls per operation and can be told to fail or stall specific calls.

use crate::{BackendError, MenuBackend, OrderBackend, ReviewBackend, StallBackend};
use async_trait::async_trait;
use chrono::Utc;
use stall_session::{AuthBackend, AuthError};
use stall_types::{
	LoginGrant, LoginRequest, MenuItem, MenuItemInput, MenuItemUpdate, Order, OrderQuery, Page,
	PaginationMeta, Review, ReviewQuery, ReviewSortBy, SecretString, SessionUser, SortOrder,
	Stall, StallUpdate, Transition,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Credentials the mock accepts.
pub const MOCK_IDENTIFIER: &str = "bu.sri";
pub const MOCK_PASSWORD: &str = "rahasia123";
const MOCK_TOKEN: &str = "mock-token";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn paginate<T: Clone>(items: &[T], page: u32, limit: u32) -> Page<T> {
	let limit = limit.max(1);
	let page = page.max(1);
	let total = items.len();
	let start = ((page - 1) as usize).saturating_mul(limit as usize);
	Page {
		data: items.iter().skip(start).take(limit as usize).cloned().collect(),
		meta: PaginationMeta {
			total: total as u64,
			page,
			limit,
			total_pages: total.div_ceil(limit as usize) as u32,
		},
	}
}

#[derive(Default)]
pub struct MockBackend {
	orders: Mutex<Vec<Order>>,
	menu: Mutex<Vec<MenuItem>>,
	stall: Mutex<Option<Stall>>,
	reviews: Mutex<Vec<Review>>,
	calls: Mutex<HashMap<&'static str, usize>>,
	failures: Mutex<HashMap<&'static str, BackendError>>,
	delays: Mutex<HashMap<String, Duration>>,
	token_revoked: Mutex<bool>,
}

impl MockBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_orders(orders: Vec<Order>) -> Self {
		let backend = Self::new();
		*lock(&backend.orders) = orders;
		backend
	}

	pub fn insert_order(&self, order: Order) {
		let mut orders = lock(&self.orders);
		orders.retain(|o| o.id != order.id);
		orders.push(order);
	}

	/// Current server-side copy of an order.
	pub fn order(&self, order_id: &str) -> Option<Order> {
		lock(&self.orders).iter().find(|o| o.id == order_id).cloned()
	}

	/// Changes an order behind the console's back, as another device would.
	pub fn set_order_status(&self, order_id: &str, status: stall_types::OrderStatus) {
		if let Some(order) = lock(&self.orders).iter_mut().find(|o| o.id == order_id) {
			order.status = status;
			order.updated_at = Utc::now();
		}
	}

	pub fn insert_menu_item(&self, item: MenuItem) {
		lock(&self.menu).push(item);
	}

	pub fn menu_item(&self, item_id: &str) -> Option<MenuItem> {
		lock(&self.menu).iter().find(|m| m.id == item_id).cloned()
	}

	pub fn set_stall(&self, stall: Stall) {
		*lock(&self.stall) = Some(stall);
	}

	pub fn insert_review(&self, review: Review) {
		lock(&self.reviews).push(review);
	}

	/// Makes the next call of `operation` fail with `error`.
	pub fn fail_next(&self, operation: &'static str, error: BackendError) {
		lock(&self.failures).insert(operation, error);
	}

	/// Delays every transition of `order_id` by `delay`.
	pub fn delay_order(&self, order_id: &str, delay: Duration) {
		lock(&self.delays).insert(order_id.to_string(), delay);
	}

	/// Invalidates the issued token, as an expiry on the server would.
	pub fn revoke_token(&self) {
		*lock(&self.token_revoked) = true;
	}

	/// How many times `operation` was called.
	pub fn calls(&self, operation: &str) -> usize {
		lock(&self.calls).get(operation).copied().unwrap_or(0)
	}

	pub fn total_calls(&self) -> usize {
		lock(&self.calls).values().sum()
	}

	fn enter(&self, operation: &'static str) -> Result<(), BackendError> {
		*lock(&self.calls).entry(operation).or_insert(0) += 1;
		if let Some(error) = lock(&self.failures).remove(operation) {
			return Err(error);
		}
		if *lock(&self.token_revoked) {
			return Err(BackendError::Unauthorized("Token expired".into()));
		}
		Ok(())
	}

	fn menu_not_found(item_id: &str) -> BackendError {
		BackendError::NotFound(format!("Menu item {} not found", item_id))
	}
}

#[async_trait]
impl OrderBackend for MockBackend {
	async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>, BackendError> {
		self.enter("list_orders")?;
		let mut orders: Vec<Order> = lock(&self.orders)
			.iter()
			.filter(|o| query.status.is_none_or(|status| o.status == status))
			.cloned()
			.collect();
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(paginate(&orders, query.page, query.limit))
	}

	async fn get_order(&self, order_id: &str) -> Result<Order, BackendError> {
		self.enter("get_order")?;
		self.order(order_id)
			.ok_or_else(|| BackendError::NotFound(format!("Order {} not found", order_id)))
	}

	async fn transition(
		&self,
		order_id: &str,
		transition: &Transition,
	) -> Result<Order, BackendError> {
		self.enter("transition")?;
		let delay = lock(&self.delays).get(order_id).copied();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		let mut orders = lock(&self.orders);
		let order = orders
			.iter_mut()
			.find(|o| o.id == order_id)
			.ok_or_else(|| BackendError::NotFound(format!("Order {} not found", order_id)))?;

		let kind = transition.kind();
		if order.status != kind.required_from() {
			return Err(BackendError::Conflict(format!(
				"Cannot {} an order that is {}",
				kind, order.status
			)));
		}
		if let Transition::RejectPayment { reason } = transition {
			if reason.trim().chars().count() < 10 {
				return Err(BackendError::Validation(
					"reason must be longer than or equal to 10 characters".into(),
				));
			}
			order.rejection_reason = Some(reason.clone());
		}
		order.status = kind.target();
		order.updated_at = Utc::now();
		Ok(order.clone())
	}
}

#[async_trait]
impl MenuBackend for MockBackend {
	async fn list_menu_items(&self) -> Result<Vec<MenuItem>, BackendError> {
		self.enter("list_menu_items")?;
		Ok(lock(&self.menu).clone())
	}

	async fn get_menu_item(&self, item_id: &str) -> Result<MenuItem, BackendError> {
		self.enter("get_menu_item")?;
		self.menu_item(item_id)
			.ok_or_else(|| Self::menu_not_found(item_id))
	}

	async fn create_menu_item(&self, input: &MenuItemInput) -> Result<MenuItem, BackendError> {
		self.enter("create_menu_item")?;
		input.validate()?;
		let now = Utc::now();
		let item = MenuItem {
			id: uuid::Uuid::new_v4().to_string(),
			stall_id: "S1".into(),
			name: input.name.trim().to_string(),
			description: input.description.clone(),
			category: input.category.clone(),
			price: input.price,
			image_url: None,
			is_available: input.is_available,
			created_at: now,
			updated_at: now,
		};
		lock(&self.menu).push(item.clone());
		Ok(item)
	}

	async fn update_menu_item(
		&self,
		item_id: &str,
		update: &MenuItemUpdate,
	) -> Result<MenuItem, BackendError> {
		self.enter("update_menu_item")?;
		update.validate()?;
		let mut menu = lock(&self.menu);
		let item = menu
			.iter_mut()
			.find(|m| m.id == item_id)
			.ok_or_else(|| Self::menu_not_found(item_id))?;
		update.apply_to(item);
		item.updated_at = Utc::now();
		Ok(item.clone())
	}

	async fn delete_menu_item(&self, item_id: &str) -> Result<(), BackendError> {
		self.enter("delete_menu_item")?;
		let mut menu = lock(&self.menu);
		let before = menu.len();
		menu.retain(|m| m.id != item_id);
		if menu.len() == before {
			return Err(Self::menu_not_found(item_id));
		}
		Ok(())
	}
}

#[async_trait]
impl StallBackend for MockBackend {
	async fn get_stall(&self) -> Result<Stall, BackendError> {
		self.enter("get_stall")?;
		lock(&self.stall)
			.clone()
			.ok_or_else(|| BackendError::NotFound("Stall not found".into()))
	}

	async fn update_stall(&self, update: &StallUpdate) -> Result<Stall, BackendError> {
		self.enter("update_stall")?;
		update.validate()?;
		let mut guard = lock(&self.stall);
		let stall = guard
			.as_mut()
			.ok_or_else(|| BackendError::NotFound("Stall not found".into()))?;
		if let Some(name) = &update.name {
			stall.name = name.trim().to_string();
		}
		if let Some(description) = &update.description {
			stall.description = description.clone();
		}
		if let Some(category) = update.category {
			stall.category = category;
		}
		if let Some(food_types) = &update.food_types {
			stall.food_types = food_types.clone();
		}
		stall.updated_at = Utc::now();
		Ok(stall.clone())
	}

	async fn delete_stall(&self) -> Result<(), BackendError> {
		self.enter("delete_stall")?;
		lock(&self.stall)
			.take()
			.map(|_| ())
			.ok_or_else(|| BackendError::NotFound("Stall not found".into()))
	}
}

#[async_trait]
impl ReviewBackend for MockBackend {
	async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<Review>, BackendError> {
		self.enter("list_reviews")?;
		query.validate()?;
		let mut reviews: Vec<Review> = lock(&self.reviews)
			.iter()
			.filter(|r| query.rating.is_none_or(|rating| r.rating == rating))
			.cloned()
			.collect();
		reviews.sort_by(|a, b| {
			let ordering = match query.sort_by {
				ReviewSortBy::CreatedAt => a.created_at.cmp(&b.created_at),
				ReviewSortBy::Rating => a.rating.cmp(&b.rating),
			};
			match query.sort_order {
				SortOrder::Asc => ordering,
				SortOrder::Desc => ordering.reverse(),
			}
		});
		Ok(paginate(&reviews, query.page, query.limit))
	}
}

#[async_trait]
impl AuthBackend for MockBackend {
	async fn login(&self, request: &LoginRequest) -> Result<LoginGrant, AuthError> {
		*lock(&self.calls).entry("login").or_insert(0) += 1;
		if request.identifier != MOCK_IDENTIFIER || request.password.expose_secret() != MOCK_PASSWORD
		{
			return Err(AuthError::Rejected("Invalid credentials".into()));
		}
		*lock(&self.token_revoked) = false;
		Ok(LoginGrant {
			token: SecretString::from(MOCK_TOKEN),
			user: SessionUser {
				id: "U1".into(),
				username: MOCK_IDENTIFIER.into(),
				email: Some("bu.sri@kantin.example".into()),
				role: Some("seller".into()),
			},
		})
	}

	async fn logout(&self, _token: &SecretString) -> Result<(), AuthError> {
		*lock(&self.calls).entry("logout").or_insert(0) += 1;
		Ok(())
	}

	async fn check(&self, token: &SecretString) -> Result<bool, AuthError> {
		*lock(&self.calls).entry("check").or_insert(0) += 1;
		Ok(token.expose_secret() == MOCK_TOKEN && !*lock(&self.token_revoked))
	}
}

/// Ready-made records for tests.
pub mod fixtures {
	use chrono::{DateTime, Duration, Utc};
	use stall_types::{
		DeliveryMethod, MenuItem, Order, OrderItem, OrderStatus, Review, Stall, StallCategory,
	};

	/// 2024-05-01T08:00:00Z
	fn base_time() -> DateTime<Utc> {
		DateTime::from_timestamp(1_714_550_400, 0).unwrap_or_default()
	}

	/// Pickup order: Nasi Goreng 15000 + app fee 1000, total 16000.
	pub fn order(id: &str, status: OrderStatus) -> Order {
		order_at(id, status, 0)
	}

	/// Like [`order`], created `minute` minutes after the base time.
	pub fn order_at(id: &str, status: OrderStatus, minute: i64) -> Order {
		let created_at = base_time() + Duration::minutes(minute);
		Order {
			id: id.to_string(),
			username: "budi".into(),
			stall_id: "S1".into(),
			stall_name: "Warung Bu Sri".into(),
			stall_image_url: None,
			items: vec![OrderItem {
				menu_item_id: "M1".into(),
				name: "Nasi Goreng".into(),
				price: 15_000,
				image_url: None,
				quantity: 1,
				subtotal: 15_000,
			}],
			items_total: 15_000,
			app_fee: 1_000,
			delivery_method: DeliveryMethod::Pickup,
			delivery_fee: 0,
			total_price: 16_000,
			payment_proof_url: Some("https://cdn.example/proof.jpg".into()),
			status,
			rejection_reason: (status == OrderStatus::Rejected)
				.then(|| "Bukti transfer tidak terbaca".to_string()),
			is_reviewed: false,
			created_at,
			updated_at: created_at,
		}
	}

	/// Delivery order with the given fee added to the total.
	pub fn delivery_order(id: &str, status: OrderStatus, delivery_fee: u64) -> Order {
		let mut order = order(id, status);
		order.delivery_method = DeliveryMethod::Delivery;
		order.delivery_fee = delivery_fee;
		order.total_price = order.expected_total();
		order
	}

	pub fn menu_item(id: &str, name: &str, price: u64, is_available: bool) -> MenuItem {
		MenuItem {
			id: id.to_string(),
			stall_id: "S1".into(),
			name: name.to_string(),
			description: String::new(),
			category: vec!["Makanan".into()],
			price,
			image_url: None,
			is_available,
			created_at: base_time(),
			updated_at: base_time(),
		}
	}

	pub fn stall(name: &str) -> Stall {
		Stall {
			id: "S1".into(),
			owner_id: "U1".into(),
			name: name.to_string(),
			description: "Masakan rumahan".into(),
			stall_image_url: None,
			qris_image_url: None,
			category: StallCategory::IndonesianFood,
			food_types: vec!["Nasi".into(), "Ayam".into()],
			rating: 4.5,
			total_reviews: 2,
			created_at: base_time(),
			updated_at: base_time(),
		}
	}

	pub fn review(id: &str, rating: u8, minute: i64) -> Review {
		let created_at = base_time() + Duration::minutes(minute);
		Review {
			id: id.to_string(),
			order_id: format!("O-{}", id),
			user_id: "U9".into(),
			stall_id: "S1".into(),
			stall_name: "Warung Bu Sri".into(),
			user_name: "budi".into(),
			rating,
			comment: "Enak".into(),
			tags: vec![],
			image_urls: vec![],
			created_at,
			updated_at: created_at,
		}
	}
}
