//! Menu handler: catalog board and its edits.
//!
//! Availability toggles are optimistic: the flip shows at once and is rolled
//! back if the backend refuses it. Everything else waits for the backend.

use super::HandlerError;
use crate::board::{Board, UpdateStrategy};
use stall_client::MenuBackend;
use stall_types::{
	truncate_id, ConsoleEvent, EventBus, MenuEvent, MenuItem, MenuItemInput, MenuItemUpdate,
};
use std::sync::Arc;
use tracing::instrument;

pub struct MenuHandler {
	board: Board<MenuItem>,
	backend: Arc<dyn MenuBackend>,
	event_bus: EventBus,
}

impl MenuHandler {
	pub fn new(backend: Arc<dyn MenuBackend>, event_bus: EventBus) -> Self {
		Self {
			board: Board::new(),
			backend,
			event_bus,
		}
	}

	/// Reloads the catalog. Returns the number of items.
	pub async fn refresh(&self) -> Result<usize, HandlerError> {
		let items = self.backend.list_menu_items().await?;
		let count = items.len();
		self.board.load(items).await;
		Ok(count)
	}

	pub async fn items(&self) -> Vec<MenuItem> {
		self.board.snapshot().await
	}

	pub async fn item(&self, item_id: &str) -> Option<MenuItem> {
		self.board.get(item_id).await
	}

	pub async fn create(&self, input: &MenuItemInput) -> Result<MenuItem, HandlerError> {
		input.validate()?;
		let item = self.backend.create_menu_item(input).await?;
		tracing::info!(item_id = %truncate_id(&item.id), name = %item.name, "Menu item created");
		self.board.replace(item.clone()).await;
		Ok(item)
	}

	pub async fn update(
		&self,
		item_id: &str,
		update: &MenuItemUpdate,
	) -> Result<MenuItem, HandlerError> {
		update.validate()?;
		self.board
			.update(
				item_id,
				UpdateStrategy::Confirmed,
				|_| {},
				|| async {
					self.backend
						.update_menu_item(item_id, update)
						.await
						.map_err(HandlerError::from)
				},
			)
			.await
	}

	pub async fn delete(&self, item_id: &str) -> Result<(), HandlerError> {
		self.backend.delete_menu_item(item_id).await?;
		self.board.remove(item_id).await;
		tracing::info!(item_id = %truncate_id(item_id), "Menu item deleted");
		Ok(())
	}

	/// Flips availability, showing the new value before the backend answers.
	#[instrument(skip_all, fields(item_id = %truncate_id(item_id)))]
	pub async fn toggle_availability(&self, item_id: &str) -> Result<MenuItem, HandlerError> {
		let current = self
			.board
			.get(item_id)
			.await
			.ok_or_else(|| HandlerError::NotFound(format!("Menu item {} not found", item_id)))?;
		let target = !current.is_available;
		let update = MenuItemUpdate::availability(target);

		let result = self
			.board
			.update(
				item_id,
				UpdateStrategy::Optimistic,
				|item| item.is_available = target,
				|| async {
					self.backend
						.update_menu_item(item_id, &update)
						.await
						.map_err(HandlerError::from)
				},
			)
			.await;

		let event = match &result {
			Ok(item) => MenuEvent::AvailabilityChanged {
				item_id: item_id.to_string(),
				is_available: item.is_available,
			},
			Err(e) => {
				tracing::warn!(error = %e, "Availability change reverted");
				MenuEvent::AvailabilityReverted {
					item_id: item_id.to_string(),
					is_available: current.is_available,
					error: e.to_string(),
				}
			},
		};
		self.event_bus.publish(ConsoleEvent::Menu(event)).ok();
		result
	}
}
