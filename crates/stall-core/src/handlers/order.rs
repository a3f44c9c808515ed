//! Order desk: the order board plus the controller that mutates it.

use crate::board::{Board, UpdateStrategy};
use crate::state::{OrderStatusController, TransitionError};
use stall_client::OrderBackend;
use stall_types::{
	truncate_id, ConsoleEvent, EventBus, Order, OrderEvent, OrderQuery, OrderStatus,
	PaginationMeta, Transition, TransitionKind,
};
use std::sync::Arc;
use tracing::instrument;

/// Which orders a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderFilter {
	/// Every order that still needs attention.
	#[default]
	Active,
	/// Active orders in a single status.
	Status(OrderStatus),
	/// Completed, rejected and cancelled orders.
	History,
	All,
}

impl OrderFilter {
	pub fn matches(&self, status: OrderStatus) -> bool {
		match self {
			OrderFilter::Active => !status.is_terminal(),
			OrderFilter::Status(wanted) => status == *wanted,
			OrderFilter::History => status.is_terminal(),
			OrderFilter::All => true,
		}
	}

	/// Status the backend can filter on, if the filter is a single status.
	fn query_status(&self) -> Option<OrderStatus> {
		match self {
			OrderFilter::Status(status) => Some(*status),
			_ => None,
		}
	}
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
	orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
	orders
}

pub struct OrderDesk {
	board: Board<Order>,
	controller: OrderStatusController,
	backend: Arc<dyn OrderBackend>,
	event_bus: EventBus,
}

impl OrderDesk {
	pub fn new(backend: Arc<dyn OrderBackend>, min_reason_len: usize, event_bus: EventBus) -> Self {
		Self {
			board: Board::new(),
			controller: OrderStatusController::new(backend.clone(), min_reason_len),
			backend,
			event_bus,
		}
	}

	/// Loads one page of orders onto the board, replacing what was shown.
	///
	/// Only [`OrderFilter::Status`] is filtered by the backend. The other
	/// filters narrow the fetched page locally, so the returned metadata
	/// counts the backend page and may exceed what the board shows.
	#[instrument(skip_all, fields(filter = ?filter, page = page))]
	pub async fn refresh(
		&self,
		filter: OrderFilter,
		page: u32,
		limit: u32,
	) -> Result<PaginationMeta, TransitionError> {
		let query = OrderQuery {
			status: filter.query_status(),
			page,
			limit,
		};
		let listing = self.backend.list_orders(&query).await?;
		let orders: Vec<Order> = listing
			.data
			.into_iter()
			.filter(|o| filter.matches(o.status))
			.collect();

		tracing::debug!(count = orders.len(), total = listing.meta.total, "Loaded orders");
		self.board.load(newest_first(orders)).await;
		Ok(listing.meta)
	}

	pub async fn order(&self, order_id: &str) -> Option<Order> {
		self.board.get(order_id).await
	}

	/// Fetches the current copy of one order and shows it.
	pub async fn fetch(&self, order_id: &str) -> Result<Order, TransitionError> {
		let order = self.backend.get_order(order_id).await?;
		self.board.replace(order.clone()).await;
		Ok(order)
	}

	/// Orders still in progress, newest first.
	pub async fn active(&self) -> Vec<Order> {
		self.filtered(OrderFilter::Active).await
	}

	/// Finished orders, newest first.
	pub async fn history(&self) -> Vec<Order> {
		self.filtered(OrderFilter::History).await
	}

	pub async fn filtered(&self, filter: OrderFilter) -> Vec<Order> {
		newest_first(
			self.board
				.snapshot()
				.await
				.into_iter()
				.filter(|o| filter.matches(o.status))
				.collect(),
		)
	}

	/// Number shown on the active tab badge.
	pub async fn active_count(&self) -> usize {
		self.active().await.len()
	}

	pub async fn confirm_payment(&self, order_id: &str) -> Result<Order, TransitionError> {
		self.apply(order_id, Transition::ConfirmPayment).await
	}

	/// Rejects the payment. `reason` is sent exactly as typed.
	pub async fn reject_payment(
		&self,
		order_id: &str,
		reason: &str,
	) -> Result<Order, TransitionError> {
		self.apply(
			order_id,
			Transition::RejectPayment {
				reason: reason.to_string(),
			},
		)
		.await
	}

	pub async fn mark_ready(&self, order_id: &str) -> Result<Order, TransitionError> {
		self.apply(order_id, Transition::MarkReady).await
	}

	pub async fn complete(&self, order_id: &str) -> Result<Order, TransitionError> {
		self.apply(order_id, Transition::Complete).await
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), action = %transition.kind()))]
	async fn apply(
		&self,
		order_id: &str,
		transition: Transition,
	) -> Result<Order, TransitionError> {
		let action = transition.kind();
		let result = self.try_apply(order_id, &transition).await;

		match &result {
			Ok(updated) => {
				tracing::info!(status = %updated.status, "Order updated");
			},
			Err(e) => {
				tracing::warn!(error = %e, "Order update failed");
				self.event_bus
					.publish(ConsoleEvent::Order(OrderEvent::TransitionFailed {
						order_id: order_id.to_string(),
						action,
						error: e.to_string(),
					}))
					.ok();
			},
		}
		result
	}

	async fn try_apply(
		&self,
		order_id: &str,
		transition: &Transition,
	) -> Result<Order, TransitionError> {
		let order = match self.board.get(order_id).await {
			Some(order) => order,
			None => self.backend.get_order(order_id).await?,
		};

		// Local refusals never touch the backend, so they need no reconciling
		self.controller.check(&order, transition)?;

		let result = self
			.board
			.update(
				order_id,
				UpdateStrategy::Confirmed,
				|_| {},
				|| self.controller.request(&order, transition),
			)
			.await;

		match result {
			Ok(updated) => {
				self.event_bus
					.publish(ConsoleEvent::Order(OrderEvent::Transitioned {
						order_id: updated.id.clone(),
						from: order.status,
						to: updated.status,
					}))
					.ok();
				Ok(updated)
			},
			Err(TransitionError::InvalidTransition { .. }) => {
				Err(self.reconcile(&order, transition.kind()).await)
			},
			Err(e) => Err(e),
		}
	}

	/// Re-fetches an order the backend refused to transition and shows its
	/// real state.
	async fn reconcile(&self, stale: &Order, action: TransitionKind) -> TransitionError {
		let fallback = TransitionError::InvalidTransition {
			order_id: stale.id.clone(),
			from: stale.status,
			action,
		};
		match self.backend.get_order(&stale.id).await {
			Ok(fresh) => {
				tracing::info!(
					stale = %stale.status,
					actual = %fresh.status,
					"Order changed elsewhere, board reconciled"
				);
				let status = fresh.status;
				self.board.replace(fresh).await;
				self.event_bus
					.publish(ConsoleEvent::Order(OrderEvent::Reconciled {
						order_id: stale.id.clone(),
						status,
					}))
					.ok();
				TransitionError::InvalidTransition {
					order_id: stale.id.clone(),
					from: status,
					action,
				}
			},
			Err(e) => {
				tracing::warn!(error = %e, "Could not re-fetch order after conflict");
				fallback
			},
		}
	}
}
