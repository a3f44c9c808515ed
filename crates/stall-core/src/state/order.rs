//! Order status controller.
//!
//! Orders move `waiting_confirmation -> processing -> ready -> completed`, or
//! `waiting_confirmation -> rejected` when the payment is refused. Every
//! request is checked against the transition table before anything is sent;
//! the backend's answer is authoritative and returned as is.

use once_cell::sync::Lazy;
use stall_client::{BackendError, OrderBackend};
use stall_types::{truncate_id, Order, OrderStatus, Transition, TransitionKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors from order operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
	#[error("Order not found: {0}")]
	NotFound(String),
	#[error("Cannot {action} order {order_id}: it is {from}")]
	InvalidTransition {
		order_id: String,
		from: OrderStatus,
		action: TransitionKind,
	},
	#[error("Invalid input: {0}")]
	Validation(String),
	#[error("Unauthorized: {0}")]
	Unauthorized(String),
	#[error("Service unavailable: {0}")]
	Unavailable(String),
	#[error("Unexpected error: {0}")]
	Unknown(String),
}

impl TransitionError {
	/// Converts a backend error raised while acting on `order`.
	fn from_backend(err: BackendError, order: &Order, action: TransitionKind) -> Self {
		match err {
			BackendError::Conflict(message) => {
				tracing::debug!(order_id = %truncate_id(&order.id), %message, "Backend refused transition");
				Self::InvalidTransition {
					order_id: order.id.clone(),
					from: order.status,
					action,
				}
			},
			other => other.into(),
		}
	}
}

impl From<BackendError> for TransitionError {
	fn from(err: BackendError) -> Self {
		match err {
			BackendError::NotFound(m) => Self::NotFound(m),
			BackendError::Conflict(m) => Self::Unknown(format!("conflict: {}", m)),
			BackendError::Validation(m) => Self::Validation(m),
			BackendError::Unauthorized(m) => Self::Unauthorized(m),
			BackendError::Unavailable(m) => Self::Unavailable(m),
			BackendError::Unknown(m) => Self::Unknown(m),
		}
	}
}

// Actions an operator may take from each status. Statuses without an entry
// only change on the customer or backend side.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<TransitionKind>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::WaitingConfirmation,
		HashSet::from([TransitionKind::ConfirmPayment, TransitionKind::RejectPayment]),
	);
	m.insert(
		OrderStatus::Processing,
		HashSet::from([TransitionKind::MarkReady]),
	);
	m.insert(OrderStatus::Ready, HashSet::from([TransitionKind::Complete]));
	m.insert(OrderStatus::PendingPayment, HashSet::new());
	m.insert(OrderStatus::Completed, HashSet::new()); // terminal
	m.insert(OrderStatus::Rejected, HashSet::new()); // terminal
	m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
	m
});

/// Validates and requests order status transitions.
pub struct OrderStatusController {
	backend: Arc<dyn OrderBackend>,
	min_reason_len: usize,
}

impl OrderStatusController {
	pub fn new(backend: Arc<dyn OrderBackend>, min_reason_len: usize) -> Self {
		Self {
			backend,
			min_reason_len,
		}
	}

	pub fn is_allowed(from: OrderStatus, action: TransitionKind) -> bool {
		TRANSITIONS
			.get(&from)
			.is_some_and(|allowed| allowed.contains(&action))
	}

	/// Actions offered for an order in `status`, in lifecycle order.
	pub fn allowed_actions(status: OrderStatus) -> Vec<TransitionKind> {
		TransitionKind::all()
			.filter(|action| Self::is_allowed(status, *action))
			.collect()
	}

	/// Checks a transition without contacting the backend.
	pub fn check(&self, order: &Order, transition: &Transition) -> Result<(), TransitionError> {
		let action = transition.kind();
		if !Self::is_allowed(order.status, action) {
			return Err(TransitionError::InvalidTransition {
				order_id: order.id.clone(),
				from: order.status,
				action,
			});
		}
		if let Transition::RejectPayment { reason } = transition {
			self.validate_reason(reason)?;
		}
		Ok(())
	}

	fn validate_reason(&self, reason: &str) -> Result<(), TransitionError> {
		if reason.trim().is_empty() {
			return Err(TransitionError::Validation(
				"rejection reason is required".into(),
			));
		}
		let len = reason.chars().count();
		if len < self.min_reason_len {
			return Err(TransitionError::Validation(format!(
				"rejection reason must be at least {} characters, got {}",
				self.min_reason_len, len
			)));
		}
		Ok(())
	}

	/// Checks the transition, then asks the backend to apply it.
	///
	/// Returns the authoritative record. `order` is never modified.
	pub async fn request(
		&self,
		order: &Order,
		transition: &Transition,
	) -> Result<Order, TransitionError> {
		self.check(order, transition)?;

		let action = transition.kind();
		let updated = self
			.backend
			.transition(&order.id, transition)
			.await
			.map_err(|e| TransitionError::from_backend(e, order, action))?;

		self.verify(order, &updated, action);
		Ok(updated)
	}

	/// Logs anything unexpected about the backend's answer. The answer wins regardless.
	fn verify(&self, before: &Order, after: &Order, action: TransitionKind) {
		let order_id = truncate_id(&before.id);
		if after.status != action.target() {
			tracing::warn!(
				%order_id,
				expected = %action.target(),
				actual = %after.status,
				"Backend returned an unexpected status"
			);
		}
		if after.amounts() != before.amounts() {
			tracing::warn!(%order_id, "Order amounts changed during a status transition");
		}
		for violation in after.check_invariants() {
			tracing::warn!(%order_id, %violation, "Order record violates an invariant");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stall_client::implementations::mock::{fixtures, MockBackend};

	fn controller(orders: Vec<Order>) -> (OrderStatusController, Arc<MockBackend>) {
		let backend = Arc::new(MockBackend::with_orders(orders));
		(OrderStatusController::new(backend.clone(), 10), backend)
	}

	#[test]
	fn test_table_matches_transition_kinds() {
		for action in TransitionKind::all() {
			for status in OrderStatus::all() {
				assert_eq!(
					OrderStatusController::is_allowed(status, action),
					status == action.required_from(),
					"{} from {}",
					action,
					status
				);
			}
		}
		for status in OrderStatus::all().filter(|s| s.is_terminal()) {
			assert!(OrderStatusController::allowed_actions(status).is_empty());
		}
		assert_eq!(
			OrderStatusController::allowed_actions(OrderStatus::WaitingConfirmation),
			vec![TransitionKind::ConfirmPayment, TransitionKind::RejectPayment]
		);
	}

	#[tokio::test]
	async fn test_confirm_waiting_order() {
		let order = fixtures::order("O1", OrderStatus::WaitingConfirmation);
		let (controller, _) = controller(vec![order.clone()]);

		let updated = controller
			.request(&order, &Transition::ConfirmPayment)
			.await
			.unwrap();
		assert_eq!(updated.status, OrderStatus::Processing);
		assert!(updated.rejection_reason.is_none());
		assert_eq!(updated.total_price, 16_000);
		assert_eq!(order.status, OrderStatus::WaitingConfirmation);
	}

	#[tokio::test]
	async fn test_short_reason_fails_before_network() {
		let order = fixtures::order("O2", OrderStatus::WaitingConfirmation);
		let (controller, backend) = controller(vec![order.clone()]);

		for reason in ["", "          ", "Stok habi", "Habis"] {
			let result = controller
				.request(
					&order,
					&Transition::RejectPayment {
						reason: reason.to_string(),
					},
				)
				.await;
			assert!(matches!(result, Err(TransitionError::Validation(_))), "{:?}", reason);
		}
		assert_eq!(backend.total_calls(), 0);
	}

	#[tokio::test]
	async fn test_reason_measured_in_characters() {
		let order = fixtures::order("O2", OrderStatus::WaitingConfirmation);
		let (controller, _) = controller(vec![order.clone()]);

		// Nine multi-byte characters are still too short
		let nine = "ééééééééé".to_string();
		assert!(nine.len() > 10);
		assert!(controller
			.check(&order, &Transition::RejectPayment { reason: nine })
			.is_err());

		let reason = "Bukti transfer tidak terbaca".to_string();
		let updated = controller
			.request(
				&order,
				&Transition::RejectPayment {
					reason: reason.clone(),
				},
			)
			.await
			.unwrap();
		assert_eq!(updated.status, OrderStatus::Rejected);
		assert_eq!(updated.rejection_reason, Some(reason));
	}

	#[tokio::test]
	async fn test_wrong_state_is_rejected_locally() {
		let order = fixtures::order("O3", OrderStatus::Processing);
		let (controller, backend) = controller(vec![order.clone()]);

		let err = controller
			.request(&order, &Transition::Complete)
			.await
			.unwrap_err();
		assert_eq!(
			err,
			TransitionError::InvalidTransition {
				order_id: "O3".into(),
				from: OrderStatus::Processing,
				action: TransitionKind::Complete,
			}
		);
		assert_eq!(backend.total_calls(), 0);
		assert_eq!(backend.order("O3").unwrap().status, OrderStatus::Processing);
	}

	#[tokio::test]
	async fn test_backend_conflict_becomes_invalid_transition() {
		let order = fixtures::order("O1", OrderStatus::WaitingConfirmation);
		let (controller, backend) = controller(vec![order.clone()]);
		// Another device already confirmed it
		backend.set_order_status("O1", OrderStatus::Processing);

		let err = controller
			.request(&order, &Transition::ConfirmPayment)
			.await
			.unwrap_err();
		assert!(matches!(err, TransitionError::InvalidTransition { .. }));
	}

	#[tokio::test]
	async fn test_backend_errors_map_to_taxonomy() {
		let order = fixtures::order("O4", OrderStatus::Processing);
		let (controller, backend) = controller(vec![order.clone()]);

		backend.fail_next("transition", BackendError::Unavailable("timeout".into()));
		assert_eq!(
			controller.request(&order, &Transition::MarkReady).await,
			Err(TransitionError::Unavailable("timeout".into()))
		);

		backend.fail_next("transition", BackendError::Unauthorized("expired".into()));
		assert_eq!(
			controller.request(&order, &Transition::MarkReady).await,
			Err(TransitionError::Unauthorized("expired".into()))
		);

		let missing = fixtures::order("O9", OrderStatus::Processing);
		assert!(matches!(
			controller.request(&missing, &Transition::MarkReady).await,
			Err(TransitionError::NotFound(_))
		));
	}
}
