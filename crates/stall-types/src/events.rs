//! Console events.
//!
//! Components publish what happened to the shared [`EventBus`]; the CLI and
//! tests subscribe to react (for example sending the operator back to the
//! login prompt when the session expires).

use crate::{OrderStatus, TransitionKind};
use tokio::sync::broadcast;

/// Every event the console emits, grouped by the component producing it.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
	Session(SessionEvent),
	Order(OrderEvent),
	Menu(MenuEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	LoggedIn { username: String },
	/// The operator signed out.
	LoggedOut,
	/// The backend rejected the token; stored credentials were purged.
	Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
	Transitioned {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
	TransitionFailed {
		order_id: String,
		action: TransitionKind,
		error: String,
	},
	/// A backend conflict made the desk re-fetch the order.
	Reconciled {
		order_id: String,
		status: OrderStatus,
	},
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEvent {
	AvailabilityChanged { item_id: String, is_available: bool },
	/// The optimistic toggle failed and the prior value was restored.
	AvailabilityReverted {
		item_id: String,
		is_available: bool,
		error: String,
	},
}

/// Broadcast channel shared by every console component.
///
/// Cloning is cheap and all clones publish to the same subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
	sender: broadcast::Sender<ConsoleEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
		self.sender.subscribe()
	}

	/// Fails only when nobody is subscribed; callers usually ignore that with `.ok()`.
	pub fn publish(
		&self,
		event: ConsoleEvent,
	) -> Result<(), broadcast::error::SendError<ConsoleEvent>> {
		self.sender.send(event).map(|_| ())
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_subscribers_receive_published_events() {
		let bus = EventBus::new(8);
		let mut rx = bus.subscribe();
		let clone = bus.clone();

		clone
			.publish(ConsoleEvent::Session(SessionEvent::Expired))
			.unwrap();
		assert_eq!(
			rx.recv().await.unwrap(),
			ConsoleEvent::Session(SessionEvent::Expired)
		);
	}

	#[test]
	fn test_publish_without_subscribers_is_an_error_not_a_panic() {
		let bus = EventBus::default();
		assert!(bus
			.publish(ConsoleEvent::Session(SessionEvent::LoggedOut))
			.is_err());
	}
}
