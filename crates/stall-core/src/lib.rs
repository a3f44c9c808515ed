//! Core of the stall console.
//!
//! Holds the order status controller, the display boards the operator works
//! from and the handlers that couple them with the marketplace backend. The
//! [`builder`] wires these together from a configuration.

pub mod board;
pub mod builder;
pub mod handlers;
pub mod state;

pub use board::{Board, Keyed, UpdateStrategy};
pub use builder::{Backends, BuilderError, Console, ConsoleBuilder, ConsoleFactories};
pub use handlers::{HandlerError, MenuHandler, OrderDesk, OrderFilter, ProfileHandler};
pub use stall_types::{ConsoleEvent, EventBus};
pub use state::{OrderStatusController, TransitionError};
