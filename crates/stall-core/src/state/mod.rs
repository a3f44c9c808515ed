//! Order status state machine.
//!
//! Holds the transition table and the controller that validates transitions
//! locally before asking the backend to apply them.

pub mod order;

pub use order::{OrderStatusController, TransitionError};
