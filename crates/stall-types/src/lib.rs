//! Common types module for the stall console.
//!
//! This module defines the records exchanged with the marketplace backend
//! and the small shared building blocks (secrets, config schemas, formatting)
//! used by every other crate in the workspace.

/// API envelope and pagination types shared by all backend endpoints.
pub mod api;
/// Authentication payloads and the signed-in user record.
pub mod auth;
/// Console events and the broadcast bus carrying them.
pub mod events;
/// Menu catalog records and form inputs.
pub mod menu;
/// Order records, statuses and transition kinds.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Review records and listing queries.
pub mod review;
/// Secure string type for bearer tokens.
pub mod secret_string;
/// Stall profile records and update inputs.
pub mod stall;
/// Storage namespaces for persisted console state.
pub mod storage;
/// Utility functions for formatting and wire conversions.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use api::*;
pub use auth::*;
pub use events::*;
pub use menu::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use review::*;
pub use secret_string::SecretString;
pub use stall::*;
pub use storage::*;
pub use utils::{format_rupiah, truncate_id};
pub use validation::*;
