//! Utility functions for the stall console.

pub mod conversion;
pub mod formatting;

pub use formatting::{format_rupiah, truncate_id};
