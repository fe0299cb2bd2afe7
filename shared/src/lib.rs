//! Shared domain types for the store backend
//!
//! Entities, status enums and input payloads used across crates:
//! carts, orders, payments, catalog snapshots and address snapshots.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
