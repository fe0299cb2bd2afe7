//! Address Snapshot
//!
//! Addresses are copied into orders at creation time. Editing an address
//! later must not alter historical orders, so orders never hold a live
//! address reference.

use serde::{Deserialize, Serialize};

/// Immutable address value copied into an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}
