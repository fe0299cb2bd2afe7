//! Product Model
//!
//! Catalog snapshot consumed by the order engine and cart store. The live
//! catalog (browsing, editing) is an external collaborator; the core only
//! reads price, stock and sellable status by id.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity as seen by the checkout core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    /// Current unit price in currency units
    pub price: Decimal,
    /// Available stock; never negative
    pub stock_quantity: i64,
    /// Whether the product is currently sellable
    pub is_active: bool,
    /// Per-product low-stock threshold (overrides the store default)
    pub low_stock_threshold: Option<i64>,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        sku: impl Into<String>,
        price: Decimal,
        stock_quantity: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sku: sku.into(),
            price,
            stock_quantity,
            is_active: true,
            low_stock_threshold: None,
        }
    }
}
