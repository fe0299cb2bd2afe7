//! Inventory Ledger
//!
//! Per-product stock counters with a hard non-negative invariant. The
//! decrement is conditional (succeeds only while stock covers the request),
//! so two concurrent checkouts can never both claim the same unit of stock.
//! Increments are unconditional: over-restoration is caught by reconciling
//! against order history, not by the ledger.

use crate::catalog::MemoryCatalog;
use async_trait::async_trait;
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    #[error("unknown product: {0}")]
    UnknownProduct(String),
}

/// Atomic stock mutation interface injected into the order engine
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Conditional single-product decrement; fails without mutating when
    /// stock does not cover `qty`.
    async fn decrement(&self, product_id: &str, qty: i64) -> Result<(), InventoryError>;

    /// All-or-nothing batch decrement executed as one critical section.
    /// Either every line is applied or none is; the first uncoverable line
    /// is reported.
    async fn decrement_all(&self, lines: &[(String, i64)]) -> Result<(), InventoryError>;

    /// Unconditional increment (cancellation / refund restoration)
    async fn increment(&self, product_id: &str, qty: i64) -> Result<(), InventoryError>;

    /// Current stock level
    async fn stock(&self, product_id: &str) -> Result<i64, InventoryError>;

    /// Low-stock check against the per-product threshold, falling back to
    /// the store default
    async fn below_threshold(&self, product_id: &str) -> Result<bool, InventoryError>;
}

#[async_trait]
impl InventoryLedger for MemoryCatalog {
    async fn decrement(&self, product_id: &str, qty: i64) -> Result<(), InventoryError> {
        self.decrement_all(&[(product_id.to_string(), qty)]).await
    }

    async fn decrement_all(&self, lines: &[(String, i64)]) -> Result<(), InventoryError> {
        // Aggregate per product first so a batch naming the same product
        // twice is checked against the combined quantity.
        let mut required: Vec<(&str, i64)> = Vec::with_capacity(lines.len());
        for (product_id, qty) in lines {
            match required.iter_mut().find(|(id, _)| id == product_id) {
                Some((_, total)) => *total += qty,
                None => required.push((product_id, *qty)),
            }
        }

        let mut products = self.products.write();

        // Check every product before touching any counter.
        for (product_id, qty) in &required {
            let product = products
                .get(*product_id)
                .ok_or_else(|| InventoryError::UnknownProduct(product_id.to_string()))?;
            if product.stock_quantity < *qty {
                return Err(InventoryError::InsufficientStock {
                    product_id: product_id.to_string(),
                    requested: *qty,
                    available: product.stock_quantity,
                });
            }
        }

        for (product_id, qty) in &required {
            if let Some(product) = products.get_mut(*product_id) {
                product.stock_quantity -= qty;
            }
        }
        Ok(())
    }

    async fn increment(&self, product_id: &str, qty: i64) -> Result<(), InventoryError> {
        let mut products = self.products.write();
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| InventoryError::UnknownProduct(product_id.to_string()))?;
        product.stock_quantity += qty;
        Ok(())
    }

    async fn stock(&self, product_id: &str) -> Result<i64, InventoryError> {
        self.products
            .read()
            .get(product_id)
            .map(|p| p.stock_quantity)
            .ok_or_else(|| InventoryError::UnknownProduct(product_id.to_string()))
    }

    async fn below_threshold(&self, product_id: &str) -> Result<bool, InventoryError> {
        let products = self.products.read();
        let product = products
            .get(product_id)
            .ok_or_else(|| InventoryError::UnknownProduct(product_id.to_string()))?;
        let threshold = product
            .low_stock_threshold
            .unwrap_or(self.default_low_stock_threshold);
        Ok(product.stock_quantity < threshold)
    }
}
