//! Catalog collaborator interface
//!
//! The live product catalog (browsing, editing) is external to this core;
//! the checkout path only needs price/name/sku/stock/sellable lookups by id.
//! [`MemoryCatalog`] doubles as the backing store for the inventory ledger,
//! so the conditional stock writes and the catalog reads observe the same
//! counters.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::models::Product;
use std::collections::HashMap;
use thiserror::Error;

/// Catalog lookup errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only product lookup consumed by the cart store and order engine
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Current product snapshot, `None` if the id is unknown
    async fn product(&self, product_id: &str) -> Result<Option<Product>, CatalogError>;
}

/// In-memory catalog + stock counters behind a single lock.
///
/// The inventory ledger implementation (see `inventory`) takes the write
/// lock for the whole conditional batch decrement, which is what makes
/// concurrent checkouts unable to claim the same unit of stock.
pub struct MemoryCatalog {
    pub(crate) products: RwLock<HashMap<String, Product>>,
    pub(crate) default_low_stock_threshold: i64,
}

impl std::fmt::Debug for MemoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCatalog")
            .field("products", &self.products.read().len())
            .finish_non_exhaustive()
    }
}

impl MemoryCatalog {
    pub fn new(default_low_stock_threshold: i64) -> Self {
        Self {
            products: RwLock::new(HashMap::new()),
            default_low_stock_threshold,
        }
    }

    /// Insert or replace a product (test/setup path; catalog editing is an
    /// external concern)
    pub fn upsert(&self, product: Product) {
        self.products.write().insert(product.id.clone(), product);
    }

    pub fn remove(&self, product_id: &str) {
        self.products.write().remove(product_id);
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn product(&self, product_id: &str) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.read().get(product_id).cloned())
    }
}
