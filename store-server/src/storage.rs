//! Storage interfaces and in-memory implementations
//!
//! Each component receives its store as an injected trait object, so unit
//! tests run against the in-memory fakes below and a real deployment can
//! substitute a database-backed implementation without touching the engine
//! code.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::models::{Cart, CartOwner, Order, OrderFilter, Payment};
use thiserror::Error;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),
}

// =============================================================================
// Traits
// =============================================================================

/// Cart persistence
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Insert a new active cart. Fails with `Duplicate` when the owner
    /// already has an active cart (at most one active cart per owner).
    async fn insert(&self, cart: Cart) -> Result<(), StorageError>;

    async fn get(&self, cart_id: &str) -> Result<Option<Cart>, StorageError>;

    async fn active_for_owner(&self, owner: &CartOwner) -> Result<Option<Cart>, StorageError>;

    /// Replace the stored cart. Deactivating a cart releases its owner's
    /// active slot.
    async fn update(&self, cart: Cart) -> Result<(), StorageError>;
}

/// Order persistence
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<(), StorageError>;
    async fn get(&self, order_id: &str) -> Result<Option<Order>, StorageError>;
    async fn get_by_number(&self, order_number: &str) -> Result<Option<Order>, StorageError>;
    async fn update(&self, order: Order) -> Result<(), StorageError>;
    /// Filtered admin/reporting query; results sorted newest first
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, StorageError>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, StorageError>;
}

/// Payment persistence
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, payment: Payment) -> Result<(), StorageError>;
    async fn get(&self, payment_id: &str) -> Result<Option<Payment>, StorageError>;
    /// Lookup by gateway transaction id (unique when present)
    async fn get_by_transaction(&self, txn_id: &str) -> Result<Option<Payment>, StorageError>;
    async fn update(&self, payment: Payment) -> Result<(), StorageError>;
    async fn list_for_order(&self, order_id: &str) -> Result<Vec<Payment>, StorageError>;
}

// =============================================================================
// In-memory implementations
// =============================================================================

/// In-memory cart store
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    carts: DashMap<String, Cart>,
    /// owner key -> active cart id
    active_index: DashMap<String, String>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn insert(&self, cart: Cart) -> Result<(), StorageError> {
        if self.carts.contains_key(&cart.id) {
            return Err(StorageError::Duplicate(format!("cart {}", cart.id)));
        }
        if cart.is_active {
            // Entry API keeps the one-active-cart-per-owner check atomic
            // under racing get_or_create calls.
            match self.active_index.entry(cart.owner.key()) {
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    return Err(StorageError::Duplicate(format!(
                        "active cart for owner {}",
                        cart.owner.key()
                    )));
                }
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(cart.id.clone());
                }
            }
        }
        self.carts.insert(cart.id.clone(), cart);
        Ok(())
    }

    async fn get(&self, cart_id: &str) -> Result<Option<Cart>, StorageError> {
        Ok(self.carts.get(cart_id).map(|c| c.clone()))
    }

    async fn active_for_owner(&self, owner: &CartOwner) -> Result<Option<Cart>, StorageError> {
        let Some(cart_id) = self.active_index.get(&owner.key()).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.carts.get(&cart_id).map(|c| c.clone()))
    }

    async fn update(&self, cart: Cart) -> Result<(), StorageError> {
        if !self.carts.contains_key(&cart.id) {
            return Err(StorageError::NotFound(format!("cart {}", cart.id)));
        }
        if !cart.is_active {
            // Release the owner's active slot only if this cart holds it.
            self.active_index
                .remove_if(&cart.owner.key(), |_, id| id == &cart.id);
        }
        self.carts.insert(cart.id.clone(), cart);
        Ok(())
    }
}

/// In-memory order store
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: DashMap<String, Order>,
    /// order number -> order id
    number_index: DashMap<String, String>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StorageError> {
        if self.orders.contains_key(&order.id) {
            return Err(StorageError::Duplicate(format!("order {}", order.id)));
        }
        if self.number_index.contains_key(&order.order_number) {
            return Err(StorageError::Duplicate(format!(
                "order number {}",
                order.order_number
            )));
        }
        self.number_index
            .insert(order.order_number.clone(), order.id.clone());
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>, StorageError> {
        Ok(self.orders.get(order_id).map(|o| o.clone()))
    }

    async fn get_by_number(&self, order_number: &str) -> Result<Option<Order>, StorageError> {
        let Some(order_id) = self.number_index.get(order_number).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.get(&order_id).await
    }

    async fn update(&self, order: Order) -> Result<(), StorageError> {
        if !self.orders.contains_key(&order.id) {
            return Err(StorageError::NotFound(format!("order {}", order.id)));
        }
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, StorageError> {
        let mut out: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .filter(|o| filter.payment_state.is_none_or(|s| o.payment_state == s))
            .filter(|o| filter.from.is_none_or(|from| o.created_at >= from))
            .filter(|o| filter.to.is_none_or(|to| o.created_at < to))
            .filter(|o| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|term| o.order_number.contains(term))
            })
            .map(|o| o.clone())
            .collect();
        out.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(out)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, StorageError> {
        let mut out: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.user_id.as_deref() == Some(user_id))
            .map(|o| o.clone())
            .collect();
        out.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(out)
    }
}

/// In-memory payment store
#[derive(Debug, Default)]
pub struct MemoryPaymentStore {
    payments: DashMap<String, Payment>,
    /// transaction id -> payment id
    txn_index: DashMap<String, String>,
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_transaction(&self, payment: &Payment) -> Result<(), StorageError> {
        if let Some(txn) = &payment.transaction_id {
            match self.txn_index.entry(txn.clone()) {
                dashmap::mapref::entry::Entry::Occupied(existing) => {
                    if existing.get() != &payment.id {
                        return Err(StorageError::Duplicate(format!("transaction {txn}")));
                    }
                }
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(payment.id.clone());
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<(), StorageError> {
        if self.payments.contains_key(&payment.id) {
            return Err(StorageError::Duplicate(format!("payment {}", payment.id)));
        }
        self.index_transaction(&payment)?;
        self.payments.insert(payment.id.clone(), payment);
        Ok(())
    }

    async fn get(&self, payment_id: &str) -> Result<Option<Payment>, StorageError> {
        Ok(self.payments.get(payment_id).map(|p| p.clone()))
    }

    async fn get_by_transaction(&self, txn_id: &str) -> Result<Option<Payment>, StorageError> {
        let Some(payment_id) = self.txn_index.get(txn_id).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.get(&payment_id).await
    }

    async fn update(&self, payment: Payment) -> Result<(), StorageError> {
        if !self.payments.contains_key(&payment.id) {
            return Err(StorageError::NotFound(format!("payment {}", payment.id)));
        }
        self.index_transaction(&payment)?;
        self.payments.insert(payment.id.clone(), payment);
        Ok(())
    }

    async fn list_for_order(&self, order_id: &str) -> Result<Vec<Payment>, StorageError> {
        let mut out: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .map(|p| p.clone())
            .collect();
        out.sort_by_key(|p| p.created_at);
        Ok(out)
    }
}
