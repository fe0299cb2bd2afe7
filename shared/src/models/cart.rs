//! Cart Model
//!
//! Pre-checkout collection of candidate purchase lines. A cart belongs to
//! exactly one owner (authenticated user or anonymous guest session) and is
//! deactivated, never deleted, once it converts to an order or is merged
//! away.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cart ownership — exactly one of the two
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartOwner {
    /// Authenticated user id
    User(String),
    /// Anonymous session id
    Guest(String),
}

impl CartOwner {
    /// Stable key for the one-active-cart-per-owner index
    pub fn key(&self) -> String {
        match self {
            CartOwner::User(id) => format!("user:{id}"),
            CartOwner::Guest(id) => format!("guest:{id}"),
        }
    }

    /// User id if this is an authenticated owner
    pub fn user_id(&self) -> Option<&str> {
        match self {
            CartOwner::User(id) => Some(id),
            CartOwner::Guest(_) => None,
        }
    }
}

/// One cart line; quantity >= 1, unit price captured at add-time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    /// Product name snapshot for display
    pub name: String,
    /// Unit price captured when the line was added
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Cart entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub owner: CartOwner,
    /// Deactivated carts are kept for history, never deleted
    pub is_active: bool,
    pub items: Vec<CartItem>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Cart {
    /// Sum of line totals at captured prices (advisory; the order engine
    /// re-reads authoritative prices at create time)
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn item(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }
}

/// Why a cart line cannot be checked out right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartIssue {
    /// Product no longer exists in the catalog
    ProductMissing,
    /// Product exists but is not sellable
    NotSellable,
    /// Requested quantity exceeds available stock
    InsufficientStock { requested: i32, available: i64 },
}

/// Availability problem reported by `check_availability`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityIssue {
    pub product_id: String,
    pub issue: CartIssue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_key_disambiguates() {
        let user = CartOwner::User("42".into());
        let guest = CartOwner::Guest("42".into());
        assert_ne!(user.key(), guest.key());
        assert_eq!(user.user_id(), Some("42"));
        assert_eq!(guest.user_id(), None);
    }

    #[test]
    fn test_cart_subtotal() {
        let cart = Cart {
            id: "c1".into(),
            owner: CartOwner::Guest("s1".into()),
            is_active: true,
            items: vec![
                CartItem {
                    product_id: "a".into(),
                    name: "A".into(),
                    unit_price: Decimal::new(10050, 2),
                    quantity: 2,
                },
                CartItem {
                    product_id: "b".into(),
                    name: "B".into(),
                    unit_price: Decimal::new(4999, 2),
                    quantity: 1,
                },
            ],
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(cart.subtotal(), Decimal::new(25099, 2));
    }
}
