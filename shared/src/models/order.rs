//! Order Model
//!
//! An order is the immutable record of a completed checkout. It is created
//! once, atomically, with its items; afterwards it is mutated only through
//! the defined status and payment-state transitions and never hard-deleted.

use super::address::AddressSnapshot;
use super::payment::PaymentMethod;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fulfilment status axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

/// Payment status axis, independent of fulfilment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    #[default]
    Pending,
    Paid,
    Failed,
    /// Part of the total refunded; goods not returned, stock not restored
    PartiallyRefunded,
    Refunded,
}

/// Order line — snapshot of the product at order time, immutable thereafter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    /// Product name at order time
    pub name: String,
    /// SKU at order time
    pub sku: String,
    /// Unit price at order time
    pub unit_price: Decimal,
    pub quantity: i32,
    /// unit_price * quantity, computed at construction
    pub subtotal: Decimal,
}

impl OrderItem {
    /// Build a line snapshot; subtotal is computed, never trusted from input
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        sku: impl Into<String>,
        unit_price: Decimal,
        quantity: i32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            sku: sku.into(),
            unit_price,
            quantity,
            subtotal: unit_price * Decimal::from(quantity),
        }
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Human-readable unique reference: `ORD-<YYYYMMDD>-<suffix>`
    pub order_number: String,
    /// Owning user; `None` for guest checkouts
    pub user_id: Option<String>,
    pub status: OrderStatus,
    pub payment_state: PaymentState,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    /// subtotal + shipping_cost + tax_amount - discount_amount
    pub total_amount: Decimal,
    /// Cumulative refunded amount; `None` until the first refund
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<Decimal>,
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Amount still refundable (total minus what was already refunded)
    pub fn refundable_amount(&self) -> Decimal {
        self.total_amount - self.refund_amount.unwrap_or_default()
    }
}

/// Requested line for direct order creation; the engine re-reads the
/// authoritative price/name/sku from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: String,
    pub quantity: i32,
}

/// Checkout details captured when a cart converts to an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutData {
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Full input for `OrderEngine::create`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Query filter for the admin/reporting read path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_state: Option<PaymentState>,
    /// Inclusive lower bound on created_at (Unix millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<i64>,
    /// Exclusive upper bound on created_at (Unix millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<i64>,
    /// Matches against order number (substring)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Reporting period for sales aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatsPeriod {
    Day,
    Week,
    Month,
    All,
}

/// Aggregate over paid orders in a period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesStats {
    pub period: StatsPeriod,
    pub order_count: u64,
    pub revenue: Decimal,
    pub items_sold: i64,
    pub average_order_value: Decimal,
}

/// Best-selling product row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularProduct {
    pub product_id: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_item_subtotal_computed() {
        let item = OrderItem::new("p1", "Widget", "W-1", Decimal::new(9999, 2), 3);
        assert_eq!(item.subtotal, Decimal::new(29997, 2));
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        let json = serde_json::to_string(&PaymentState::PartiallyRefunded).unwrap();
        assert_eq!(json, "\"PARTIALLY_REFUNDED\"");
    }
}
