//! Money calculation utilities
//!
//! All monetary arithmetic uses `Decimal` and rounds half-up to two places
//! at computation boundaries. Totals always satisfy
//! `total = subtotal + shipping + tax - discount` by construction.

use crate::config::StoreConfig;
use crate::orders::engine::OrderError;
use rust_decimal::{Decimal, RoundingStrategy};
use shared::models::{NewOrderItem, OrderItem};

/// Rounding: 2 decimal places, half-up
pub const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price (1,000,000 currency units)
const MAX_PRICE: i64 = 1_000_000;
/// Maximum allowed quantity per line
const MAX_QUANTITY: i32 = 9999;

/// Round to currency precision
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Computed money fields of a new order
#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
}

/// Compute order totals from line snapshots.
///
/// Shipping is free at or above the configured threshold, otherwise the
/// flat fee applies. Tax is charged on the subtotal.
pub fn compute_totals(
    items: &[OrderItem],
    discount_amount: Decimal,
    config: &StoreConfig,
) -> Result<Totals, OrderError> {
    let subtotal = round_money(items.iter().map(|i| i.subtotal).sum());

    if discount_amount < Decimal::ZERO {
        return Err(OrderError::Validation(
            "discount must be non-negative".into(),
        ));
    }
    if discount_amount > subtotal {
        return Err(OrderError::Validation(format!(
            "discount {discount_amount} exceeds subtotal {subtotal}"
        )));
    }

    let shipping_cost = if subtotal >= config.free_shipping_threshold {
        Decimal::ZERO
    } else {
        round_money(config.flat_shipping_fee)
    };
    let tax_amount = round_money(subtotal * config.tax_rate);
    let discount_amount = round_money(discount_amount);
    let total_amount = subtotal + shipping_cost + tax_amount - discount_amount;

    Ok(Totals {
        subtotal,
        shipping_cost,
        tax_amount,
        discount_amount,
        total_amount,
    })
}

/// Validate a requested order line before any catalog or stock access
pub fn validate_order_line(item: &NewOrderItem) -> Result<(), OrderError> {
    if item.product_id.trim().is_empty() {
        return Err(OrderError::Validation("product id must not be empty".into()));
    }
    if item.quantity <= 0 {
        return Err(OrderError::Validation(format!(
            "quantity must be positive, got {}",
            item.quantity
        )));
    }
    if item.quantity > MAX_QUANTITY {
        return Err(OrderError::Validation(format!(
            "quantity exceeds maximum allowed ({MAX_QUANTITY}), got {}",
            item.quantity
        )));
    }
    Ok(())
}

/// Validate a catalog price before snapshotting it into an order line
pub fn validate_price(product_id: &str, price: Decimal) -> Result<(), OrderError> {
    if price < Decimal::ZERO {
        return Err(OrderError::Validation(format!(
            "product {product_id} has negative price {price}"
        )));
    }
    if price > Decimal::from(MAX_PRICE) {
        return Err(OrderError::Validation(format!(
            "product {product_id} price exceeds maximum allowed ({MAX_PRICE})"
        )));
    }
    Ok(())
}
