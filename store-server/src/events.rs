//! Order lifecycle events
//!
//! The engine broadcasts every lifecycle change to interested subscribers
//! (notification dispatch, reporting projections, websocket push). Lagging
//! or absent subscribers never block the transactional path.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{OrderStatus, PaymentState};

/// Broadcast event emitted by the order engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    Created {
        order_id: String,
        order_number: String,
        total_amount: Decimal,
    },
    StatusChanged {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },
    PaymentStateChanged {
        order_id: String,
        from: PaymentState,
        to: PaymentState,
    },
    RefundProcessed {
        order_id: String,
        amount: Decimal,
        full: bool,
    },
}
