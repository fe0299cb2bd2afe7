//! Notification collaborator interface
//!
//! Order/refund confirmations are fire-and-forget: the engine spawns the
//! dispatch and never lets a delivery failure affect order state. The real
//! implementation (email, push) lives outside this core.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::Order;

/// Fire-and-forget confirmation dispatch
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_created(&self, order: &Order);
    async fn refund_processed(&self, order: &Order, amount: Decimal);
}

/// Default implementation that only traces
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_created(&self, order: &Order) {
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            "order confirmation dispatched"
        );
    }

    async fn refund_processed(&self, order: &Order, amount: Decimal) {
        tracing::info!(
            order_id = %order.id,
            amount = %amount,
            "refund confirmation dispatched"
        );
    }
}
