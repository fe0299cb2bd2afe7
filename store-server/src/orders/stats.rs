//! Sales reporting
//!
//! Read-only aggregation over paid orders. Shares the engine's read path;
//! not part of the transactional core.

use crate::orders::engine::{OrderEngine, OrderError};
use crate::orders::money::round_money;
use rust_decimal::Decimal;
use shared::models::{Order, OrderFilter, PaymentState, PopularProduct, SalesStats, StatsPeriod};
use shared::util::now_millis;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn period_start(period: StatsPeriod, now: i64) -> Option<i64> {
    match period {
        StatsPeriod::Day => Some(now - DAY_MS),
        StatsPeriod::Week => Some(now - 7 * DAY_MS),
        StatsPeriod::Month => Some(now - 30 * DAY_MS),
        StatsPeriod::All => None,
    }
}

/// An order counts toward revenue once it has been paid, including orders
/// later refunded (refunds show up in `refund_amount`, not as negative
/// revenue).
fn is_paid(order: &Order) -> bool {
    matches!(
        order.payment_state,
        PaymentState::Paid | PaymentState::PartiallyRefunded | PaymentState::Refunded
    )
}

impl OrderEngine {
    /// Aggregate sales over paid orders in the period
    pub async fn sales_stats(&self, period: StatsPeriod) -> Result<SalesStats, OrderError> {
        let filter = OrderFilter {
            from: period_start(period, now_millis()),
            ..OrderFilter::default()
        };
        let orders = self.orders.list(&filter).await?;

        let mut order_count = 0u64;
        let mut revenue = Decimal::ZERO;
        let mut items_sold = 0i64;
        for order in orders.iter().filter(|o| is_paid(o)) {
            order_count += 1;
            revenue += order.total_amount;
            items_sold += order
                .items
                .iter()
                .map(|i| i64::from(i.quantity))
                .sum::<i64>();
        }

        let average_order_value = if order_count == 0 {
            Decimal::ZERO
        } else {
            round_money(revenue / Decimal::from(order_count))
        };

        Ok(SalesStats {
            period,
            order_count,
            revenue,
            items_sold,
            average_order_value,
        })
    }

    /// Best sellers by quantity across all paid orders
    pub async fn popular_products(&self, limit: usize) -> Result<Vec<PopularProduct>, OrderError> {
        let orders = self.orders.list(&OrderFilter::default()).await?;

        let mut rows: Vec<PopularProduct> = Vec::new();
        for order in orders.iter().filter(|o| is_paid(o)) {
            for item in &order.items {
                match rows.iter_mut().find(|r| r.product_id == item.product_id) {
                    Some(row) => {
                        row.quantity_sold += i64::from(item.quantity);
                        row.revenue += item.subtotal;
                    }
                    None => rows.push(PopularProduct {
                        product_id: item.product_id.clone(),
                        name: item.name.clone(),
                        quantity_sold: i64::from(item.quantity),
                        revenue: item.subtotal,
                    }),
                }
            }
        }

        rows.sort_by(|a, b| b.quantity_sold.cmp(&a.quantity_sold));
        rows.truncate(limit);
        Ok(rows)
    }
}
