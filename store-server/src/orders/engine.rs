//! Order engine
//!
//! Owns order creation, the status state machines and refunds. `create`
//! and `process_refund` are the two multi-step atomic operations: the
//! ledger's conditional batch decrement is the authoritative gate under
//! contention, and a failed persist compensates the stock change before
//! the error is surfaced, so callers never observe stock decremented
//! without an order (or the reverse).

use crate::audit::{AuditAction, AuditService};
use crate::catalog::{Catalog, CatalogError};
use crate::config::StoreConfig;
use crate::events::OrderEvent;
use crate::inventory::{InventoryError, InventoryLedger};
use crate::notify::Notifier;
use crate::orders::money::{self, compute_totals, round_money};
use crate::orders::number::generate_order_number;
use crate::orders::status::{can_transition, can_transition_payment};
use crate::storage::{OrderStore, PaymentStore, StorageError};
use rust_decimal::Decimal;
use serde_json::json;
use shared::models::{
    CreateOrderRequest, Order, OrderFilter, OrderItem, OrderStatus, PaymentState, PaymentStatus,
};
use shared::util::now_millis;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};

/// Order engine errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("invalid payment state transition: {from:?} -> {to:?}")]
    InvalidPaymentTransition { from: PaymentState, to: PaymentState },

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("refund {requested} exceeds refundable amount {limit}")]
    RefundExceedsAmount { requested: Decimal, limit: Decimal },

    #[error("refund requires a paid order, payment state is {0:?}")]
    RefundRequiresPaid(PaymentState),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Inventory(InventoryError),
}

impl From<InventoryError> for OrderError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::InsufficientStock {
                product_id,
                requested,
                available,
            } => OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            other => OrderError::Inventory(other),
        }
    }
}

/// The transactional core of the store
pub struct OrderEngine {
    pub(crate) config: StoreConfig,
    catalog: Arc<dyn Catalog>,
    ledger: Arc<dyn InventoryLedger>,
    pub(crate) orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentStore>,
    audit: Arc<AuditService>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<OrderEvent>,
    /// Serializes the read-modify-write sections. Held only across local
    /// state, never across gateway I/O.
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for OrderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderEngine").finish_non_exhaustive()
    }
}

impl OrderEngine {
    pub fn new(
        config: StoreConfig,
        catalog: Arc<dyn Catalog>,
        ledger: Arc<dyn InventoryLedger>,
        orders: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentStore>,
        audit: Arc<AuditService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            config,
            catalog,
            ledger,
            orders,
            payments,
            audit,
            notifier,
            events,
            write_lock: Mutex::new(()),
        }
    }

    /// Subscribe to order lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create an order from validated line requests.
    ///
    /// Re-reads price/name/sku and stock from the catalog for every line,
    /// rejects the whole request if any single line is uncoverable (no
    /// partial orders), then decrements the ledger, persists the order and
    /// writes the audit entry as one unit. On a persist failure the stock
    /// decrement is compensated before the error is returned.
    pub async fn create(&self, req: CreateOrderRequest) -> Result<Order, OrderError> {
        if req.items.is_empty() {
            return Err(OrderError::Validation(
                "order must contain at least one item".into(),
            ));
        }
        for line in &req.items {
            money::validate_order_line(line)?;
        }

        let _guard = self.write_lock.lock().await;

        // Authoritative snapshot pass: current price, name, sku and stock.
        let mut items: Vec<OrderItem> = Vec::with_capacity(req.items.len());
        let mut stock_lines: Vec<(String, i64)> = Vec::with_capacity(req.items.len());
        for line in &req.items {
            let product = self
                .catalog
                .product(&line.product_id)
                .await?
                .ok_or_else(|| OrderError::ProductNotFound(line.product_id.clone()))?;
            if !product.is_active {
                return Err(OrderError::Validation(format!(
                    "product {} is not sellable",
                    product.id
                )));
            }
            money::validate_price(&product.id, product.price)?;
            if product.stock_quantity < i64::from(line.quantity) {
                return Err(OrderError::InsufficientStock {
                    product_id: product.id,
                    requested: i64::from(line.quantity),
                    available: product.stock_quantity,
                });
            }
            items.push(OrderItem::new(
                product.id.clone(),
                product.name,
                product.sku,
                round_money(product.price),
                line.quantity,
            ));
            stock_lines.push((product.id, i64::from(line.quantity)));
        }

        let totals = compute_totals(&items, req.discount_amount, &self.config)?;

        // Conditional decrement: under contention the ledger, not the
        // snapshot pass above, decides who wins.
        self.ledger.decrement_all(&stock_lines).await?;

        let now = now_millis();
        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            order_number: generate_order_number(now),
            user_id: req.user_id,
            status: OrderStatus::Pending,
            payment_state: PaymentState::Pending,
            subtotal: totals.subtotal,
            shipping_cost: totals.shipping_cost,
            tax_amount: totals.tax_amount,
            discount_amount: totals.discount_amount,
            total_amount: totals.total_amount,
            refund_amount: None,
            shipping_address: req.shipping_address,
            billing_address: req.billing_address,
            payment_method: req.payment_method,
            tracking_number: None,
            note: req.note,
            items,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.orders.insert(order.clone()).await {
            // Roll the reserved stock back; the order does not exist.
            self.restore_stock(&order).await;
            return Err(e.into());
        }

        let actor = order
            .user_id
            .as_deref()
            .map_or_else(|| "guest".to_string(), |id| format!("user:{id}"));
        self.audit.log(
            AuditAction::OrderCreated,
            actor,
            format!("order {} created", order.order_number),
            json!({
                "order_id": order.id,
                "order_number": order.order_number,
                "total_amount": order.total_amount,
                "item_count": order.items.len(),
            }),
        );
        let _ = self.events.send(OrderEvent::Created {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            total_amount: order.total_amount,
        });
        self.dispatch_order_created(&order);

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            "order created"
        );
        Ok(order)
    }

    // =========================================================================
    // Status transitions
    // =========================================================================

    /// Validated fulfilment-status transition. Cancellation returns the
    /// reserved stock to the ledger.
    pub async fn update_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let _guard = self.write_lock.lock().await;
        let mut order = self.load(order_id).await?;
        let from = order.status;
        if !can_transition(from, new_status) {
            return Err(OrderError::InvalidStatusTransition {
                from,
                to: new_status,
            });
        }

        if new_status == OrderStatus::Cancelled {
            // The order's stock was never consumed; put it back.
            self.restore_stock(&order).await;
        }

        order.status = new_status;
        order.updated_at = now_millis();
        self.orders.update(order.clone()).await?;

        self.audit.log(
            AuditAction::OrderStatusChanged,
            "system",
            format!("order {} {from:?} -> {new_status:?}", order.order_number),
            json!({"order_id": order.id, "from": from, "to": new_status}),
        );
        let _ = self.events.send(OrderEvent::StatusChanged {
            order_id: order.id.clone(),
            from,
            to: new_status,
        });
        Ok(order)
    }

    /// Validated payment-state transition
    pub async fn update_payment_state(
        &self,
        order_id: &str,
        new_state: PaymentState,
    ) -> Result<Order, OrderError> {
        let _guard = self.write_lock.lock().await;
        let mut order = self.load(order_id).await?;
        let from = order.payment_state;
        if !can_transition_payment(from, new_state) {
            return Err(OrderError::InvalidPaymentTransition {
                from,
                to: new_state,
            });
        }

        order.payment_state = new_state;
        order.updated_at = now_millis();
        self.orders.update(order.clone()).await?;

        self.audit.log(
            AuditAction::OrderPaymentStateChanged,
            "system",
            format!(
                "order {} payment {from:?} -> {new_state:?}",
                order.order_number
            ),
            json!({"order_id": order.id, "from": from, "to": new_state}),
        );
        let _ = self.events.send(OrderEvent::PaymentStateChanged {
            order_id: order.id.clone(),
            from,
            to: new_state,
        });
        Ok(order)
    }

    /// Attach a carrier tracking number
    pub async fn add_tracking(
        &self,
        order_id: &str,
        tracking_number: impl Into<String>,
    ) -> Result<Order, OrderError> {
        let _guard = self.write_lock.lock().await;
        let mut order = self.load(order_id).await?;
        if matches!(
            order.status,
            OrderStatus::Cancelled | OrderStatus::Refunded
        ) {
            return Err(OrderError::Validation(format!(
                "cannot attach tracking to a {:?} order",
                order.status
            )));
        }
        order.tracking_number = Some(tracking_number.into());
        order.updated_at = now_millis();
        self.orders.update(order.clone()).await?;
        Ok(order)
    }

    // =========================================================================
    // Refunds
    // =========================================================================

    /// Refund a paid order.
    ///
    /// Defaults to the full remaining amount. A refund completing the full
    /// total restores stock for every line exactly once and moves both
    /// axes to Refunded; a partial refund only marks the payment axis and
    /// accumulates `refund_amount` (goods are not assumed returned).
    /// Refunding an already-cancelled order is money-only: cancellation
    /// returned the stock, so the ledger is not touched again and the
    /// fulfilment axis stays Cancelled.
    pub async fn process_refund(
        &self,
        order_id: &str,
        amount: Option<Decimal>,
        reason: Option<String>,
    ) -> Result<Order, OrderError> {
        let _guard = self.write_lock.lock().await;
        let mut order = self.load(order_id).await?;

        if !matches!(
            order.payment_state,
            PaymentState::Paid | PaymentState::PartiallyRefunded
        ) {
            return Err(OrderError::RefundRequiresPaid(order.payment_state));
        }

        let limit = order.refundable_amount();
        let amount = round_money(amount.unwrap_or(limit));
        if amount <= Decimal::ZERO {
            return Err(OrderError::Validation(
                "refund amount must be positive".into(),
            ));
        }
        if amount > limit {
            return Err(OrderError::RefundExceedsAmount {
                requested: amount,
                limit,
            });
        }

        let refunded_total = order.refund_amount.unwrap_or_default() + amount;
        let full = refunded_total == order.total_amount;
        let payment_from = order.payment_state;
        let status_from = order.status;
        // A cancelled order already had its stock returned; the refund is
        // then money-only and the fulfilment axis stays Cancelled.
        let restores = full && order.status != OrderStatus::Cancelled;

        if full {
            if restores {
                // Stock restoration happens exactly once, on the transition
                // to fully refunded. Partial refunds never restore.
                self.restore_stock(&order).await;
                order.status = OrderStatus::Refunded;
            }
            order.payment_state = PaymentState::Refunded;
        } else {
            order.payment_state = PaymentState::PartiallyRefunded;
        }
        order.refund_amount = Some(refunded_total);
        order.updated_at = now_millis();
        self.orders.update(order.clone()).await?;

        // Fold the refund into the completed payment attempt.
        if let Some(mut payment) = self.completed_payment(&order.id).await? {
            payment.refund_amount = Some(refunded_total);
            payment.refund_reason = reason.clone();
            payment.refunded_at = Some(order.updated_at);
            if full {
                payment.status = PaymentStatus::Refunded;
            }
            payment.updated_at = order.updated_at;
            self.payments.update(payment).await?;
        }

        self.audit.log(
            AuditAction::RefundProcessed,
            "system",
            format!(
                "order {} refunded {amount} ({})",
                order.order_number,
                if full { "full" } else { "partial" }
            ),
            json!({
                "order_id": order.id,
                "amount": amount,
                "refunded_total": refunded_total,
                "full": full,
                "reason": reason,
            }),
        );
        let _ = self.events.send(OrderEvent::RefundProcessed {
            order_id: order.id.clone(),
            amount,
            full,
        });
        if restores {
            let _ = self.events.send(OrderEvent::StatusChanged {
                order_id: order.id.clone(),
                from: status_from,
                to: OrderStatus::Refunded,
            });
        }
        let _ = self.events.send(OrderEvent::PaymentStateChanged {
            order_id: order.id.clone(),
            from: payment_from,
            to: order.payment_state,
        });
        self.dispatch_refund_processed(&order, amount);

        tracing::info!(
            order_id = %order.id,
            amount = %amount,
            full,
            "refund processed"
        );
        Ok(order)
    }

    // =========================================================================
    // Read path
    // =========================================================================

    pub async fn get(&self, order_id: &str) -> Result<Option<Order>, OrderError> {
        Ok(self.orders.get(order_id).await?)
    }

    pub async fn get_by_number(&self, order_number: &str) -> Result<Option<Order>, OrderError> {
        Ok(self.orders.get_by_number(order_number).await?)
    }

    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list(filter).await?)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_user(user_id).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn load(&self, order_id: &str) -> Result<Order, OrderError> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    /// Most recent completed payment attempt for an order, if any
    async fn completed_payment(
        &self,
        order_id: &str,
    ) -> Result<Option<shared::models::Payment>, OrderError> {
        let payments = self.payments.list_for_order(order_id).await?;
        Ok(payments
            .into_iter()
            .rev()
            .find(|p| p.status == PaymentStatus::Completed))
    }

    /// Re-increment the ledger for every order line. Increment failures are
    /// logged, not propagated: a product deleted from the catalog since the
    /// order was placed is a reconciliation concern, not a refund blocker.
    async fn restore_stock(&self, order: &Order) {
        for item in &order.items {
            if let Err(e) = self
                .ledger
                .increment(&item.product_id, i64::from(item.quantity))
                .await
            {
                tracing::warn!(
                    order_id = %order.id,
                    product_id = %item.product_id,
                    "stock restoration skipped: {e}"
                );
            }
        }
    }

    fn dispatch_order_created(&self, order: &Order) {
        let notifier = Arc::clone(&self.notifier);
        let order = order.clone();
        tokio::spawn(async move { notifier.order_created(&order).await });
    }

    fn dispatch_refund_processed(&self, order: &Order, amount: Decimal) {
        let notifier = Arc::clone(&self.notifier);
        let order = order.clone();
        tokio::spawn(async move { notifier.refund_processed(&order, amount).await });
    }
}
