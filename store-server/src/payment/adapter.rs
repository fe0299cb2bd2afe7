//! Payment adapter
//!
//! Builds outbound initiation payloads and reconciles inbound gateway
//! notifications into payment and order state. Reconciliation is
//! idempotent: a payment's status only ever moves forward in progress
//! rank, so redelivering a notification any number of times yields the
//! same final state as delivering it once.

use crate::audit::{AuditAction, AuditService};
use crate::config::StoreConfig;
use crate::orders::engine::{OrderEngine, OrderError};
use crate::orders::money::round_money;
use crate::orders::status::{can_transition, can_transition_payment};
use crate::payment::gateway::{GatewayError, PaymentGateway};
use crate::payment::signature::{sign_initiate, verify_notification};
use crate::storage::{PaymentStore, StorageError};
use rust_decimal::Decimal;
use serde_json::json;
use shared::models::{
    GatewayNotification, InitiatePayload, Order, OrderStatus, Payer, Payment, PaymentState,
    PaymentStatus,
};
use shared::util::now_millis;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Payment adapter errors
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Signature/origin check failed; no field was trusted, nothing mutated
    #[error("notification signature invalid")]
    SignatureInvalid,

    #[error("unknown order reference: {0}")]
    UnknownOrder(String),

    #[error("unrecognized gateway status: {0}")]
    UnknownStatus(String),

    #[error("notification amount {notified} does not match order total {expected}")]
    AmountMismatch { notified: Decimal, expected: Decimal },

    #[error("payment not found: {0}")]
    PaymentNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result of reconciling one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The notification carried new information and was applied
    Applied(PaymentStatus),
    /// Replay or regression; state unchanged (success, not an error)
    Duplicate,
}

/// Fixed two-decimal amount formatting required by the gateway wire format
fn format_amount(amount: Decimal) -> String {
    let mut rounded = round_money(amount);
    rounded.rescale(2);
    rounded.to_string()
}

fn parse_gateway_status(raw: &str) -> Option<PaymentStatus> {
    match raw.to_ascii_uppercase().as_str() {
        "COMPLETE" | "COMPLETED" => Some(PaymentStatus::Completed),
        "FAILED" => Some(PaymentStatus::Failed),
        "CANCELLED" | "CANCELED" => Some(PaymentStatus::Cancelled),
        "PENDING" => Some(PaymentStatus::Pending),
        _ => None,
    }
}

/// Payment adapter service
pub struct PaymentAdapter {
    config: StoreConfig,
    payments: Arc<dyn PaymentStore>,
    engine: Arc<OrderEngine>,
    gateway: Arc<dyn PaymentGateway>,
    audit: Arc<AuditService>,
    /// Serializes reconciliation's read-modify-write. Never held across
    /// gateway I/O.
    reconcile_lock: Mutex<()>,
}

impl std::fmt::Debug for PaymentAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentAdapter").finish_non_exhaustive()
    }
}

impl PaymentAdapter {
    pub fn new(
        config: StoreConfig,
        payments: Arc<dyn PaymentStore>,
        engine: Arc<OrderEngine>,
        gateway: Arc<dyn PaymentGateway>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            config,
            payments,
            engine,
            gateway,
            audit,
            reconcile_lock: Mutex::new(()),
        }
    }

    // =========================================================================
    // Initiation
    // =========================================================================

    /// Build the signed initiation payload for the external checkout UI and
    /// persist a pending payment attempt keyed to the order.
    pub async fn initiate(
        &self,
        order: &Order,
        payer: &Payer,
    ) -> Result<InitiatePayload, PaymentError> {
        if !matches!(
            order.payment_state,
            PaymentState::Pending | PaymentState::Failed
        ) {
            return Err(PaymentError::Validation(format!(
                "order {} is not awaiting payment ({:?})",
                order.order_number, order.payment_state
            )));
        }

        let gateway = &self.config.gateway;
        let mut payload = InitiatePayload {
            merchant_id: gateway.merchant_id.clone(),
            return_url: gateway.return_url.clone(),
            cancel_url: gateway.cancel_url.clone(),
            notify_url: gateway.notify_url.clone(),
            payer_name: payer.name.clone(),
            payer_email: payer.email.clone(),
            order_reference: order.order_number.clone(),
            amount: format_amount(order.total_amount),
            item_description: format!("Order {} ({} items)", order.order_number, order.items.len()),
            signature: String::new(),
        };
        payload.signature = sign_initiate(&payload, &gateway.passphrase);

        let now = now_millis();
        let payment = Payment {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            method: order.payment_method,
            amount: order.total_amount,
            currency: self.config.currency.clone(),
            status: PaymentStatus::Pending,
            transaction_id: None,
            gateway_response: None,
            refund_amount: None,
            refund_reason: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };
        self.payments.insert(payment.clone()).await?;

        self.audit.log(
            AuditAction::PaymentInitiated,
            "system",
            format!("payment initiated for order {}", order.order_number),
            json!({
                "order_id": order.id,
                "payment_id": payment.id,
                "amount": payload.amount,
            }),
        );
        Ok(payload)
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Reconcile one asynchronous gateway notification.
    ///
    /// Verifies authenticity first, then either folds the status into the
    /// existing payment for the transaction id (forward progress only) or
    /// creates the payment row when this callback is the first the system
    /// hears of the attempt. Terminal gateway statuses are mapped onto the
    /// order's payment/fulfilment axes.
    pub async fn reconcile(
        &self,
        notification: &GatewayNotification,
    ) -> Result<ReconcileOutcome, PaymentError> {
        if !verify_notification(notification, &self.config.gateway.passphrase) {
            self.audit.log(
                AuditAction::NotificationRejected,
                "gateway",
                "notification signature invalid",
                json!({"transaction_id": notification.transaction_id}),
            );
            return Err(PaymentError::SignatureInvalid);
        }
        let incoming = parse_gateway_status(&notification.status)
            .ok_or_else(|| PaymentError::UnknownStatus(notification.status.clone()))?;

        let _guard = self.reconcile_lock.lock().await;

        let existing = self
            .payments
            .get_by_transaction(&notification.transaction_id)
            .await?;
        if let Some(existing) = &existing {
            // Replay: apply only if it represents forward progress.
            if incoming.progress_rank() <= existing.status.progress_rank() {
                self.audit.log(
                    AuditAction::NotificationDuplicate,
                    "gateway",
                    format!(
                        "replayed notification for {} ignored ({:?} -> {:?})",
                        notification.transaction_id, existing.status, incoming
                    ),
                    json!({"transaction_id": notification.transaction_id}),
                );
                tracing::info!(
                    txn_id = %notification.transaction_id,
                    "duplicate notification, no-op"
                );
                return Ok(ReconcileOutcome::Duplicate);
            }
        }

        let order = match &existing {
            Some(payment) => self
                .engine
                .get(&payment.order_id)
                .await?
                .ok_or_else(|| PaymentError::UnknownOrder(payment.order_id.clone()))?,
            None => self
                .engine
                .get_by_number(&notification.order_reference)
                .await?
                .ok_or_else(|| {
                    PaymentError::UnknownOrder(notification.order_reference.clone())
                })?,
        };

        // A completed payment must match the order total it settles. Checked
        // before any row is written so a rejection leaves nothing behind.
        if incoming == PaymentStatus::Completed {
            let notified = round_money(notification.amount_gross);
            if notified != order.total_amount {
                return Err(PaymentError::AmountMismatch {
                    notified,
                    expected: order.total_amount,
                });
            }
        }

        let mut payment = match existing {
            Some(payment) => payment,
            None => {
                // First contact for this attempt: adopt the order's open
                // pending attempt or create a row.
                let open_attempt = self
                    .payments
                    .list_for_order(&order.id)
                    .await?
                    .into_iter()
                    .find(|p| p.status == PaymentStatus::Pending && p.transaction_id.is_none());
                match open_attempt {
                    Some(mut p) => {
                        p.transaction_id = Some(notification.transaction_id.clone());
                        p
                    }
                    None => {
                        let now = now_millis();
                        let p = Payment {
                            id: uuid::Uuid::new_v4().to_string(),
                            order_id: order.id.clone(),
                            method: order.payment_method,
                            amount: round_money(notification.amount_gross),
                            currency: self.config.currency.clone(),
                            status: PaymentStatus::Pending,
                            transaction_id: Some(notification.transaction_id.clone()),
                            gateway_response: None,
                            refund_amount: None,
                            refund_reason: None,
                            refunded_at: None,
                            created_at: now,
                            updated_at: now,
                        };
                        self.payments.insert(p.clone()).await?;
                        p
                    }
                }
            }
        };

        payment.status = incoming;
        payment.transaction_id = Some(notification.transaction_id.clone());
        payment.gateway_response = Some(notification.raw.clone());
        payment.updated_at = now_millis();
        self.payments.update(payment.clone()).await?;

        match incoming {
            PaymentStatus::Completed => {
                self.fold_order_state(&order, PaymentState::Paid, Some(OrderStatus::Processing))
                    .await?;
            }
            PaymentStatus::Failed => {
                // Order status unchanged; the shopper may retry.
                self.fold_order_state(&order, PaymentState::Failed, None)
                    .await?;
            }
            PaymentStatus::Cancelled => {
                self.fold_order_state(&order, PaymentState::Failed, Some(OrderStatus::Cancelled))
                    .await?;
            }
            // Pending carries no new order-side information.
            PaymentStatus::Pending | PaymentStatus::Refunded => {}
        }

        self.audit.log(
            AuditAction::PaymentReconciled,
            "gateway",
            format!(
                "transaction {} reconciled to {:?}",
                notification.transaction_id, incoming
            ),
            json!({
                "transaction_id": notification.transaction_id,
                "order_id": order.id,
                "status": incoming,
            }),
        );
        Ok(ReconcileOutcome::Applied(incoming))
    }

    // =========================================================================
    // Refunds
    // =========================================================================

    /// Refund through the gateway, then fold into local state.
    ///
    /// The remote call happens outside any local lock; local state is only
    /// updated after the gateway confirms, so a gateway failure leaves
    /// nothing to undo.
    pub async fn refund(
        &self,
        payment_id: &str,
        amount: Option<Decimal>,
        reason: &str,
    ) -> Result<Order, PaymentError> {
        let payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or_else(|| PaymentError::PaymentNotFound(payment_id.to_string()))?;
        if payment.status != PaymentStatus::Completed {
            return Err(PaymentError::Validation(format!(
                "only completed payments can be refunded, payment is {:?}",
                payment.status
            )));
        }
        let Some(transaction_id) = payment.transaction_id.clone() else {
            return Err(PaymentError::Validation(
                "payment has no gateway transaction id".into(),
            ));
        };

        let order = self
            .engine
            .get(&payment.order_id)
            .await?
            .ok_or_else(|| PaymentError::UnknownOrder(payment.order_id.clone()))?;

        // Validate everything locally before the remote leg so a gateway
        // success is never followed by a local rejection.
        if !matches!(
            order.payment_state,
            PaymentState::Paid | PaymentState::PartiallyRefunded
        ) {
            return Err(PaymentError::Order(OrderError::RefundRequiresPaid(
                order.payment_state,
            )));
        }
        let limit = order.refundable_amount();
        let amount = round_money(amount.unwrap_or(limit));
        if amount <= Decimal::ZERO {
            return Err(PaymentError::Validation(
                "refund amount must be positive".into(),
            ));
        }
        if amount > limit {
            return Err(PaymentError::Order(OrderError::RefundExceedsAmount {
                requested: amount,
                limit,
            }));
        }

        self.gateway.refund(&transaction_id, amount, reason).await?;

        let order = self
            .engine
            .process_refund(&order.id, Some(amount), Some(reason.to_string()))
            .await?;
        Ok(order)
    }
}

impl PaymentAdapter {
    /// Move the order's axes toward the targets, skipping axes that are
    /// already there. A target with no forward path is logged and skipped
    /// rather than surfaced: the payment row has already recorded the
    /// gateway's truth, and replays must stay no-ops.
    async fn fold_order_state(
        &self,
        order: &Order,
        payment_target: PaymentState,
        status_target: Option<OrderStatus>,
    ) -> Result<(), PaymentError> {
        if order.payment_state != payment_target {
            if can_transition_payment(order.payment_state, payment_target) {
                self.engine
                    .update_payment_state(&order.id, payment_target)
                    .await?;
            } else {
                tracing::warn!(
                    order_id = %order.id,
                    from = ?order.payment_state,
                    to = ?payment_target,
                    "no forward path for payment state, skipping"
                );
            }
        }
        if let Some(target) = status_target
            && order.status != target
        {
            if can_transition(order.status, target) {
                self.engine.update_status(&order.id, target).await?;
            } else {
                tracing::warn!(
                    order_id = %order.id,
                    from = ?order.status,
                    to = ?target,
                    "no forward path for order status, skipping"
                );
            }
        }
        Ok(())
    }
}
