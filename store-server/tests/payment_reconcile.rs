//! Payment lifecycle over the full graph: initiation, notification
//! reconciliation (idempotence, ordering, tampering) and refunds.

mod common;

use common::{Harness, payer, product, settle};
use rust_decimal::Decimal;
use shared::models::{OrderStatus, PaymentState, PaymentStatus};
use store_server::inventory::InventoryLedger;
use store_server::payment::signature::sign_initiate;
use store_server::storage::PaymentStore;
use store_server::{AuditAction, PaymentError, ReconcileOutcome};

#[tokio::test]
async fn test_initiate_builds_signed_payload() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 10));
    let order = h.place_order(&[("p1", 2), ("p1", 1)]).await;

    let payload = h.adapter.initiate(&order, &payer()).await.unwrap();
    assert_eq!(payload.order_reference, order.order_number);
    assert_eq!(payload.amount, format!("{:.2}", order.total_amount));
    assert_eq!(payload.merchant_id, h.config.gateway.merchant_id);
    assert_eq!(
        payload.signature,
        sign_initiate(&payload, &h.config.gateway.passphrase)
    );

    // A pending attempt is on record before the gateway ever calls back
    let attempts = h.payments.list_for_order(&order.id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, PaymentStatus::Pending);
    assert!(attempts[0].transaction_id.is_none());
    assert_eq!(attempts[0].amount, order.total_amount);
}

#[tokio::test]
async fn test_complete_notification_marks_order_paid() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 10));
    let order = h.place_order(&[("p1", 2)]).await;

    let order = h.pay(&order, "txn-1").await;
    assert_eq!(order.payment_state, PaymentState::Paid);
    assert_eq!(order.status, OrderStatus::Processing);

    let payment = h.payments.get_by_transaction("txn-1").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(payment.gateway_response.is_some());
}

#[tokio::test]
async fn test_replayed_notification_is_noop() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 10));
    let order = h.place_order(&[("p1", 2)]).await;
    let order = h.pay(&order, "txn-1").await;

    let replay = h.notification(&order.order_number, "txn-1", order.total_amount, "COMPLETE");
    let outcome = h.adapter.reconcile(&replay).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Duplicate);

    let order = h.engine.get(&order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Paid);
    assert_eq!(order.status, OrderStatus::Processing);

    settle().await;
    let dupes = h.audit.storage().by_action(AuditAction::NotificationDuplicate);
    assert_eq!(dupes.len(), 1);
}

#[tokio::test]
async fn test_late_cancellation_cannot_regress_completed_payment() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 10));
    let order = h.place_order(&[("p1", 2)]).await;
    let order = h.pay(&order, "txn-1").await;

    // Out-of-order delivery: a stale CANCELLED for the settled transaction
    let stale = h.notification(&order.order_number, "txn-1", order.total_amount, "CANCELLED");
    let outcome = h.adapter.reconcile(&stale).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Duplicate);

    let order = h.engine.get(&order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Paid);
    assert_eq!(order.status, OrderStatus::Processing);
    let payment = h.payments.get_by_transaction("txn-1").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn test_tampered_notification_rejected_without_mutation() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 10));
    let order = h.place_order(&[("p1", 2)]).await;
    h.adapter.initiate(&order, &payer()).await.unwrap();

    let mut forged = h.notification(&order.order_number, "txn-1", order.total_amount, "COMPLETE");
    forged.amount_gross = Decimal::ONE;
    let err = h.adapter.reconcile(&forged).await.unwrap_err();
    assert!(matches!(err, PaymentError::SignatureInvalid));

    let order = h.engine.get(&order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Pending);
    assert!(h.payments.get_by_transaction("txn-1").await.unwrap().is_none());

    settle().await;
    let rejected = h.audit.storage().by_action(AuditAction::NotificationRejected);
    assert_eq!(rejected.len(), 1);
}

#[tokio::test]
async fn test_amount_mismatch_rejected() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 10));
    let order = h.place_order(&[("p1", 2)]).await;
    h.adapter.initiate(&order, &payer()).await.unwrap();

    // Correctly signed, but the gross does not cover the order total
    let short = h.notification(&order.order_number, "txn-1", Decimal::from(10), "COMPLETE");
    let err = h.adapter.reconcile(&short).await.unwrap_err();
    assert!(matches!(err, PaymentError::AmountMismatch { .. }));

    let order = h.engine.get(&order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Pending);
    assert_eq!(order.status, OrderStatus::Pending);

    // The rejection left no payment row behind: the transaction id is
    // unknown and the open attempt from initiation is untouched
    assert!(h.payments.get_by_transaction("txn-1").await.unwrap().is_none());
    let attempts = h.payments.list_for_order(&order.id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, PaymentStatus::Pending);
    assert!(attempts[0].transaction_id.is_none());

    // The correct notification still settles the order afterwards
    let good = h.notification(&order.order_number, "txn-1", order.total_amount, "COMPLETE");
    h.adapter.reconcile(&good).await.unwrap();
    let order = h.engine.get(&order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Paid);
}

#[tokio::test]
async fn test_failed_attempt_then_successful_retry() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 10));
    let order = h.place_order(&[("p1", 2)]).await;
    h.adapter.initiate(&order, &payer()).await.unwrap();

    let failed = h.notification(&order.order_number, "txn-1", order.total_amount, "FAILED");
    h.adapter.reconcile(&failed).await.unwrap();
    let order = h.engine.get(&order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Failed);
    assert_eq!(order.status, OrderStatus::Pending);

    // Second attempt under a fresh transaction id settles the order
    h.adapter.initiate(&order, &payer()).await.unwrap();
    let retry = h.notification(&order.order_number, "txn-2", order.total_amount, "COMPLETE");
    h.adapter.reconcile(&retry).await.unwrap();

    let order = h.engine.get(&order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Paid);
    assert_eq!(order.status, OrderStatus::Processing);
    let attempts = h.payments.list_for_order(&order.id).await.unwrap();
    assert_eq!(attempts.len(), 2);
}

#[tokio::test]
async fn test_cancelled_attempt_cancels_pending_order() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 5));
    let order = h.place_order(&[("p1", 3)]).await;
    h.adapter.initiate(&order, &payer()).await.unwrap();

    let cancelled = h.notification(&order.order_number, "txn-1", order.total_amount, "CANCELLED");
    h.adapter.reconcile(&cancelled).await.unwrap();

    let order = h.engine.get(&order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Failed);
    assert_eq!(order.status, OrderStatus::Cancelled);
    // Cancellation returned the reservation
    assert_eq!(h.catalog.stock("p1").await.unwrap(), 5);
}

#[tokio::test]
async fn test_full_refund_restores_stock_exactly_once() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 5));
    let order = h.place_order(&[("p1", 3)]).await;
    let order = h.pay(&order, "txn-1").await;
    assert_eq!(h.catalog.stock("p1").await.unwrap(), 2);

    let payment = h.payments.get_by_transaction("txn-1").await.unwrap().unwrap();
    let refunded = h
        .adapter
        .refund(&payment.id, None, "customer return")
        .await
        .unwrap();
    assert_eq!(refunded.status, OrderStatus::Refunded);
    assert_eq!(refunded.payment_state, PaymentState::Refunded);
    assert_eq!(refunded.refund_amount, Some(order.total_amount));
    assert_eq!(h.catalog.stock("p1").await.unwrap(), 5);

    let calls = h.gateway.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].transaction_id, "txn-1");
    assert_eq!(calls[0].amount, order.total_amount);

    // Refunding again is rejected and must not touch stock
    let err = h
        .adapter
        .refund(&payment.id, None, "again")
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));
    assert_eq!(h.catalog.stock("p1").await.unwrap(), 5);
    assert_eq!(h.gateway.calls.lock().len(), 1);
}

#[tokio::test]
async fn test_partial_refunds_accumulate_without_stock_restore() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 5));
    let order = h.place_order(&[("p1", 3)]).await;
    let order = h.pay(&order, "txn-1").await;
    let payment = h.payments.get_by_transaction("txn-1").await.unwrap().unwrap();

    let partial = h
        .adapter
        .refund(&payment.id, Some(Decimal::from(100)), "damaged item")
        .await
        .unwrap();
    assert_eq!(partial.payment_state, PaymentState::PartiallyRefunded);
    assert_eq!(partial.status, OrderStatus::Processing);
    assert_eq!(partial.refund_amount, Some(Decimal::from(100)));
    // Goods not assumed returned
    assert_eq!(h.catalog.stock("p1").await.unwrap(), 2);

    // A partial exceeding the remainder is rejected
    let err = h
        .adapter
        .refund(&payment.id, Some(order.total_amount), "too much")
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Order(_)));

    // The remainder completes the refund and restores stock
    let remainder = order.total_amount - Decimal::from(100);
    let full = h
        .adapter
        .refund(&payment.id, Some(remainder), "order unwound")
        .await
        .unwrap();
    assert_eq!(full.payment_state, PaymentState::Refunded);
    assert_eq!(full.status, OrderStatus::Refunded);
    assert_eq!(full.refund_amount, Some(order.total_amount));
    assert_eq!(h.catalog.stock("p1").await.unwrap(), 5);
}

#[tokio::test]
async fn test_refund_after_cancellation_is_money_only() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 5));
    let order = h.place_order(&[("p1", 3)]).await;
    let order = h.pay(&order, "txn-1").await;
    assert_eq!(h.catalog.stock("p1").await.unwrap(), 2);

    // Cancellation returns the reservation while the order is still paid
    let order = h
        .engine
        .update_status(&order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(order.payment_state, PaymentState::Paid);
    assert_eq!(h.catalog.stock("p1").await.unwrap(), 5);

    // The full refund settles the money without touching the ledger again
    let payment = h.payments.get_by_transaction("txn-1").await.unwrap().unwrap();
    let refunded = h
        .adapter
        .refund(&payment.id, None, "cancelled before shipping")
        .await
        .unwrap();
    assert_eq!(refunded.payment_state, PaymentState::Refunded);
    assert_eq!(refunded.status, OrderStatus::Cancelled);
    assert_eq!(refunded.refund_amount, Some(order.total_amount));
    assert_eq!(h.catalog.stock("p1").await.unwrap(), 5);
}

#[tokio::test]
async fn test_gateway_failure_leaves_local_state_untouched() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 5));
    let order = h.place_order(&[("p1", 3)]).await;
    let order = h.pay(&order, "txn-1").await;
    let payment = h.payments.get_by_transaction("txn-1").await.unwrap().unwrap();

    h.gateway.fail_next();
    let err = h
        .adapter
        .refund(&payment.id, None, "customer return")
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Gateway(_)));

    let order = h.engine.get(&order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_state, PaymentState::Paid);
    assert_eq!(order.refund_amount, None);
    assert_eq!(h.catalog.stock("p1").await.unwrap(), 2);

    // The retry goes through
    let refunded = h
        .adapter
        .refund(&payment.id, None, "customer return")
        .await
        .unwrap();
    assert_eq!(refunded.payment_state, PaymentState::Refunded);
}

#[tokio::test]
async fn test_refund_requires_settled_payment() {
    let h = Harness::new();
    h.catalog.upsert(product("p1", 100, 5));
    let order = h.place_order(&[("p1", 1)]).await;
    h.adapter.initiate(&order, &payer()).await.unwrap();

    let attempts = h.payments.list_for_order(&order.id).await.unwrap();
    let err = h
        .adapter
        .refund(&attempts[0].id, None, "premature")
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));
    assert!(h.gateway.calls.lock().is_empty());
}

#[tokio::test]
async fn test_unknown_order_reference_rejected() {
    let h = Harness::new();

    let n = h.notification("ORD-20260101-UNKNOWN", "txn-9", Decimal::from(10), "COMPLETE");
    let err = h.adapter.reconcile(&n).await.unwrap_err();
    assert!(matches!(err, PaymentError::UnknownOrder(_)));
}
