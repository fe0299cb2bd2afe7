//! Shared harness for the integration suites: full service graph wired
//! over the in-memory stores, plus a scriptable gateway double.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::json;
use shared::models::{
    AddressSnapshot, CheckoutData, CreateOrderRequest, GatewayNotification, NewOrderItem, Order,
    Payer, PaymentMethod, Product,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use store_server::catalog::MemoryCatalog;
use store_server::payment::gateway::{GatewayError, PaymentGateway};
use store_server::payment::signature::sign_notification;
use store_server::payment::{PaymentAdapter, ReconcileOutcome};
use store_server::storage::{MemoryCartStore, MemoryOrderStore, MemoryPaymentStore};
use store_server::{AuditService, CartService, LogNotifier, OrderEngine, StoreConfig};

/// Recorded refund request
#[derive(Debug, Clone, PartialEq)]
pub struct RefundCall {
    pub transaction_id: String,
    pub amount: Decimal,
    pub reason: String,
}

/// Gateway double: records refund calls, optionally fails the next one
#[derive(Debug, Default)]
pub struct MockGateway {
    pub calls: Mutex<Vec<RefundCall>>,
    fail_next: AtomicBool,
}

impl MockGateway {
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn refund(
        &self,
        transaction_id: &str,
        amount: Decimal,
        reason: &str,
    ) -> Result<(), GatewayError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("connection reset".into()));
        }
        self.calls.lock().push(RefundCall {
            transaction_id: transaction_id.to_string(),
            amount,
            reason: reason.to_string(),
        });
        Ok(())
    }
}

/// Fully wired service graph over the in-memory stores
pub struct Harness {
    pub config: StoreConfig,
    pub catalog: Arc<MemoryCatalog>,
    pub carts: Arc<MemoryCartStore>,
    pub orders: Arc<MemoryOrderStore>,
    pub payments: Arc<MemoryPaymentStore>,
    pub audit: Arc<AuditService>,
    pub engine: Arc<OrderEngine>,
    pub cart_service: CartService,
    pub adapter: PaymentAdapter,
    pub gateway: Arc<MockGateway>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let config = StoreConfig::default();
        let catalog = Arc::new(MemoryCatalog::new(config.low_stock_threshold));
        let carts = Arc::new(MemoryCartStore::new());
        let orders = Arc::new(MemoryOrderStore::new());
        let payments = Arc::new(MemoryPaymentStore::new());
        let audit = AuditService::spawn(256);
        let gateway = Arc::new(MockGateway::default());

        let engine = Arc::new(OrderEngine::new(
            config.clone(),
            catalog.clone(),
            catalog.clone(),
            orders.clone(),
            payments.clone(),
            audit.clone(),
            Arc::new(LogNotifier),
        ));
        let cart_service =
            CartService::new(carts.clone(), catalog.clone(), engine.clone(), audit.clone());
        let adapter = PaymentAdapter::new(
            config.clone(),
            payments.clone(),
            engine.clone(),
            gateway.clone(),
            audit.clone(),
        );

        Self {
            config,
            catalog,
            carts,
            orders,
            payments,
            audit,
            engine,
            cart_service,
            adapter,
            gateway,
        }
    }

    /// Place an order directly through the engine
    pub async fn place_order(&self, items: &[(&str, i32)]) -> Order {
        self.engine
            .create(order_request(items))
            .await
            .expect("order creation failed")
    }

    /// Drive an order to Paid/Processing through a COMPLETE notification
    pub async fn pay(&self, order: &Order, transaction_id: &str) -> Order {
        self.adapter
            .initiate(order, &payer())
            .await
            .expect("initiate failed");
        let notification = self.notification(
            &order.order_number,
            transaction_id,
            order.total_amount,
            "COMPLETE",
        );
        let outcome = self
            .adapter
            .reconcile(&notification)
            .await
            .expect("reconcile failed");
        assert!(matches!(outcome, ReconcileOutcome::Applied(_)));
        self.engine
            .get(&order.id)
            .await
            .expect("load failed")
            .expect("order vanished")
    }

    /// A correctly signed notification for the configured passphrase
    pub fn notification(
        &self,
        order_number: &str,
        transaction_id: &str,
        amount: Decimal,
        status: &str,
    ) -> GatewayNotification {
        let amount_str = format!("{amount:.2}");
        let signature = sign_notification(
            order_number,
            transaction_id,
            &amount_str,
            status,
            &self.config.gateway.passphrase,
        );
        GatewayNotification {
            order_reference: order_number.to_string(),
            transaction_id: transaction_id.to_string(),
            amount_gross: amount,
            status: status.to_string(),
            signature,
            raw: json!({
                "m_payment_id": order_number,
                "pf_payment_id": transaction_id,
                "amount_gross": amount_str,
                "payment_status": status,
            }),
        }
    }
}

pub fn product(id: &str, price: i64, stock: i64) -> Product {
    Product::new(id, format!("Product {id}"), format!("SKU-{id}"), Decimal::from(price), stock)
}

pub fn address() -> AddressSnapshot {
    AddressSnapshot {
        recipient: "Ada Example".into(),
        phone: "+27 21 555 0100".into(),
        line1: "1 Long Street".into(),
        line2: None,
        city: "Cape Town".into(),
        postal_code: "8001".into(),
        country: "ZA".into(),
    }
}

pub fn payer() -> Payer {
    Payer {
        name: "Ada Example".into(),
        email: "ada@example.com".into(),
    }
}

pub fn checkout() -> CheckoutData {
    CheckoutData {
        shipping_address: address(),
        billing_address: address(),
        payment_method: PaymentMethod::Card,
        note: None,
    }
}

pub fn order_request(items: &[(&str, i32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        user_id: Some("u1".into()),
        items: items
            .iter()
            .map(|(id, qty)| NewOrderItem {
                product_id: id.to_string(),
                quantity: *qty,
            })
            .collect(),
        shipping_address: address(),
        billing_address: address(),
        payment_method: PaymentMethod::Card,
        discount_amount: Decimal::ZERO,
        note: None,
    }
}

/// Let spawned background tasks (audit worker, notifier dispatch) catch up
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
}
