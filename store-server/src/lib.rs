//! Store backend core
//!
//! Checkout and payment-reconciliation engine for a small online store:
//!
//! - **inventory**: atomic stock ledger with a non-negative invariant
//! - **cart**: pre-checkout line items, guest/user ownership, merge on login
//! - **orders**: immutable order records, status state machine, refunds
//! - **payment**: outbound initiation and idempotent inbound reconciliation
//!
//! # Data Flow
//!
//! ```text
//! CartService → OrderEngine::create (atomic: stock check + decrement +
//!     persist + audit + event) → PaymentAdapter::initiate → gateway
//!     → PaymentAdapter::reconcile(notification) → OrderEngine state fold
//!     → (optional) PaymentAdapter::refund → stock restoration
//! ```
//!
//! Storage is an injected trait per component; the in-memory implementations
//! in [`storage`] back the unit and integration tests.

pub mod audit;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod events;
pub mod inventory;
pub mod notify;
pub mod orders;
pub mod payment;
pub mod storage;

// Re-exports
pub use audit::{AuditAction, AuditEntry, AuditService};
pub use cart::{CartError, CartService, CheckoutResult};
pub use catalog::{Catalog, CatalogError, MemoryCatalog};
pub use config::{GatewayConfig, StoreConfig};
pub use events::OrderEvent;
pub use inventory::{InventoryError, InventoryLedger};
pub use notify::{LogNotifier, Notifier};
pub use orders::{OrderEngine, OrderError};
pub use payment::{PaymentAdapter, PaymentError, PaymentGateway, ReconcileOutcome};
