//! Payment Adapter
//!
//! Outbound payment initiation and inbound notification reconciliation:
//!
//! - **signature**: checksum signing/verification over the gateway's
//!   documented field order
//! - **gateway**: outbound refund API client with a bounded timeout
//! - **adapter**: initiation payload building and the idempotent,
//!   forward-progress-only reconciliation of asynchronous callbacks
//!
//! Gateway notifications arrive at least once, possibly duplicated or out
//! of order; `reconcile` folds them into payment and order state so that
//! redelivery is always a no-op.

pub mod adapter;
pub mod gateway;
pub mod signature;

// Re-exports
pub use adapter::{PaymentAdapter, PaymentError, ReconcileOutcome};
pub use gateway::{GatewayError, HttpGateway, PaymentGateway};
pub use signature::{sign_initiate, sign_notification, verify_notification};
