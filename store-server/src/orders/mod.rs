//! Order Engine
//!
//! The transactional core of the store:
//!
//! - **engine**: atomic order creation, status transitions, refunds
//! - **status**: central transition tables for both status axes
//! - **money**: Decimal rounding, totals computation, input validation
//! - **number**: human-readable order number generation
//! - **stats**: read-only sales aggregation over paid orders
//!
//! `create` and `process_refund` are the only multi-step atomic operations:
//! stock mutation, row writes and the audit entry either all land or none
//! do (a failed persist compensates the stock decrement before returning).

pub mod engine;
pub mod money;
pub mod number;
pub mod stats;
pub mod status;

// Re-exports
pub use engine::{OrderEngine, OrderError};
pub use money::{Totals, compute_totals, round_money};
pub use number::generate_order_number;
