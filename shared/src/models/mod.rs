//! Domain models
//!
//! Typed entities for the checkout and reconciliation core. Monetary fields
//! use `rust_decimal::Decimal`; timestamps are Unix milliseconds.

pub mod address;
pub mod cart;
pub mod order;
pub mod payment;
pub mod product;

// Re-exports
pub use address::AddressSnapshot;
pub use cart::{AvailabilityIssue, Cart, CartIssue, CartItem, CartOwner};
pub use order::{
    CheckoutData, CreateOrderRequest, NewOrderItem, Order, OrderFilter, OrderItem, OrderStatus,
    PaymentState, PopularProduct, SalesStats, StatsPeriod,
};
pub use payment::{
    GatewayNotification, InitiatePayload, Payer, Payment, PaymentMethod, PaymentStatus,
};
pub use product::Product;
