//! Status state machines
//!
//! Both axes are validated here, centrally, instead of at call sites.
//! Fulfilment: `Pending → Processing → Shipped → Delivered`, with
//! cancellation only before shipping and refund only after payment.
//! Payment: `Pending → Paid | Failed`, `Failed → Paid` (retry),
//! `Paid → PartiallyRefunded → ... → Refunded`.

use shared::models::{OrderStatus, PaymentState};

/// Whether a fulfilment-status transition is allowed
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match (from, to) {
        (Pending, Processing) => true,
        (Processing, Shipped) => true,
        (Shipped, Delivered) => true,
        // Only not-yet-shipped orders can be cancelled
        (Pending | Processing, Cancelled) => true,
        // Refunded is reached through process_refund, which additionally
        // requires the payment axis to be Paid
        (Pending | Processing | Shipped | Delivered, Refunded) => true,
        _ => false,
    }
}

/// Whether a payment-state transition is allowed
pub fn can_transition_payment(from: PaymentState, to: PaymentState) -> bool {
    use PaymentState::*;
    match (from, to) {
        (Pending, Paid | Failed) => true,
        // A failed attempt may be retried and succeed
        (Failed, Paid) => true,
        (Paid, PartiallyRefunded | Refunded) => true,
        // Several partial refunds may stack before the final full one
        (PartiallyRefunded, PartiallyRefunded | Refunded) => true,
        _ => false,
    }
}
