//! Gateway payload signatures
//!
//! The gateway's signing scheme is a checksum over concatenated
//! `key=value` pairs in a documented, fixed order, with the shared
//! passphrase appended last. The field order and encoding below must match
//! the gateway exactly; it is an inherited wire constraint, not a model
//! for new integrations.

use shared::models::{GatewayNotification, InitiatePayload};
use sha2::{Digest, Sha256};

fn checksum(fields: &[(&str, &str)]) -> String {
    let canonical = fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Sign an initiation payload. Field order: merchant_id, return_url,
/// cancel_url, notify_url, name, email, m_payment_id, amount, item_name,
/// passphrase.
pub fn sign_initiate(payload: &InitiatePayload, passphrase: &str) -> String {
    checksum(&[
        ("merchant_id", &payload.merchant_id),
        ("return_url", &payload.return_url),
        ("cancel_url", &payload.cancel_url),
        ("notify_url", &payload.notify_url),
        ("name", &payload.payer_name),
        ("email", &payload.payer_email),
        ("m_payment_id", &payload.order_reference),
        ("amount", &payload.amount),
        ("item_name", &payload.item_description),
        ("passphrase", passphrase),
    ])
}

/// Expected signature of an inbound notification. Field order:
/// m_payment_id, pf_payment_id, amount_gross, payment_status, passphrase.
pub fn sign_notification(
    order_reference: &str,
    transaction_id: &str,
    amount_gross: &str,
    status: &str,
    passphrase: &str,
) -> String {
    checksum(&[
        ("m_payment_id", order_reference),
        ("pf_payment_id", transaction_id),
        ("amount_gross", amount_gross),
        ("payment_status", status),
        ("passphrase", passphrase),
    ])
}

/// Verify a notification's authenticity token. No field of the
/// notification may be trusted before this returns true.
pub fn verify_notification(notification: &GatewayNotification, passphrase: &str) -> bool {
    let expected = sign_notification(
        &notification.order_reference,
        &notification.transaction_id,
        &format!("{:.2}", notification.amount_gross),
        &notification.status,
        passphrase,
    );
    // Both values are hex digests of fixed length; a simple comparison is
    // what the gateway documents.
    expected == notification.signature
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn notification(passphrase: &str) -> GatewayNotification {
        let mut n = GatewayNotification {
            order_reference: "ORD-20260829-AB12".into(),
            transaction_id: "pf-100".into(),
            amount_gross: Decimal::new(33750, 2),
            status: "COMPLETE".into(),
            signature: String::new(),
            raw: json!({}),
        };
        n.signature = sign_notification(
            &n.order_reference,
            &n.transaction_id,
            "337.50",
            &n.status,
            passphrase,
        );
        n
    }

    #[test]
    fn test_roundtrip_verifies() {
        let n = notification("secret");
        assert!(verify_notification(&n, "secret"));
    }

    #[test]
    fn test_wrong_passphrase_rejected() {
        let n = notification("secret");
        assert!(!verify_notification(&n, "other"));
    }

    #[test]
    fn test_tampered_amount_rejected() {
        let mut n = notification("secret");
        n.amount_gross = Decimal::new(1, 2);
        assert!(!verify_notification(&n, "secret"));
    }

    #[test]
    fn test_tampered_status_rejected() {
        let mut n = notification("secret");
        n.status = "FAILED".into();
        assert!(!verify_notification(&n, "secret"));
    }

    #[test]
    fn test_field_order_is_significant() {
        // Swapping two values must change the digest
        let a = sign_notification("x", "y", "1.00", "COMPLETE", "p");
        let b = sign_notification("y", "x", "1.00", "COMPLETE", "p");
        assert_ne!(a, b);
    }
}
