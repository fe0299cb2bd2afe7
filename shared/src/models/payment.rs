//! Payment Model
//!
//! One order may carry several payment attempts (retries). A payment row is
//! keyed to its order and, once the gateway assigns one, to a unique
//! external transaction id. The raw gateway response is stored verbatim for
//! audit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the shopper pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Card,
    Eft,
    Wallet,
    CashOnDelivery,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentMethod::Card => "CARD",
            PaymentMethod::Eft => "EFT",
            PaymentMethod::Wallet => "WALLET",
            PaymentMethod::CashOnDelivery => "CASH_ON_DELIVERY",
        };
        write!(f, "{s}")
    }
}

/// Payment attempt status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    /// Terminal statuses never regress; a notification reporting a terminal
    /// status for an already-terminal payment is a replay no-op.
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// Progress rank for the forward-progress-only reconciliation rule:
    /// an update applies only if it strictly increases the rank.
    pub fn progress_rank(self) -> u8 {
        match self {
            PaymentStatus::Pending => 0,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Cancelled => 1,
            // Refunded is reached through the refund flow, never from a
            // gateway notification, and outranks everything.
            PaymentStatus::Refunded => 2,
        }
    }
}

/// Payment attempt entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub method: PaymentMethod,
    pub amount: Decimal,
    /// ISO 4217 code, e.g. "EUR"
    pub currency: String,
    pub status: PaymentStatus,
    /// Gateway-assigned id; unique when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Verbatim gateway response snapshot for audit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_response: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Payer identity forwarded to the gateway at initiation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payer {
    pub name: String,
    pub email: String,
}

/// Inbound asynchronous gateway callback.
///
/// Delivered at least once, possibly duplicated, possibly out of order.
/// No field is trusted until the signature verifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayNotification {
    /// Order number the gateway echoes back
    pub order_reference: String,
    /// Gateway-assigned transaction id
    pub transaction_id: String,
    /// Gross amount reported by the gateway
    pub amount_gross: Decimal,
    /// Raw gateway status string ("COMPLETE", "FAILED", "CANCELLED", ...)
    pub status: String,
    /// Authenticity token over the fields above
    pub signature: String,
    /// Verbatim notification body, persisted for audit
    pub raw: serde_json::Value,
}

/// Outbound payment-initiation payload handed to the external checkout UI.
///
/// Field set and ordering follow the gateway's documented canonicalization;
/// the signature is computed over the fields in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePayload {
    pub merchant_id: String,
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
    pub payer_name: String,
    pub payer_email: String,
    /// Order number; echoed back in notifications as `order_reference`
    pub order_reference: String,
    /// Fixed two-decimal formatting, e.g. "337.50"
    pub amount: String,
    pub item_description: String,
    pub signature: String,
}
