//! Outbound gateway client
//!
//! Only the refund leg talks to the gateway from the backend; payment
//! initiation hands a signed payload to the checkout UI and the gateway
//! calls back asynchronously. Remote calls are bounded by the configured
//! timeout and are retry-safe on the gateway side (idempotent via the
//! transaction reference).

use crate::config::GatewayConfig;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Remote gateway failures
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network failure or timeout; local state must stay untouched and the
    /// call is safe to retry
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway answered and declined the request
    #[error("gateway rejected the request: {0}")]
    Rejected(String),
}

/// Gateway operations the adapter depends on
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Request a (possibly partial) refund of a settled transaction.
    /// Returns only after the gateway has confirmed or declined.
    async fn refund(
        &self,
        transaction_id: &str,
        amount: Decimal,
        reason: &str,
    ) -> Result<(), GatewayError>;
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the real gateway
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn refund(
        &self,
        transaction_id: &str,
        amount: Decimal,
        reason: &str,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/refunds", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "merchant_id": self.config.merchant_id,
            "pf_payment_id": transaction_id,
            "amount": format!("{:.2}", amount),
            "reason": reason,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "refund endpoint returned {}",
                response.status()
            )));
        }

        let parsed: RefundResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        if parsed.status.eq_ignore_ascii_case("success") {
            Ok(())
        } else {
            Err(GatewayError::Rejected(
                parsed.message.unwrap_or(parsed.status),
            ))
        }
    }
}
