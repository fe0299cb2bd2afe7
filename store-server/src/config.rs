//! Store configuration
//!
//! Env-driven configuration for pricing rules and the payment gateway.
//! Defaults match the development store setup.

use rust_decimal::Decimal;

/// Payment gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub merchant_id: String,
    /// Shared secret used for payload and notification signatures
    pub passphrase: String,
    /// Gateway API base URL (refund endpoint lives under it)
    pub base_url: String,
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
    /// Timeout for outbound gateway calls
    pub timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            merchant_id: "10000100".into(),
            passphrase: "dev-passphrase".into(),
            base_url: "https://sandbox.gateway.example".into(),
            return_url: "https://localhost/checkout/return".into(),
            cancel_url: "https://localhost/checkout/cancel".into(),
            notify_url: "https://localhost/api/payments/notify".into(),
            timeout_ms: 10_000,
        }
    }
}

/// Store-wide configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// ISO 4217 currency code
    pub currency: String,
    /// Tax rate as a fraction, e.g. 0.15 for 15%
    pub tax_rate: Decimal,
    /// Flat shipping fee below the free-shipping threshold
    pub flat_shipping_fee: Decimal,
    /// Orders with subtotal >= this ship free
    pub free_shipping_threshold: Decimal,
    /// Default low-stock threshold (per-product override wins)
    pub low_stock_threshold: i64,
    pub gateway: GatewayConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            currency: "EUR".into(),
            tax_rate: Decimal::new(15, 2),
            flat_shipping_fee: Decimal::from(50),
            free_shipping_threshold: Decimal::from(500),
            low_stock_threshold: 5,
            gateway: GatewayConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();
        Self {
            currency: std::env::var("STORE_CURRENCY").unwrap_or(defaults.currency),
            tax_rate: env_decimal("STORE_TAX_RATE", defaults.tax_rate),
            flat_shipping_fee: env_decimal("STORE_FLAT_SHIPPING_FEE", defaults.flat_shipping_fee),
            free_shipping_threshold: env_decimal(
                "STORE_FREE_SHIPPING_THRESHOLD",
                defaults.free_shipping_threshold,
            ),
            low_stock_threshold: std::env::var("STORE_LOW_STOCK_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.low_stock_threshold),
            gateway: GatewayConfig {
                merchant_id: std::env::var("GATEWAY_MERCHANT_ID")
                    .unwrap_or(defaults.gateway.merchant_id),
                passphrase: std::env::var("GATEWAY_PASSPHRASE")
                    .unwrap_or(defaults.gateway.passphrase),
                base_url: std::env::var("GATEWAY_BASE_URL").unwrap_or(defaults.gateway.base_url),
                return_url: std::env::var("GATEWAY_RETURN_URL")
                    .unwrap_or(defaults.gateway.return_url),
                cancel_url: std::env::var("GATEWAY_CANCEL_URL")
                    .unwrap_or(defaults.gateway.cancel_url),
                notify_url: std::env::var("GATEWAY_NOTIFY_URL")
                    .unwrap_or(defaults.gateway.notify_url),
                timeout_ms: std::env::var("GATEWAY_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.gateway.timeout_ms),
            },
        }
    }
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
