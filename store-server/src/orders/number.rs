//! Order number generation
//!
//! Format: `ORD-<YYYYMMDD>-<unique-suffix>`. The suffix combines a
//! millisecond timestamp fragment with a wrapping sequence (see
//! `shared::util::unique_suffix`); the order store additionally enforces
//! uniqueness at insert time.

use chrono::{DateTime, Utc};
use shared::util::{now_millis, unique_suffix};

/// Generate a new order number for the given creation timestamp (millis)
pub fn generate_order_number(created_at: i64) -> String {
    let date = DateTime::<Utc>::from_timestamp_millis(created_at)
        .unwrap_or_else(Utc::now)
        .format("%Y%m%d");
    format!("ORD-{date}-{}", unique_suffix())
}

/// Generate a new order number for "now"
pub fn generate_now() -> String {
    generate_order_number(now_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        // 2026-08-29 10:00:00 UTC
        let n = generate_order_number(1_787_997_600_000);
        assert!(n.starts_with("ORD-20260829-"), "got {n}");
        let suffix = n.rsplit('-').next().unwrap();
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_numbers_unique() {
        let set: std::collections::HashSet<_> = (0..128).map(|_| generate_now()).collect();
        assert_eq!(set.len(), 128);
    }
}
