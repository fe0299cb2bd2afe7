//! Time and identifier helpers shared by all crates.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU16, Ordering};

/// Current UTC timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn sequence() -> &'static AtomicU16 {
    static SEQ: OnceLock<AtomicU16> = OnceLock::new();
    SEQ.get_or_init(|| {
        use rand::Rng;
        AtomicU16::new(rand::thread_rng().gen_range(0..0x1000))
    })
}

/// Generate a short unique suffix for human-readable references
/// (order numbers, audit correlation).
///
/// Layout (uppercase hex):
///   - 32 low bits of milliseconds since 2024-01-01 UTC
///   - 12-bit wrapping sequence, randomly seeded per process; suffixes
///     stay distinct within any burst of up to 4096 ids per millisecond
pub fn unique_suffix() -> String {
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let ts = (now_millis() - EPOCH_MS) & 0xFFFF_FFFF;
    let seq = sequence().fetch_add(1, Ordering::Relaxed) & 0x0FFF;
    format!("{ts:08X}{seq:03X}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_suffix_shape() {
        let s = unique_suffix();
        assert_eq!(s.len(), 11);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_unique_suffix_never_collides_in_a_burst() {
        let a: std::collections::HashSet<_> = (0..256).map(|_| unique_suffix()).collect();
        assert_eq!(a.len(), 256);
    }
}
