//! Retry spacing for read-only ledger and contract queries.

use rand::Rng;
use std::time::Duration;

/// Delay before read retry number `retry` (1-based).
///
/// The window doubles from `base_ms` up to `max_ms`; the delay is half the
/// window plus a random share of the other half.
pub fn calculate_backoff(retry: u32, base_ms: u64, max_ms: u64) -> Duration {
    if retry == 0 || base_ms == 0 {
        return Duration::ZERO;
    }

    let window = 1u64
        .checked_shl(retry - 1)
        .and_then(|factor| base_ms.checked_mul(factor))
        .unwrap_or(u64::MAX)
        .min(max_ms.max(base_ms));

    let floor = window / 2;
    let spread = window - floor;
    let jitter = if spread > 0 {
        rand::thread_rng().gen_range(0..=spread)
    } else {
        0
    };
    Duration::from_millis(floor + jitter)
}
