//! Pure exponential backoff for recurring scheduled items that keep missing
//! their delivery window (e.g. a nudge dismissed several times in a row).

/// Backoff delay in milliseconds for the `attempt`-th retry (0-indexed),
/// doubling from `base_ms` and capped at `max_ms`.
pub fn backoff_delay_ms(base_ms: i64, max_ms: i64, attempt: u32) -> i64 {
    let scaled = base_ms.saturating_mul(1i64 << attempt.min(32));
    scaled.min(max_ms)
}
