//! Time-related abstractions backed by `tokio::time`.
//!
//! `Instant` is monotonic and is what retry bookkeeping measures elapsed time
//! with; wall-clock timestamps come from `bridge_traits::time::Clock`.

pub use tokio::time::{sleep, sleep_until, timeout, Sleep, Timeout};

pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Returns the current time as milliseconds since `UNIX_EPOCH`.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
