//! Async runtime seam for the gdrv core crates.
//!
//! Every `core-*` and `provider-*` crate goes through this crate instead of
//! naming Tokio directly, so the executor, timers and cancellation primitives
//! are chosen in one place.
//!
//! # Modules
//!
//! - `runtime`: blocking entry point used by `#[core_async::test]`
//! - `task`: task spawning for fan-out work
//! - `time`: sleep, timeout and instants
//! - `sync`: locks, channels and [`CancellationToken`](sync::CancellationToken)
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example(cancel: CancellationToken) {
//!     core_async::select_cancelled(&cancel, sleep(Duration::from_millis(10))).await;
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use sync::CancellationToken;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};

/// Drives `future` until it completes or `cancel` fires, whichever comes
/// first.
///
/// Returns `None` when the token was cancelled before the future resolved.
/// The token is polled first so an already-cancelled token never polls the
/// future.
pub async fn select_cancelled<F>(cancel: &CancellationToken, future: F) -> Option<F::Output>
where
    F: std::future::Future,
{
    let cancelled = cancel.cancelled();

    futures::pin_mut!(future);
    futures::pin_mut!(cancelled);

    match futures::future::select(cancelled, future).await {
        futures::future::Either::Left(_) => None,
        futures::future::Either::Right((output, _)) => Some(output),
    }
}
