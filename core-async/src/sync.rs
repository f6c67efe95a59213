//! Synchronization primitives.
//!
//! Async-aware locks and channels from `tokio::sync`, plus the cooperative
//! [`CancellationToken`] used to abort in-flight retries and path walks.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//!
//! let parent = CancellationToken::new();
//! let child = parent.child_token();
//! parent.cancel();
//! assert!(child.is_cancelled());
//! ```

pub use tokio::sync::{mpsc, oneshot, Mutex, MutexGuard, Notify, RwLock, Semaphore};

pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
