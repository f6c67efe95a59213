//! Task spawning.
//!
//! Fan-out operations (for example a batch command touching many objects)
//! spawn one task per branch and join the handles afterwards.
//!
//! ```rust
//! use core_async::task;
//!
//! async fn example() {
//!     let handle = task::spawn(async { 42 });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub use tokio::task::{spawn, spawn_blocking, yield_now, JoinError, JoinHandle, JoinSet};
