//! # Host Bridge Traits
//!
//! Contracts between the Drive core and whatever host embeds it.
//!
//! ## Overview
//!
//! The core never opens sockets or reads the wall clock on its own. Each
//! capability it needs is a trait here, implemented once per host (the desktop
//! implementation lives in `bridge-desktop`) and replaced by fakes in tests.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - performs exactly one HTTP exchange per
//!   call; retry policy is owned by the core's request executor
//! - [`Clock`](time::Clock) - wall-clock source for cache expiry
//! - [`Sleeper`](time::Sleeper) - backoff delays, swappable for deterministic tests
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with an actionable message.
//!
//! ## Thread Safety
//!
//! Every bridge trait requires `Send + Sync` so a single instance can be
//! shared by concurrent logical operations.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, LogLevel, Sleeper, SystemClock, TokioSleeper};
