//! # Desktop Bridge Implementations
//!
//! Default bridge implementations for desktop hosts (macOS, Windows, Linux).
//!
//! - `HttpClient` using `reqwest` with rustls
//!
//! The wall clock and backoff sleeper need nothing desktop-specific; the
//! defaults from `bridge_traits::time` are used directly.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! ```

mod http;

pub use http::ReqwestHttpClient;
