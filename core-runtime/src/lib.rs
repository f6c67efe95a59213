//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the Drive core:
//! - Logging and tracing infrastructure
//! - Configuration management (retry policy, path cache, API endpoint)
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions and the validated configuration
//! consumed by the request executor and the path resolver.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{DriveConfig, DriveConfigBuilder, ResolverConfig, RetryConfig};
pub use error::{Error, Result};
