//! # Core Configuration Module
//!
//! Provides configuration management for the Drive core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `DriveConfig`
//! instance that holds the settings consumed by the request executor and the
//! path resolver. It enforces fail-fast validation so a bad retry policy or a
//! malformed endpoint is rejected before the first request is sent.
//!
//! ## Sections
//!
//! - [`RetryConfig`] - attempt budget and backoff curve for retryable failures
//! - [`ResolverConfig`] - path cache lifetime and listing page size
//! - API base URL and export size ceiling
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::{DriveConfig, RetryConfig};
//! use std::time::Duration;
//!
//! let config = DriveConfig::builder()
//!     .profile("work")
//!     .retry(
//!         RetryConfig::default()
//!             .with_max_retries(5)
//!             .with_base_delay(Duration::from_millis(250)),
//!     )
//!     .cache_ttl(Duration::from_secs(60))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.retry.max_retries, 5);
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::{DriveConfig, RetryConfig};
//!
//! // A backoff factor below 1.0 would shrink delays between attempts
//! let config = DriveConfig::builder()
//!     .retry(RetryConfig::default().with_backoff_factor(0.5))
//!     .build()
//!     .expect("Should fail - invalid backoff factor");
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Drive v3 endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Default profile name used when the host does not pick one.
pub const DEFAULT_PROFILE: &str = "default";

/// Largest document the Drive export endpoint will return (10 MiB).
pub const DEFAULT_EXPORT_MAX_BYTES: u64 = 10 * 1024 * 1024;

const MAX_RETRIES_CEILING: u32 = 10;
const MAX_PAGE_SIZE: u32 = 1000;

/// Retry policy applied by the request executor.
///
/// The delay before retry `n` (1-based) is
/// `min(base_delay * backoff_factor^(n-1), max_delay)`, then spread by
/// `±jitter_ratio`. A server `Retry-After` hint replaces the computed delay
/// but is still capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    /// Fraction of the computed delay used as jitter amplitude (0 disables).
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(32_000),
            jitter_ratio: 0.25,
        }
    }
}

impl RetryConfig {
    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio;
        self
    }

    /// Total attempts a permanently retryable failure will consume.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Validates the retry policy
    pub fn validate(&self) -> Result<()> {
        if self.max_retries > MAX_RETRIES_CEILING {
            return Err(Error::Config(format!(
                "max_retries exceeds maximum of {}",
                MAX_RETRIES_CEILING
            )));
        }

        if self.base_delay.is_zero() {
            return Err(Error::Config(
                "Retry base delay must be greater than 0ms".to_string(),
            ));
        }

        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(Error::Config(
                "Backoff factor must be a finite number >= 1.0".to_string(),
            ));
        }

        if self.max_delay < self.base_delay {
            return Err(Error::Config(
                "Retry max delay must not be smaller than the base delay".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.jitter_ratio) {
            return Err(Error::Config(
                "Jitter ratio must be within [0.0, 1.0)".to_string(),
            ));
        }

        Ok(())
    }
}

/// Path resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Lifetime of a path cache entry
    ///
    /// Default: 300 seconds
    pub cache_ttl: Duration,

    /// `pageSize` sent with each per-segment listing
    ///
    /// Default: 1000 (the API maximum)
    pub page_size: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl ResolverConfig {
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Validates the resolver settings
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl.is_zero() {
            return Err(Error::Config(
                "Path cache TTL must be greater than 0s".to_string(),
            ));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(())
    }
}

/// Core configuration for the Drive core.
///
/// Use [`DriveConfigBuilder`] to construct instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Profile name attached to every request context
    pub profile: String,

    /// Drive v3 endpoint, without trailing slash
    pub api_base_url: String,

    pub retry: RetryConfig,

    pub resolver: ResolverConfig,

    /// Upper bound for exported documents; larger exports fail before download
    pub export_max_bytes: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            retry: RetryConfig::default(),
            resolver: ResolverConfig::default(),
            export_max_bytes: DEFAULT_EXPORT_MAX_BYTES,
        }
    }
}

impl DriveConfig {
    /// Creates a new builder for constructing a `DriveConfig`.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::DriveConfig;
    ///
    /// let config = DriveConfig::builder().build().unwrap();
    /// assert_eq!(config.profile, "default");
    /// ```
    pub fn builder() -> DriveConfigBuilder {
        DriveConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// Called by [`DriveConfigBuilder::build`]; hosts that deserialize a
    /// config directly should call it themselves.
    pub fn validate(&self) -> Result<()> {
        if self.profile.trim().is_empty() {
            return Err(Error::Config("Profile name cannot be empty".to_string()));
        }

        let url = url::Url::parse(&self.api_base_url)
            .map_err(|e| Error::Config(format!("Invalid API base URL: {}", e)))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(Error::Config(format!(
                "API base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.export_max_bytes == 0 {
            return Err(Error::Config(
                "Export size limit must be greater than 0 bytes".to_string(),
            ));
        }

        self.retry.validate()?;
        self.resolver.validate()?;

        Ok(())
    }
}

/// Builder for constructing [`DriveConfig`] instances.
///
/// Unset values fall back to the defaults documented on each section. Call
/// [`build()`](DriveConfigBuilder::build) to validate and produce the config.
#[derive(Debug, Default)]
pub struct DriveConfigBuilder {
    profile: Option<String>,
    api_base_url: Option<String>,
    retry: Option<RetryConfig>,
    resolver: Option<ResolverConfig>,
    export_max_bytes: Option<u64>,
}

impl DriveConfigBuilder {
    /// Sets the profile name.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Sets the API endpoint. A trailing slash is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::DriveConfig;
    ///
    /// let config = DriveConfig::builder()
    ///     .api_base_url("http://127.0.0.1:8080/drive/v3/")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.api_base_url, "http://127.0.0.1:8080/drive/v3");
    /// ```
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Replaces the whole retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets only the retry budget, keeping the rest of the policy.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.retry = Some(self.retry.unwrap_or_default().with_max_retries(max_retries));
        self
    }

    /// Replaces the resolver settings.
    pub fn resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets only the path cache TTL.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.resolver = Some(self.resolver.unwrap_or_default().with_cache_ttl(ttl));
        self
    }

    /// Sets the export size ceiling in bytes.
    ///
    /// Default: 10 MiB
    pub fn export_max_bytes(mut self, bytes: u64) -> Self {
        self.export_max_bytes = Some(bytes);
        self
    }

    /// Builds the final `DriveConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(DriveConfig)` on success, or `Error::Config` with an
    /// actionable message if any value is out of range.
    pub fn build(self) -> Result<DriveConfig> {
        let defaults = DriveConfig::default();

        let api_base_url = self
            .api_base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);

        let config = DriveConfig {
            profile: self.profile.unwrap_or(defaults.profile),
            api_base_url,
            retry: self.retry.unwrap_or(defaults.retry),
            resolver: self.resolver.unwrap_or(defaults.resolver),
            export_max_bytes: self.export_max_bytes.unwrap_or(defaults.export_max_bytes),
        };

        config.validate()?;

        Ok(config)
    }
}
