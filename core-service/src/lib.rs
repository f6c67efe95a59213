//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP client, clock,
//! backoff sleeper) and the Google Drive connector into the Drive core.
//! Desktop hosts typically enable the `desktop-shims` feature, which depends on
//! `bridge-desktop`, and call [`bootstrap_desktop`].
//!
//! ```ignore
//! use core_drive::{RequestKind, ResolveOptions};
//! use core_runtime::config::DriveConfig;
//!
//! let service = core_service::bootstrap_desktop(DriveConfig::default(), token)?;
//! let mut ctx = service.new_context(RequestKind::GetById);
//! let resolution = service
//!     .resolve_path(&cancel, &mut ctx, "Projects/2024/report.pdf", &ResolveOptions::my_drive())
//!     .await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    http::{HttpClient, HttpResponse},
    time::{Clock, Sleeper, SystemClock, TokioSleeper},
};
use core_async::sync::CancellationToken;
use core_drive::{
    check_export_size, DriveCall, PathResolver, RequestContext, RequestExecutor, RequestKind,
    RequestShaper, Resolution, ResolveOptions, ResourceKeyEntry, ResourceKeyStore,
};
use core_runtime::config::DriveConfig;
use provider_google_drive::{FileResource, GoogleDriveConnector};
use tracing::{info, instrument};

/// Aggregated handle to all bridge dependencies the core requires.
#[derive(Clone)]
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub clock: Arc<dyn Clock>,
    pub sleeper: Arc<dyn Sleeper>,
}

impl CoreDependencies {
    /// Bundle an HTTP client with the real clock and runtime sleeper.
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

/// Primary façade exposed to host applications.
///
/// Owns one resource-key store and one path cache; share the service (it is
/// cheap to wrap in an `Arc`) rather than building one per command.
pub struct DriveService {
    config: DriveConfig,
    connector: Arc<GoogleDriveConnector>,
    resource_keys: Arc<ResourceKeyStore>,
    shaper: RequestShaper,
    executor: RequestExecutor,
    resolver: PathResolver,
}

impl DriveService {
    /// Validate `config` and wire the service.
    pub fn new(
        config: DriveConfig,
        deps: CoreDependencies,
        access_token: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;

        let connector = Arc::new(
            GoogleDriveConnector::new(deps.http_client, access_token)?
                .with_base_url(config.api_base_url.clone())?,
        );
        let resource_keys = Arc::new(ResourceKeyStore::new());
        let shaper = RequestShaper::new(resource_keys.clone());
        let executor = RequestExecutor::with_sleeper(config.retry.clone(), deps.sleeper);
        let resolver = PathResolver::new(
            connector.clone(),
            shaper.clone(),
            executor.clone(),
            &config.resolver,
            deps.clock,
        );

        info!(
            profile = %config.profile,
            max_retries = config.retry.max_retries,
            cache_ttl_secs = config.resolver.cache_ttl.as_secs(),
            "Drive service ready"
        );

        Ok(Self {
            config,
            connector,
            resource_keys,
            shaper,
            executor,
            resolver,
        })
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn resource_keys(&self) -> &Arc<ResourceKeyStore> {
        &self.resource_keys
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Fresh context for one logical command under the configured profile.
    pub fn new_context(&self, kind: RequestKind) -> RequestContext {
        RequestContext::new(self.config.profile.clone(), kind)
    }

    pub async fn resolve_path(
        &self,
        cancel: &CancellationToken,
        ctx: &mut RequestContext,
        path: &str,
        options: &ResolveOptions,
    ) -> Result<Resolution> {
        Ok(self.resolver.resolve(cancel, ctx, path, options).await?)
    }

    pub fn invalidate_path(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &ResolveOptions,
    ) -> Result<bool> {
        Ok(self.resolver.invalidate(ctx, path, options)?)
    }

    pub fn clear_path_cache(&self) {
        self.resolver.clear_cache();
    }

    pub fn add_resource_key(&self, file_id: &str, resource_key: &str) {
        self.resource_keys.add_key(file_id, resource_key, None);
    }

    pub fn get_resource_key(&self, file_id: &str) -> Option<String> {
        self.resource_keys.get_key(file_id)
    }

    /// Parse a sharing link and remember its key. Returns the parsed entry,
    /// or `None` when the link carries no file id or no resource key.
    pub fn register_resource_link(&self, link: &str) -> Option<ResourceKeyEntry> {
        let entry = self.resource_keys.parse_from_link(link)?;
        self.resource_keys.add_key(
            &entry.file_id,
            &entry.resource_key,
            entry.origin_link.as_deref(),
        );
        Some(entry)
    }

    /// Apply drive scope and resource keys for `ctx` to `call`.
    pub fn shape(&self, call: DriveCall, ctx: &RequestContext) -> DriveCall {
        self.shaper.shape(call, ctx)
    }

    /// Shape `call` and run it through the retrying executor.
    #[instrument(skip_all, fields(path = %call.path))]
    pub async fn execute_call(
        &self,
        cancel: &CancellationToken,
        ctx: &RequestContext,
        call: DriveCall,
    ) -> Result<HttpResponse> {
        let shaped = self.shaper.shape(call, ctx);
        let connector = &self.connector;
        Ok(self
            .executor
            .execute(cancel, ctx, || connector.send(shaped.clone()))
            .await?)
    }

    /// Metadata for one file id. The id is recorded on `ctx` before the call
    /// so its resource key, if any, is attached.
    pub async fn get_file(
        &self,
        cancel: &CancellationToken,
        ctx: &mut RequestContext,
        file_id: &str,
    ) -> Result<FileResource> {
        ctx.add_file_id(file_id);
        let shaped = self.shaper.shape(DriveCall::get_file(file_id), ctx);
        let connector = &self.connector;
        Ok(self
            .executor
            .execute(cancel, ctx, || connector.get_file(shaped.clone()))
            .await?)
    }

    /// Reject exports larger than the configured limit before any transfer.
    pub fn check_export_size(&self, size: u64) -> Result<()> {
        check_export_size(size, self.config.export_max_bytes)
            .map_err(|err| CoreError::Drive(err.into()))
    }
}

/// Build a [`DriveService`] on the desktop HTTP client.
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(
    config: DriveConfig,
    access_token: impl Into<String>,
) -> Result<DriveService> {
    let http_client = bridge_desktop::ReqwestHttpClient::new()
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    DriveService::new(
        config,
        CoreDependencies::new(Arc::new(http_client)),
        access_token,
    )
}
