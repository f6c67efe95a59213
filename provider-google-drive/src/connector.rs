//! Google Drive API connector implementation
//!
//! Implements [`DriveApi`] for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpResponse};
use core_drive::api::{DriveApi, FileListPage};
use core_drive::{DriveCall, RemoteFailure};
use core_runtime::config::DEFAULT_API_BASE_URL;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{failure_from_response, GoogleDriveError, Result};
use crate::types::{FileResource, FilesListResponse, FILE_FIELDS};

/// Per-request timeout handed to the HTTP client
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Drive API connector
///
/// Renders shaped [`DriveCall`]s into HTTP requests, attaches the bearer
/// token, and turns responses into typed values or [`RemoteFailure`]s.
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
///
/// let connector = GoogleDriveConnector::new(http_client, access_token)?;
/// let page = connector.list_files(DriveCall::list_files("trashed = false")).await?;
/// ```
pub struct GoogleDriveConnector {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for GoogleDriveConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleDriveConnector")
            .field("base_url", &self.base_url)
            .field("access_token", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GoogleDriveConnector {
    /// Create a connector against the public Drive v3 endpoint
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `access_token` - OAuth 2.0 access token, used as-is and never refreshed
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(GoogleDriveError::MissingAccessToken);
        }

        Ok(Self {
            http_client,
            access_token,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(GoogleDriveError::InvalidBaseUrl(base_url));
        }
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one exchange and return the raw success response.
    ///
    /// Non-2xx statuses become [`RemoteFailure::Http`] carrying the envelope
    /// reason and any `Retry-After` hint; transport errors become
    /// [`RemoteFailure::Transport`].
    #[instrument(skip_all, fields(method = %call.method, path = %call.path))]
    pub async fn send(&self, call: DriveCall) -> std::result::Result<HttpResponse, RemoteFailure> {
        let request = call
            .into_http_request(&self.base_url)
            .map_err(|e| RemoteFailure::Decode(e.to_string()))?
            .bearer_token(self.access_token.as_str())
            .timeout(self.timeout);

        let response = self.http_client.execute(request).await?;

        if response.is_success() {
            debug!(status = response.status, bytes = response.body.len(), "Drive call succeeded");
            Ok(response)
        } else {
            let failure = failure_from_response(&response);
            debug!(status = response.status, error = %failure, "Drive call failed");
            Err(failure)
        }
    }

    /// [`send`](Self::send) and decode the JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        call: DriveCall,
    ) -> std::result::Result<T, RemoteFailure> {
        let response = self.send(call).await?;
        serde_json::from_slice(&response.body).map_err(|e| RemoteFailure::Decode(e.to_string()))
    }

    /// `files.get` for one id. Shape the call first when the file may need a
    /// resource key or a shared-drive scope.
    pub async fn get_file(&self, call: DriveCall) -> std::result::Result<FileResource, RemoteFailure> {
        let call = match call.query_param("fields") {
            Some(_) => call,
            None => call.param("fields", FILE_FIELDS),
        };
        self.send_json(call).await
    }
}

#[async_trait]
impl DriveApi for GoogleDriveConnector {
    async fn list_files(&self, call: DriveCall) -> std::result::Result<FileListPage, RemoteFailure> {
        let response: FilesListResponse = self.send_json(call).await?;
        if response.incomplete_search {
            debug!("Listing reported an incomplete search");
        }
        Ok(response.into())
    }
}
