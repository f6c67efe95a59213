//! Error types for the Drive core
//!
//! Every failure that leaves this crate carries an [`ErrorKind`] so the
//! command layer can map it to an exit code without inspecting messages.

use bridge_traits::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::resolver::SearchDomain;

/// Exit code reserved for user-initiated cancellation (128 + SIGINT).
pub const CANCELLED_EXIT_CODE: i32 = 130;

/// Closed taxonomy of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    RateLimited,
    QuotaExceeded,
    NetworkError,
    InvalidArgument,
    NotFound,
    PermissionDenied,
    ExportSizeLimit,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::RateLimited,
        ErrorKind::QuotaExceeded,
        ErrorKind::NetworkError,
        ErrorKind::InvalidArgument,
        ErrorKind::NotFound,
        ErrorKind::PermissionDenied,
        ErrorKind::ExportSizeLimit,
        ErrorKind::Unknown,
    ];

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::ExportSizeLimit => "EXPORT_SIZE_LIMIT",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Retryability is fixed per kind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::NetworkError)
    }

    /// Process exit code the command layer should use for this kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Unknown => 1,
            ErrorKind::InvalidArgument => 2,
            ErrorKind::NotFound => 3,
            ErrorKind::PermissionDenied => 4,
            ErrorKind::QuotaExceeded => 5,
            ErrorKind::RateLimited => 6,
            ErrorKind::NetworkError => 7,
            ErrorKind::ExportSizeLimit => 8,
        }
    }

    /// Short hint shown to the user next to the error, when one applies.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            ErrorKind::RateLimited => Some("Wait a moment and retry; reduce parallelism for batch commands"),
            ErrorKind::QuotaExceeded => Some("Free up storage or ask the Drive owner to raise the quota"),
            ErrorKind::PermissionDenied => Some("Check sharing settings, or register the link's resource key"),
            ErrorKind::NotFound => Some("Verify the id or path; the item may be in the trash or a shared drive"),
            ErrorKind::ExportSizeLimit => Some("Download the file in its native format instead of exporting"),
            ErrorKind::NetworkError => Some("Check connectivity and retry"),
            ErrorKind::InvalidArgument | ErrorKind::Unknown => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A failure with its kind attached, ready to be surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub retryable: bool,
    pub http_status: Option<u16>,
    pub reason: Option<String>,
    pub message: String,
    pub trace_id: Option<Uuid>,
    /// Attempts consumed before this error was returned (0 for local checks).
    pub attempts: u32,
    /// Offending ids, request kind, suggested action.
    pub context: BTreeMap<String, String>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let mut context = BTreeMap::new();
        if let Some(action) = kind.suggested_action() {
            context.insert("suggested_action".to_string(), action.to_string());
        }

        Self {
            kind,
            retryable: kind.is_retryable(),
            http_status: None,
            reason: None,
            message: message.into(),
            trace_id: None,
            attempts: 0,
            context,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if !reason.is_empty() {
            self.reason = Some(reason);
        }
        self
    }

    pub fn with_trace_id(mut self, trace_id: Uuid) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)?;
        if let Some(status) = self.http_status {
            write!(f, " (status {}", status)?;
            if let Some(reason) = &self.reason {
                write!(f, ", reason {}", reason)?;
            }
            f.write_str(")")?;
        }
        if let Some(trace_id) = self.trace_id {
            write!(f, " [trace {}]", trace_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ClassifiedError {}

/// Raw outcome of one failed remote attempt, before classification.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteFailure {
    /// The server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        reason: Option<String>,
        message: String,
        /// Server-provided `Retry-After` hint
        retry_after: Option<Duration>,
    },

    /// No usable response (DNS, TLS, reset, timeout)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// A success status whose body could not be decoded
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl RemoteFailure {
    /// Shorthand for an HTTP failure without a retry hint.
    pub fn http(status: u16, reason: &str, message: impl Into<String>) -> Self {
        RemoteFailure::Http {
            status,
            reason: (!reason.is_empty()).then(|| reason.to_string()),
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(self, hint: Duration) -> Self {
        match self {
            RemoteFailure::Http {
                status,
                reason,
                message,
                ..
            } => RemoteFailure::Http {
                status,
                reason,
                message,
                retry_after: Some(hint),
            },
            other => other,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RemoteFailure::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<BridgeError> for RemoteFailure {
    fn from(error: BridgeError) -> Self {
        RemoteFailure::Transport(error.to_string())
    }
}

/// Drive core errors
#[derive(Error, Debug)]
pub enum DriveError {
    /// A classified remote or local failure
    #[error(transparent)]
    Api(ClassifiedError),

    /// A path segment has no match under its parent
    #[error("Path not found: '{segment}' does not exist under '/{resolved}' in {domain}")]
    PathNotFound {
        segment: String,
        /// Segments consumed before the failing one, joined with `/`
        resolved: String,
        domain: SearchDomain,
        trace_id: Uuid,
    },

    /// The caller's cancellation token fired
    #[error("Operation cancelled after {attempts} attempt(s) [trace {trace_id}]")]
    Cancelled { trace_id: Uuid, attempts: u32 },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl DriveError {
    /// Kind of the failure; `None` only for cancellation.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DriveError::Api(err) => Some(err.kind),
            DriveError::PathNotFound { .. } => Some(ErrorKind::NotFound),
            DriveError::Cancelled { .. } => None,
            DriveError::InvalidPath(_) | DriveError::InvalidOptions(_) => {
                Some(ErrorKind::InvalidArgument)
            }
        }
    }

    pub fn trace_id(&self) -> Option<Uuid> {
        match self {
            DriveError::Api(err) => err.trace_id,
            DriveError::PathNotFound { trace_id, .. } | DriveError::Cancelled { trace_id, .. } => {
                Some(*trace_id)
            }
            DriveError::InvalidPath(_) | DriveError::InvalidOptions(_) => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind()
            .map(|kind| kind.exit_code())
            .unwrap_or(CANCELLED_EXIT_CODE)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DriveError::Cancelled { .. })
    }

    /// The classified payload, if this error came from a remote call or a
    /// local size check.
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            DriveError::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ClassifiedError> for DriveError {
    fn from(error: ClassifiedError) -> Self {
        DriveError::Api(error)
    }
}

/// Result type for Drive core operations
pub type Result<T> = std::result::Result<T, DriveError>;
