//! Error classification
//!
//! Maps a failed call's HTTP status and Drive `reason` string to an
//! [`ErrorKind`]. Rules are checked in order; the first match wins.

use crate::error::{ClassifiedError, ErrorKind, RemoteFailure};

/// Largest document the Drive export endpoint will return.
pub const EXPORT_MAX_BYTES: u64 = 10 * 1024 * 1024;

const RATE_LIMIT_REASONS: &[&str] = &[
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "sharingRateLimitExceeded",
];

const QUOTA_REASONS: &[&str] = &[
    "storageQuotaExceeded",
    "dailyLimitExceeded",
    "teamDriveFileLimitExceeded",
];

const DAILY_LIMIT_REASON: &str = "dailyLimitExceeded";
const DAILY_LIMIT_ACTION: &str = "Daily quota will reset in 24 hours";

const TRANSIENT_REASONS: &[&str] = &["backendError", "internalError"];

/// Outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub retryable: bool,
}

impl Classification {
    fn of(kind: ErrorKind) -> Self {
        Self {
            kind,
            retryable: kind.is_retryable(),
        }
    }
}

/// Classify a remote failure by status and reason.
///
/// Pure: the same inputs always yield the same result. The message never
/// influences the kind.
pub fn classify(status: u16, reason: &str, _message: &str) -> Classification {
    let kind = if status == 429 || (status == 403 && RATE_LIMIT_REASONS.contains(&reason)) {
        ErrorKind::RateLimited
    } else if status == 403 && QUOTA_REASONS.contains(&reason) {
        ErrorKind::QuotaExceeded
    } else if (500..600).contains(&status) || TRANSIENT_REASONS.contains(&reason) {
        ErrorKind::NetworkError
    } else if status == 400 || reason == "badRequest" {
        ErrorKind::InvalidArgument
    } else if status == 404 || reason == "notFound" {
        ErrorKind::NotFound
    } else if status == 403 {
        ErrorKind::PermissionDenied
    } else {
        ErrorKind::Unknown
    };

    Classification::of(kind)
}

/// Classify any thunk failure.
///
/// Transport failures never reached the server and are safe to retry;
/// undecodable bodies are not.
pub fn classify_failure(failure: &RemoteFailure) -> Classification {
    match failure {
        RemoteFailure::Http {
            status,
            reason,
            message,
            ..
        } => classify(*status, reason.as_deref().unwrap_or(""), message),
        RemoteFailure::Transport(_) => Classification::of(ErrorKind::NetworkError),
        RemoteFailure::Decode(_) => Classification::of(ErrorKind::Unknown),
    }
}

/// Build the user-facing error for a classified failure.
pub fn to_classified(failure: &RemoteFailure, classification: Classification) -> ClassifiedError {
    match failure {
        RemoteFailure::Http {
            status,
            reason,
            message,
            ..
        } => {
            let mut err = ClassifiedError::new(classification.kind, message.clone())
                .with_status(*status);
            if let Some(reason) = reason {
                if reason == DAILY_LIMIT_REASON {
                    err = err.with_context("suggested_action", DAILY_LIMIT_ACTION);
                }
                err = err.with_reason(reason.clone());
            }
            err
        }
        other => ClassifiedError::new(classification.kind, other.to_string()),
    }
}

/// Local pre-flight check before an export-style transfer.
pub fn check_export_size(size: u64, limit: u64) -> Result<(), ClassifiedError> {
    if size > limit {
        return Err(ClassifiedError::new(
            ErrorKind::ExportSizeLimit,
            format!(
                "Export of {} bytes exceeds the {} byte limit",
                size, limit
            ),
        )
        .with_context("size", size.to_string())
        .with_context("limit", limit.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(status: u16, reason: &str) -> (ErrorKind, bool) {
        let c = classify(status, reason, "message");
        (c.kind, c.retryable)
    }

    #[test]
    fn test_mapping_table() {
        let table: &[(u16, &str, ErrorKind, bool)] = &[
            (429, "", ErrorKind::RateLimited, true),
            (429, "anything", ErrorKind::RateLimited, true),
            (403, "rateLimitExceeded", ErrorKind::RateLimited, true),
            (403, "userRateLimitExceeded", ErrorKind::RateLimited, true),
            (403, "sharingRateLimitExceeded", ErrorKind::RateLimited, true),
            (403, "storageQuotaExceeded", ErrorKind::QuotaExceeded, false),
            (403, "dailyLimitExceeded", ErrorKind::QuotaExceeded, false),
            (500, "", ErrorKind::NetworkError, true),
            (502, "", ErrorKind::NetworkError, true),
            (503, "backendError", ErrorKind::NetworkError, true),
            (200, "internalError", ErrorKind::NetworkError, true),
            (400, "", ErrorKind::InvalidArgument, false),
            (422, "badRequest", ErrorKind::InvalidArgument, false),
            (404, "", ErrorKind::NotFound, false),
            (410, "notFound", ErrorKind::NotFound, false),
            (403, "insufficientFilePermissions", ErrorKind::PermissionDenied, false),
            (403, "", ErrorKind::PermissionDenied, false),
            (401, "authError", ErrorKind::Unknown, false),
            (418, "teapot", ErrorKind::Unknown, false),
        ];

        for &(status, reason, kind, retryable) in table {
            assert_eq!(
                kind_of(status, reason),
                (kind, retryable),
                "status {} reason {:?}",
                status,
                reason
            );
        }
    }

    #[test]
    fn test_classify_is_deterministic() {
        for status in [200u16, 400, 401, 403, 404, 429, 500, 503] {
            for reason in ["", "backendError", "storageQuotaExceeded", "x"] {
                let first = classify(status, reason, "a");
                for _ in 0..5 {
                    assert_eq!(classify(status, reason, "different message"), first);
                }
            }
        }
    }

    #[test]
    fn test_rules_apply_in_order() {
        // Rate limiting wins over the generic 403 rule
        assert_eq!(kind_of(403, "rateLimitExceeded").0, ErrorKind::RateLimited);
        // A transient reason on a 403 is still transient
        assert_eq!(kind_of(403, "backendError").0, ErrorKind::NetworkError);
        // 5xx wins over notFound
        assert_eq!(kind_of(503, "notFound").0, ErrorKind::NetworkError);
    }

    #[test]
    fn test_classify_failure_variants() {
        let transport = RemoteFailure::Transport("connection reset".to_string());
        assert_eq!(
            classify_failure(&transport),
            Classification {
                kind: ErrorKind::NetworkError,
                retryable: true
            }
        );

        let decode = RemoteFailure::Decode("expected value".to_string());
        assert_eq!(classify_failure(&decode).kind, ErrorKind::Unknown);
        assert!(!classify_failure(&decode).retryable);

        let http = RemoteFailure::http(403, "storageQuotaExceeded", "full");
        assert_eq!(classify_failure(&http).kind, ErrorKind::QuotaExceeded);
    }

    #[test]
    fn test_to_classified_keeps_status_and_reason() {
        let failure = RemoteFailure::http(404, "notFound", "File not found: x");
        let err = to_classified(&failure, classify_failure(&failure));

        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.http_status, Some(404));
        assert_eq!(err.reason.as_deref(), Some("notFound"));
        assert_eq!(err.message, "File not found: x");
    }

    #[test]
    fn test_daily_limit_suggests_waiting() {
        let failure = RemoteFailure::http(403, "dailyLimitExceeded", "Daily Limit Exceeded");
        let err = to_classified(&failure, classify_failure(&failure));

        assert_eq!(err.kind, ErrorKind::QuotaExceeded);
        assert!(!err.retryable);
        assert_eq!(
            err.context.get("suggested_action").map(String::as_str),
            Some(DAILY_LIMIT_ACTION)
        );

        let storage = RemoteFailure::http(403, "storageQuotaExceeded", "full");
        let err = to_classified(&storage, classify_failure(&storage));
        assert_eq!(
            err.context.get("suggested_action").map(String::as_str),
            ErrorKind::QuotaExceeded.suggested_action()
        );
    }

    #[test]
    fn test_export_size_check() {
        assert!(check_export_size(EXPORT_MAX_BYTES, EXPORT_MAX_BYTES).is_ok());

        let err = check_export_size(EXPORT_MAX_BYTES + 1, EXPORT_MAX_BYTES).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExportSizeLimit);
        assert!(!err.retryable);
        assert_eq!(err.http_status, None);
        assert_eq!(err.context.get("limit"), Some(&EXPORT_MAX_BYTES.to_string()));
    }
}
