//! Error types for Google Drive provider

use bridge_traits::http::HttpResponse;
use chrono::{DateTime, Utc};
use core_drive::RemoteFailure;
use std::time::Duration;
use thiserror::Error;

use crate::types::ErrorEnvelope;

/// Longest raw body excerpt carried in a failure message
const BODY_EXCERPT_LIMIT: usize = 512;

/// Connector construction errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GoogleDriveError {
    #[error("Access token is empty")]
    MissingAccessToken,

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

/// Turn a non-success response into a classifiable failure.
///
/// The status always comes from the HTTP line. Reason and message come from
/// the Google error envelope when the body is one, otherwise the message is
/// an excerpt of the raw body.
pub fn failure_from_response(response: &HttpResponse) -> RemoteFailure {
    let (reason, message) = match serde_json::from_slice::<ErrorEnvelope>(&response.body) {
        Ok(envelope) => {
            let reason = envelope.error.reason().unwrap_or_default().to_string();
            let message = if envelope.error.message.is_empty() {
                format!("HTTP {}", response.status)
            } else {
                envelope.error.message
            };
            (reason, message)
        }
        Err(_) => (String::new(), body_excerpt(response)),
    };

    let failure = RemoteFailure::http(response.status, &reason, message);

    match response.header("Retry-After").and_then(parse_retry_after) {
        Some(hint) => failure.with_retry_after(hint),
        None => failure,
    }
}

/// `Retry-After` as delta-seconds or an HTTP date.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    // A date in the past means "now"
    Some((at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

fn body_excerpt(response: &HttpResponse) -> String {
    let text = String::from_utf8_lossy(&response.body);
    let text = text.trim();

    if text.is_empty() {
        return format!("HTTP {}", response.status);
    }

    match text.char_indices().nth(BODY_EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;

    fn response(status: u16, body: &str, retry_after: Option<&str>) -> HttpResponse {
        let mut headers = HashMap::new();
        if let Some(value) = retry_after {
            headers.insert("retry-after".to_string(), value.to_string());
        }
        HttpResponse {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_envelope_reason_and_message() {
        let body = r#"{"error":{"code":403,"message":"Rate Limit Exceeded","errors":[{"reason":"rateLimitExceeded"}]}}"#;
        let failure = failure_from_response(&response(403, body, None));

        assert_eq!(
            failure,
            RemoteFailure::http(403, "rateLimitExceeded", "Rate Limit Exceeded")
        );
    }

    #[test]
    fn test_plain_body_becomes_message() {
        let failure = failure_from_response(&response(502, "<html>Bad Gateway</html>", None));

        assert_eq!(
            failure,
            RemoteFailure::http(502, "", "<html>Bad Gateway</html>")
        );
    }

    #[test]
    fn test_empty_body_uses_status() {
        let failure = failure_from_response(&response(500, "", None));
        assert_eq!(failure, RemoteFailure::http(500, "", "HTTP 500"));
    }

    #[test]
    fn test_retry_after_header() {
        let body = r#"{"error":{"code":429,"message":"Too Many Requests"}}"#;
        let failure = failure_from_response(&response(429, body, Some("7")));

        assert_eq!(failure.retry_after(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_parse_retry_after_forms() {
        assert_eq!(parse_retry_after(" 3 "), Some(Duration::from_secs(3)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn test_long_body_is_truncated() {
        let long = "x".repeat(BODY_EXCERPT_LIMIT + 100);
        match failure_from_response(&response(500, &long, None)) {
            RemoteFailure::Http { message, .. } => {
                assert_eq!(message.len(), BODY_EXCERPT_LIMIT + 3);
                assert!(message.ends_with("..."));
            }
            other => panic!("unexpected failure: {:?}", other),
        }
    }
}
