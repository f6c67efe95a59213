//! Google Drive API response types
//!
//! Data structures for deserializing Google Drive API v3 responses.

use chrono::{DateTime, Utc};
use core_drive::api::{DriveFile, FileListPage};
use serde::{Deserialize, Serialize};

/// Fields requested for single file lookups
pub const FILE_FIELDS: &str =
    "id,name,mimeType,size,modifiedTime,parents,trashed,shortcutDetails(targetId)";

/// Google Drive API file resource
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResource {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub mime_type: String,

    /// Size in bytes, sent as a decimal string (omitted for folders and
    /// native documents)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub parents: Vec<String>,

    #[serde(default)]
    pub trashed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut_details: Option<ShortcutDetails>,
}

impl FileResource {
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutDetails {
    pub target_id: Option<String>,
}

impl From<FileResource> for DriveFile {
    fn from(file: FileResource) -> Self {
        DriveFile {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            modified_time: file.modified_time,
            parents: file.parents,
            trashed: file.trashed,
            shortcut_target_id: file.shortcut_details.and_then(|d| d.target_id),
        }
    }
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<FileResource>,

    pub next_page_token: Option<String>,

    #[serde(default)]
    pub incomplete_search: bool,
}

impl From<FilesListResponse> for FileListPage {
    fn from(response: FilesListResponse) -> Self {
        FileListPage {
            files: response.files.into_iter().map(DriveFile::from).collect(),
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

/// Error body returned with non-2xx statuses:
/// `{"error": {"code": 403, "message": "...", "errors": [{"reason": "..."}]}}`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<u16>,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorItem {
    #[serde(default)]
    pub reason: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// First non-empty reason in `errors[]`.
    pub fn reason(&self) -> Option<&str> {
        self.errors
            .iter()
            .filter_map(|item| item.reason.as_deref())
            .find(|reason| !reason.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_shortcut() {
        let json = r#"{
            "id": "sc1",
            "name": "Linked",
            "mimeType": "application/vnd.google-apps.shortcut",
            "modifiedTime": "2024-03-01T10:00:00.000Z",
            "parents": ["root"],
            "shortcutDetails": {"targetId": "target"}
        }"#;

        let resource: FileResource = serde_json::from_str(json).unwrap();
        let file = DriveFile::from(resource);

        assert!(file.is_shortcut());
        assert_eq!(file.shortcut_target_id.as_deref(), Some("target"));
        assert_eq!(file.parents, vec!["root"]);
        assert!(file.modified_time.is_some());
        assert!(!file.trashed);
    }

    #[test]
    fn test_deserialize_files_list_response() {
        let json = r#"{
            "files": [
                {"id": "f1", "name": "a.txt", "mimeType": "text/plain", "size": "12"}
            ],
            "nextPageToken": "token123",
            "incompleteSearch": false
        }"#;

        let response: FilesListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.files[0].size_bytes(), Some(12));

        let page = FileListPage::from(response);
        assert_eq!(page.files.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("token123"));
    }

    #[test]
    fn test_empty_listing_has_no_token() {
        let response: FilesListResponse =
            serde_json::from_str(r#"{"nextPageToken": ""}"#).unwrap();
        let page = FileListPage::from(response);

        assert!(page.files.is_empty());
        assert_eq!(page.next_page_token, None);
    }

    #[test]
    fn test_error_envelope_reason() {
        let json = r#"{
            "error": {
                "code": 403,
                "message": "User Rate Limit Exceeded",
                "errors": [{"domain": "usageLimits", "reason": "userRateLimitExceeded"}]
            }
        }"#;

        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.code, Some(403));
        assert_eq!(envelope.error.reason(), Some("userRateLimitExceeded"));
    }
}
