//! Remote listing primitive
//!
//! The resolver only needs one remote operation: a single page of
//! `files.list`. Providers implement [`DriveApi`] over their transport; tests
//! implement it with `mockall`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::call::DriveCall;
use crate::error::RemoteFailure;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const SHORTCUT_MIME_TYPE: &str = "application/vnd.google-apps.shortcut";

/// Minimal file record needed to walk a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub modified_time: Option<DateTime<Utc>>,
    pub parents: Vec<String>,
    pub trashed: bool,
    /// Target of a shortcut
    pub shortcut_target_id: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    pub fn is_shortcut(&self) -> bool {
        self.mime_type == SHORTCUT_MIME_TYPE
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListPage {
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// Single-attempt listing call.
///
/// Implementations must not retry; the executor owns retries.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Perform one `files.list` request described by `call`.
    async fn list_files(&self, call: DriveCall) -> Result<FileListPage, RemoteFailure>;
}
