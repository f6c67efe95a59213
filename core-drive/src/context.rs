//! Per-operation request context
//!
//! One [`RequestContext`] is created per logical command and threaded through
//! every remote call it makes. Ids only ever accumulate; the trace id is fixed
//! at construction.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// What a remote call does, used for logging and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    GetById,
    ListOrSearch,
    Mutation,
    DownloadOrExport,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::GetById => "get_by_id",
            RequestKind::ListOrSearch => "list_or_search",
            RequestKind::Mutation => "mutation",
            RequestKind::DownloadOrExport => "download_or_export",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    profile: String,
    drive_id: Option<String>,
    kind: RequestKind,
    trace_id: Uuid,
    file_ids: Vec<String>,
    parent_ids: Vec<String>,
    dry_run: bool,
}

impl RequestContext {
    /// Start a new logical operation with a fresh trace id.
    pub fn new(profile: impl Into<String>, kind: RequestKind) -> Self {
        Self {
            profile: profile.into(),
            drive_id: None,
            kind,
            trace_id: Uuid::new_v4(),
            file_ids: Vec::new(),
            parent_ids: Vec::new(),
            dry_run: false,
        }
    }

    /// Scope the operation to a shared drive. Empty ids are ignored.
    pub fn with_drive_id(mut self, drive_id: impl Into<String>) -> Self {
        let drive_id = drive_id.into();
        self.drive_id = (!drive_id.is_empty()).then_some(drive_id);
        self
    }

    /// Replace the drive scope, clearing it with `None`.
    pub fn with_drive_scope(mut self, drive_id: Option<&str>) -> Self {
        self.drive_id = drive_id.filter(|id| !id.is_empty()).map(str::to_string);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn drive_id(&self) -> Option<&str> {
        self.drive_id.as_deref()
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    pub fn file_ids(&self) -> &[String] {
        &self.file_ids
    }

    pub fn parent_ids(&self) -> &[String] {
        &self.parent_ids
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn add_file_id(&mut self, id: impl Into<String>) {
        self.file_ids.push(id.into());
    }

    pub fn add_file_ids<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_ids.extend(ids.into_iter().map(Into::into));
    }

    pub fn add_parent_id(&mut self, id: impl Into<String>) {
        self.parent_ids.push(id.into());
    }

    pub fn add_parent_ids<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_ids.extend(ids.into_iter().map(Into::into));
    }

    /// File ids then parent ids, duplicates removed, first occurrence kept.
    pub fn involved_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.file_ids
            .iter()
            .chain(self.parent_ids.iter())
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Context for a sub-call of this operation: same trace, new kind, no ids.
    pub fn derive(&self, kind: RequestKind) -> Self {
        Self {
            profile: self.profile.clone(),
            drive_id: self.drive_id.clone(),
            kind,
            trace_id: self.trace_id,
            file_ids: Vec::new(),
            parent_ids: Vec::new(),
            dry_run: self.dry_run,
        }
    }

    /// Owned context for one branch of a fan-out.
    ///
    /// Each concurrent branch appends to its own copy; merge them back with
    /// [`absorb`](Self::absorb) once all branches have finished.
    pub fn branch(&self) -> Self {
        self.derive(self.kind)
    }

    /// Merge the ids a branch accumulated into this context.
    pub fn absorb(&mut self, branch: RequestContext) {
        debug_assert_eq!(
            branch.trace_id, self.trace_id,
            "absorbing a context from another operation"
        );
        self.file_ids.extend(branch.file_ids);
        self.parent_ids.extend(branch.parent_ids);
    }
}
