//! Resource key registry
//!
//! Link-shared items created before Drive's 2021 security update can only be
//! opened with both the file id and its resource key. Keys are registered
//! explicitly or parsed from share links and live for the whole process.

use core_runtime::logging::redact_if_sensitive;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use url::Url;

/// Request header carrying `id/key` pairs.
pub const RESOURCE_KEYS_HEADER: &str = "X-Goog-Drive-Resource-Keys";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceKeyEntry {
    pub file_id: String,
    pub resource_key: String,
    pub origin_link: Option<String>,
}

/// Thread-safe map of file id to resource key.
#[derive(Debug, Default)]
pub struct ResourceKeyStore {
    entries: RwLock<HashMap<String, ResourceKeyEntry>>,
}

impl ResourceKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the key for `file_id`.
    ///
    /// Empty ids or keys are ignored.
    pub fn add_key(&self, file_id: &str, resource_key: &str, origin_link: Option<&str>) {
        if file_id.is_empty() || resource_key.is_empty() {
            return;
        }

        debug!(
            file_id,
            resource_key = %redact_if_sensitive("resource_key", resource_key),
            "Registered resource key"
        );

        self.entries.write().insert(
            file_id.to_string(),
            ResourceKeyEntry {
                file_id: file_id.to_string(),
                resource_key: resource_key.to_string(),
                origin_link: origin_link.map(str::to_string),
            },
        );
    }

    pub fn get_key(&self, file_id: &str) -> Option<String> {
        self.entries
            .read()
            .get(file_id)
            .map(|entry| entry.resource_key.clone())
    }

    pub fn get_entry(&self, file_id: &str) -> Option<ResourceKeyEntry> {
        self.entries.read().get(file_id).cloned()
    }

    /// Extract `(file id, resource key)` from a share link.
    ///
    /// Understands `/file/d/<id>/…`, `/drive/folders/<id>`, the editor forms
    /// (`/document/d/<id>`, `/spreadsheets/d/<id>`, `/presentation/d/<id>`)
    /// and `?id=<id>`. The key is read from the `resourcekey` query parameter
    /// or, failing that, from the fragment. Returns `None` when the link has
    /// no key (the common case) or no recognizable id.
    pub fn parse_from_link(&self, link: &str) -> Option<ResourceKeyEntry> {
        parse_link(link)
    }

    /// Parse a link and register its key. Returns whether a key was found.
    pub fn register_link(&self, link: &str) -> bool {
        match parse_link(link) {
            Some(entry) => {
                self.add_key(
                    &entry.file_id,
                    &entry.resource_key,
                    entry.origin_link.as_deref(),
                );
                true
            }
            None => false,
        }
    }

    /// Value for [`RESOURCE_KEYS_HEADER`] covering `file_ids`.
    ///
    /// Ids without a key are skipped and repeated ids collapse to one pair.
    /// `None` when no id has a key.
    pub fn build_header<'a, I>(&self, file_ids: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let entries = self.entries.read();
        let mut seen = HashSet::new();
        let pairs: Vec<String> = file_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| {
                entries
                    .get(id)
                    .map(|entry| format!("{}/{}", entry.file_id, entry.resource_key))
            })
            .collect();

        (!pairs.is_empty()).then(|| pairs.join(","))
    }

    /// Forget the key for `file_id`, returning whether one was registered.
    pub fn invalidate(&self, file_id: &str) -> bool {
        self.entries.write().remove(file_id).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of all entries, sorted by file id.
    pub fn entries(&self) -> Vec<ResourceKeyEntry> {
        let mut entries: Vec<_> = self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| a.file_id.cmp(&b.file_id));
        entries
    }
}

fn parse_link(link: &str) -> Option<ResourceKeyEntry> {
    let trimmed = link.trim();
    let url = Url::parse(trimmed)
        .or_else(|_| Url::parse(&format!("https://{}", trimmed)))
        .ok()?;

    let query_param = |name: &str| {
        url.query_pairs()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    };

    let resource_key = query_param("resourcekey").or_else(|| {
        url.fragment().and_then(|fragment| {
            url::form_urlencoded::parse(fragment.as_bytes())
                .find(|(key, value)| key == "resourcekey" && !value.is_empty())
                .map(|(_, value)| value.into_owned())
        })
    })?;

    let file_id = id_from_path(&url).or_else(|| query_param("id"))?;

    Some(ResourceKeyEntry {
        file_id,
        resource_key,
        origin_link: Some(trimmed.to_string()),
    })
}

fn id_from_path(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    segments.windows(2).find_map(|pair| match pair {
        ["d", id] | ["folders", id] => Some((*id).to_string()),
        _ => None,
    })
}
