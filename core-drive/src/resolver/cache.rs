//! Time-limited path cache
//!
//! A plain map keyed by `"{drive id}:{domain}:{path}"`. Entries are never
//! updated in place: an expired entry reads as absent and the next successful
//! resolution overwrites it.

use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::SearchDomain;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCacheEntry {
    pub key: String,
    pub file_id: String,
    pub domain: SearchDomain,
    pub inserted_at: DateTime<Utc>,
}

pub struct PathCache {
    entries: RwLock<HashMap<String, PathCacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCache")
            .field("entries", &self.entries.read().len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl PathCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Composite key for a normalized path.
    pub fn key(domain: SearchDomain, drive_id: Option<&str>, normalized_path: &str) -> String {
        format!(
            "{}:{}:{}",
            drive_id.unwrap_or(""),
            domain.as_str(),
            normalized_path
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<PathCacheEntry> {
        let now = self.clock.now();
        self.entries
            .read()
            .get(key)
            .filter(|entry| self.is_live(entry, now))
            .cloned()
    }

    pub fn insert(&self, key: String, file_id: impl Into<String>, domain: SearchDomain) {
        let entry = PathCacheEntry {
            key: key.clone(),
            file_id: file_id.into(),
            domain,
            inserted_at: self.clock.now(),
        };
        self.entries.write().insert(key, entry);
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Entries stored, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop expired entries, returning how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| self.is_live(entry, now));
        before - entries.len()
    }

    fn is_live(&self, entry: &PathCacheEntry, now: DateTime<Utc>) -> bool {
        match (now - entry.inserted_at).to_std() {
            Ok(age) => age < self.ttl,
            // Clock stepped backwards; treat as fresh
            Err(_) => true,
        }
    }
}
