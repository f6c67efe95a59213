//! Virtual path resolution
//!
//! Turns a slash-delimited path such as `Projects/2024/report.pdf` into a
//! Drive file id by listing each segment under its parent, starting from the
//! root of a [`SearchDomain`].
//!
//! ## Domains
//!
//! - `MyDrive` starts at the `root` alias
//! - `SharedDrive` starts at the shared drive's id, which doubles as its root
//! - `SharedWithMe` matches the first segment among items shared with the
//!   caller, then walks down
//! - `AllDrives` matches the first segment at the top of My Drive or among
//!   shared items, across every corpus, then walks down
//! - `Trash` matches the first segment anywhere in the trash, then walks down
//!
//! ## Name collisions
//!
//! Drive allows siblings with the same name. When a segment matches several
//! items the resolver picks, in order: a regular item over a shortcut, the
//! most recently modified, then the lexicographically smallest id. In
//! `AllDrives` an item in the caller's own drive is preferred before any of
//! those.
//!
//! ## Caching
//!
//! Successful resolutions are cached per `(drive id, domain, path)` for the
//! configured TTL. There is no per-segment caching.

mod cache;
mod path;

pub use cache::{PathCache, PathCacheEntry};
pub use path::{escape_query_value, normalize, segment_query, ParentClause};

use bridge_traits::time::Clock;
use core_async::sync::CancellationToken;
use core_runtime::config::ResolverConfig;
use core_runtime::logging::strip_path;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::api::{DriveApi, DriveFile};
use crate::call::DriveCall;
use crate::context::{RequestContext, RequestKind};
use crate::error::{ClassifiedError, DriveError, ErrorKind, Result};
use crate::executor::RequestExecutor;
use crate::shaper::RequestShaper;

/// Root alias of the personal drive.
pub const MY_DRIVE_ROOT: &str = "root";

/// Marker returned for an empty path in the trash domain. The trash has no
/// folder id of its own.
pub const TRASH_ROOT: &str = "trash";

/// Marker returned for an empty path in the shared-with-me domain.
pub const SHARED_WITH_ME_ROOT: &str = "shared_with_me";

const LIST_FIELDS: &str =
    "nextPageToken,files(id,name,mimeType,modifiedTime,parents,trashed,shortcutDetails(targetId))";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDomain {
    #[default]
    MyDrive,
    SharedDrive,
    SharedWithMe,
    AllDrives,
    Trash,
}

impl SearchDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchDomain::MyDrive => "my_drive",
            SearchDomain::SharedDrive => "shared_drive",
            SearchDomain::SharedWithMe => "shared_with_me",
            SearchDomain::AllDrives => "all_drives",
            SearchDomain::Trash => "trash",
        }
    }

    /// Domain implied by command flags: trash wins, then a drive id, then
    /// the include-shared-with-me flag.
    pub fn infer(drive_id: Option<&str>, trash: bool, include_shared_with_me: bool) -> Self {
        if trash {
            SearchDomain::Trash
        } else if drive_id.is_some_and(|id| !id.is_empty()) {
            SearchDomain::SharedDrive
        } else if include_shared_with_me {
            SearchDomain::AllDrives
        } else {
            SearchDomain::MyDrive
        }
    }

    /// Domain a listed file appears to belong to. Items shared with the
    /// caller come back without parents.
    pub fn of_file(file: &DriveFile) -> Self {
        if file.parents.is_empty() {
            SearchDomain::SharedWithMe
        } else {
            SearchDomain::MyDrive
        }
    }

    /// Lower is preferred when one name matches in several domains.
    pub fn priority(&self) -> u8 {
        match self {
            SearchDomain::MyDrive => 1,
            SearchDomain::SharedDrive => 2,
            SearchDomain::SharedWithMe => 3,
            SearchDomain::AllDrives => 4,
            SearchDomain::Trash => 5,
        }
    }
}

impl fmt::Display for SearchDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    pub search_domain: SearchDomain,
    /// Shared drive to search; falls back to the request context's drive
    pub drive_id: Option<String>,
    pub use_cache: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            search_domain: SearchDomain::MyDrive,
            drive_id: None,
            use_cache: true,
        }
    }
}

impl ResolveOptions {
    pub fn my_drive() -> Self {
        Self::default()
    }

    pub fn shared_drive(drive_id: impl Into<String>) -> Self {
        Self {
            search_domain: SearchDomain::SharedDrive,
            drive_id: Some(drive_id.into()),
            use_cache: true,
        }
    }

    pub fn shared_with_me() -> Self {
        Self {
            search_domain: SearchDomain::SharedWithMe,
            ..Self::default()
        }
    }

    pub fn all_drives() -> Self {
        Self {
            search_domain: SearchDomain::AllDrives,
            ..Self::default()
        }
    }

    pub fn trash() -> Self {
        Self {
            search_domain: SearchDomain::Trash,
            ..Self::default()
        }
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub file_id: String,
    pub from_cache: bool,
    pub domain: SearchDomain,
}

/// Resolves virtual paths through the shaper and executor.
pub struct PathResolver {
    api: Arc<dyn DriveApi>,
    shaper: RequestShaper,
    executor: RequestExecutor,
    cache: PathCache,
    page_size: u32,
}

impl fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathResolver")
            .field("cache", &self.cache)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl PathResolver {
    pub fn new(
        api: Arc<dyn DriveApi>,
        shaper: RequestShaper,
        executor: RequestExecutor,
        config: &ResolverConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api,
            shaper,
            executor,
            cache: PathCache::new(config.cache_ttl, clock),
            page_size: config.page_size,
        }
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    /// Resolve `path` to a file id.
    ///
    /// The resolved id is appended to `ctx`'s file ids. The listing calls run
    /// under a derived `ListOrSearch` context sharing `ctx`'s trace id.
    ///
    /// # Errors
    ///
    /// - [`DriveError::InvalidPath`] for `..` segments
    /// - [`DriveError::InvalidOptions`] for a shared-drive search without a
    ///   drive id, or a drive id on any search other than shared drive or
    ///   trash
    /// - [`DriveError::PathNotFound`] naming the first segment with no match
    /// - any classified error from the listing calls, unchanged
    /// - [`DriveError::Cancelled`] when `cancel` fires mid-walk
    #[instrument(
        name = "drive.resolve",
        skip_all,
        fields(
            trace_id = %ctx.trace_id(),
            domain = %options.search_domain,
            leaf = %strip_path(path)
        )
    )]
    pub async fn resolve(
        &self,
        cancel: &CancellationToken,
        ctx: &mut RequestContext,
        path: &str,
        options: &ResolveOptions,
    ) -> Result<Resolution> {
        let segments = normalize(path)?;
        let normalized = segments.join("/");
        let domain = options.search_domain;
        let drive_id = effective_drive_id(ctx, options)?;
        let key = PathCache::key(domain, drive_id.as_deref(), &normalized);

        if options.use_cache {
            if let Some(entry) = self.cache.get(&key) {
                debug!(file_id = %entry.file_id, "Path cache hit");
                ctx.add_file_id(entry.file_id.clone());
                return Ok(Resolution {
                    file_id: entry.file_id,
                    from_cache: true,
                    domain,
                });
            }
        }

        let root = match domain {
            SearchDomain::MyDrive | SearchDomain::AllDrives => MY_DRIVE_ROOT.to_string(),
            SearchDomain::SharedDrive => drive_id.clone().unwrap_or_default(),
            SearchDomain::SharedWithMe => SHARED_WITH_ME_ROOT.to_string(),
            SearchDomain::Trash => TRASH_ROOT.to_string(),
        };

        if segments.is_empty() {
            return Ok(Resolution {
                file_id: root,
                from_cache: false,
                domain,
            });
        }

        let base = ctx
            .derive(RequestKind::ListOrSearch)
            .with_drive_scope(drive_id.as_deref());
        let trashed = domain == SearchDomain::Trash;
        let last = segments.len() - 1;
        let mut current = root;

        for (index, segment) in segments.iter().enumerate() {
            let clause = match (domain, index) {
                (SearchDomain::Trash, 0) => ParentClause::Anywhere,
                (SearchDomain::SharedWithMe, 0) => ParentClause::SharedWithMe,
                (SearchDomain::AllDrives, 0) => ParentClause::RootOrSharedWithMe,
                _ => ParentClause::Under(current.as_str()),
            };

            let mut walk_ctx = base.clone();
            if let ParentClause::Under(parent) = clause {
                walk_ctx.add_parent_id(parent);
            }

            let query = segment_query(segment, clause, trashed);
            let matches = self.list_all(cancel, &walk_ctx, domain, query).await?;

            let Some(chosen) = pick_match(matches, segment, domain) else {
                return Err(DriveError::PathNotFound {
                    segment: segment.clone(),
                    resolved: segments[..index].join("/"),
                    domain,
                    trace_id: ctx.trace_id(),
                });
            };

            // Intermediate shortcuts are followed to their target folder
            current = match (&chosen.shortcut_target_id, index < last) {
                (Some(target), true) if chosen.is_shortcut() => target.clone(),
                _ => chosen.id,
            };
        }

        self.cache.insert(key, current.clone(), domain);
        ctx.add_file_id(current.clone());
        debug!(file_id = %current, segments = segments.len(), "Path resolved");

        Ok(Resolution {
            file_id: current,
            from_cache: false,
            domain,
        })
    }

    /// Drop the cached resolution for `path` under `options`.
    pub fn invalidate(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &ResolveOptions,
    ) -> Result<bool> {
        let normalized = normalize(path)?.join("/");
        let drive_id = effective_drive_id(ctx, options)?;
        let key = PathCache::key(options.search_domain, drive_id.as_deref(), &normalized);
        Ok(self.cache.invalidate(&key))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Every match for `query`, following page tokens until exhausted.
    ///
    /// A page token the server already handed out fails the listing rather
    /// than looping.
    async fn list_all(
        &self,
        cancel: &CancellationToken,
        ctx: &RequestContext,
        domain: SearchDomain,
        query: String,
    ) -> Result<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let mut call = DriveCall::list_files(query.clone())
                .param("pageSize", self.page_size.to_string())
                .param("fields", LIST_FIELDS);
            if let Some(token) = &page_token {
                call = call.param("pageToken", token.clone());
            }

            let shaped = match domain {
                SearchDomain::AllDrives => self.shaper.shape_all_drives(call, ctx),
                _ => self.shaper.shape(call, ctx),
            };
            let page = self
                .executor
                .execute(cancel, ctx, || self.api.list_files(shaped.clone()))
                .await?;

            files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    if !seen_tokens.insert(token.clone()) {
                        warn!(pages = seen_tokens.len(), "Listing repeated a page token");
                        return Err(ClassifiedError::new(
                            ErrorKind::Unknown,
                            "listing returned a page token it already returned",
                        )
                        .with_trace_id(ctx.trace_id())
                        .with_context("request_kind", ctx.kind().as_str())
                        .into());
                    }
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(files)
    }
}

/// Drive id the walk is scoped to, validated against the domain.
fn effective_drive_id(ctx: &RequestContext, options: &ResolveOptions) -> Result<Option<String>> {
    let explicit = options.drive_id.as_deref().filter(|id| !id.is_empty());

    match options.search_domain {
        SearchDomain::MyDrive | SearchDomain::SharedWithMe | SearchDomain::AllDrives => {
            if let Some(id) = explicit {
                return Err(DriveError::InvalidOptions(format!(
                    "drive id '{}' given for a {} search",
                    id, options.search_domain
                )));
            }
            Ok(None)
        }
        SearchDomain::SharedDrive => explicit
            .or(ctx.drive_id())
            .map(|id| Some(id.to_string()))
            .ok_or_else(|| {
                DriveError::InvalidOptions("shared drive search requires a drive id".to_string())
            }),
        SearchDomain::Trash => Ok(explicit.or(ctx.drive_id()).map(str::to_string)),
    }
}

/// Deterministic choice among same-named siblings.
fn pick_match(
    mut matches: Vec<DriveFile>,
    segment: &str,
    domain: SearchDomain,
) -> Option<DriveFile> {
    if matches.len() > 1 {
        warn!(
            candidates = matches.len(),
            segment = %segment,
            "Name collision, picking deterministically"
        );
    }

    let rank = |file: &DriveFile| match domain {
        SearchDomain::AllDrives => SearchDomain::of_file(file).priority(),
        _ => 0,
    };

    matches.sort_by(|a, b| {
        (rank(a), a.is_shortcut(), Reverse(a.modified_time), &a.id).cmp(&(
            rank(b),
            b.is_shortcut(),
            Reverse(b.modified_time),
            &b.id,
        ))
    });
    matches.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FOLDER_MIME_TYPE, SHORTCUT_MIME_TYPE};
    use chrono::{TimeZone, Utc};

    fn file(id: &str, mime: &str, modified_secs: Option<i64>) -> DriveFile {
        DriveFile {
            id: id.to_string(),
            name: "dup".to_string(),
            mime_type: mime.to_string(),
            modified_time: modified_secs.and_then(|s| Utc.timestamp_opt(s, 0).single()),
            parents: vec!["root".to_string()],
            trashed: false,
            shortcut_target_id: None,
        }
    }

    #[test]
    fn test_pick_prefers_non_shortcut() {
        let chosen = pick_match(
            vec![
                file("a", SHORTCUT_MIME_TYPE, Some(200)),
                file("b", FOLDER_MIME_TYPE, Some(100)),
            ],
            "dup",
            SearchDomain::MyDrive,
        )
        .unwrap();
        assert_eq!(chosen.id, "b");
    }

    #[test]
    fn test_pick_prefers_most_recent_then_smallest_id() {
        let chosen = pick_match(
            vec![
                file("c", FOLDER_MIME_TYPE, Some(100)),
                file("b", FOLDER_MIME_TYPE, Some(300)),
                file("a", FOLDER_MIME_TYPE, None),
            ],
            "dup",
            SearchDomain::MyDrive,
        )
        .unwrap();
        assert_eq!(chosen.id, "b");

        let chosen = pick_match(
            vec![
                file("z", FOLDER_MIME_TYPE, Some(100)),
                file("m", FOLDER_MIME_TYPE, Some(100)),
            ],
            "dup",
            SearchDomain::MyDrive,
        )
        .unwrap();
        assert_eq!(chosen.id, "m");
    }

    #[test]
    fn test_pick_is_order_independent() {
        let a = vec![
            file("x", FOLDER_MIME_TYPE, Some(5)),
            file("y", FOLDER_MIME_TYPE, Some(5)),
            file("w", SHORTCUT_MIME_TYPE, Some(9)),
        ];
        let mut b = a.clone();
        b.reverse();

        assert_eq!(
            pick_match(a, "dup", SearchDomain::MyDrive),
            pick_match(b, "dup", SearchDomain::MyDrive)
        );
    }

    #[test]
    fn test_pick_empty_is_none() {
        assert_eq!(pick_match(Vec::new(), "dup", SearchDomain::MyDrive), None);
    }

    #[test]
    fn test_infer_domain() {
        assert_eq!(SearchDomain::infer(None, false, false), SearchDomain::MyDrive);
        assert_eq!(SearchDomain::infer(Some(""), false, false), SearchDomain::MyDrive);
        assert_eq!(SearchDomain::infer(Some("0A"), false, false), SearchDomain::SharedDrive);
        assert_eq!(SearchDomain::infer(Some("0A"), false, true), SearchDomain::SharedDrive);
        assert_eq!(SearchDomain::infer(None, false, true), SearchDomain::AllDrives);
        assert_eq!(SearchDomain::infer(Some("0A"), true, true), SearchDomain::Trash);
    }

    #[test]
    fn test_effective_drive_id_rules() {
        let ctx = RequestContext::new("p", RequestKind::GetById).with_drive_id("ctx-drive");

        assert_eq!(
            effective_drive_id(&ctx, &ResolveOptions::shared_drive("opt-drive")).unwrap(),
            Some("opt-drive".to_string())
        );
        assert_eq!(
            effective_drive_id(
                &ctx,
                &ResolveOptions {
                    search_domain: SearchDomain::SharedDrive,
                    drive_id: None,
                    use_cache: true
                }
            )
            .unwrap(),
            Some("ctx-drive".to_string())
        );
        assert_eq!(effective_drive_id(&ctx, &ResolveOptions::my_drive()).unwrap(), None);

        let bare = RequestContext::new("p", RequestKind::GetById);
        let missing = ResolveOptions {
            search_domain: SearchDomain::SharedDrive,
            drive_id: None,
            use_cache: true,
        };
        assert!(matches!(
            effective_drive_id(&bare, &missing),
            Err(DriveError::InvalidOptions(_))
        ));

        let conflicting = ResolveOptions {
            drive_id: Some("0A".to_string()),
            ..ResolveOptions::my_drive()
        };
        assert!(effective_drive_id(&bare, &conflicting).is_err());
    }

    #[test]
    fn test_file_domain_from_parents() {
        assert_eq!(
            SearchDomain::of_file(&file("a", FOLDER_MIME_TYPE, None)),
            SearchDomain::MyDrive
        );

        let mut orphan = file("b", FOLDER_MIME_TYPE, None);
        orphan.parents.clear();
        assert_eq!(SearchDomain::of_file(&orphan), SearchDomain::SharedWithMe);

        assert!(SearchDomain::MyDrive.priority() < SearchDomain::SharedDrive.priority());
        assert!(SearchDomain::SharedDrive.priority() < SearchDomain::SharedWithMe.priority());
    }

    #[test]
    fn test_all_drives_prefers_own_drive() {
        let mut shared = file("a-shared", FOLDER_MIME_TYPE, Some(900));
        shared.parents.clear();
        let own = file("z-own", FOLDER_MIME_TYPE, Some(100));

        let chosen = pick_match(
            vec![shared.clone(), own.clone()],
            "dup",
            SearchDomain::AllDrives,
        )
        .unwrap();
        assert_eq!(chosen.id, "z-own");

        // Outside AllDrives the newer item wins as usual
        let chosen = pick_match(vec![shared, own], "dup", SearchDomain::SharedWithMe).unwrap();
        assert_eq!(chosen.id, "a-shared");
    }

    #[test]
    fn test_drive_id_rejected_for_unscoped_domains() {
        let bare = RequestContext::new("p", RequestKind::GetById);
        for domain in [SearchDomain::SharedWithMe, SearchDomain::AllDrives] {
            let options = ResolveOptions {
                search_domain: domain,
                drive_id: Some("0A".to_string()),
                use_cache: true,
            };
            assert!(matches!(
                effective_drive_id(&bare, &options),
                Err(DriveError::InvalidOptions(_))
            ));
        }

        let scoped = RequestContext::new("p", RequestKind::GetById).with_drive_id("0A");
        assert_eq!(
            effective_drive_id(&scoped, &ResolveOptions::all_drives()).unwrap(),
            None
        );
    }
}
