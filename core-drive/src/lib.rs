//! # Drive Core
//!
//! Resilient request execution and virtual-path resolution for the Drive v3
//! API.
//!
//! ## Overview
//!
//! - [`classifier`] - maps failed calls to a closed [`ErrorKind`] taxonomy
//! - [`resource_keys`] - registry of link-sharing resource keys
//! - [`shaper`] - adds shared-drive scope and resource-key headers to calls
//! - [`executor`] - retries transient failures with backoff, honoring
//!   cancellation
//! - [`resolver`] - walks `a/b/c` paths to file ids with a TTL cache
//!
//! ## Data flow
//!
//! ```text
//! DriveCall ──shape──▶ DriveCall' ──execute(thunk)──▶ T | DriveError
//!                                        ▲
//!                  PathResolver ─────────┘ (one listing walk per segment)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use core_drive::{PathResolver, RequestContext, RequestKind, ResolveOptions};
//!
//! let mut ctx = RequestContext::new("default", RequestKind::GetById);
//! let resolution = resolver
//!     .resolve(&cancel, &mut ctx, "Projects/2024/report.pdf", &ResolveOptions::my_drive())
//!     .await?;
//! ```

pub mod api;
pub mod call;
pub mod classifier;
pub mod context;
pub mod error;
pub mod executor;
pub mod resolver;
pub mod resource_keys;
pub mod shaper;

pub use api::{DriveApi, DriveFile, FileListPage};
pub use call::DriveCall;
pub use classifier::{check_export_size, classify, classify_failure, Classification};
pub use context::{RequestContext, RequestKind};
pub use error::{ClassifiedError, DriveError, ErrorKind, RemoteFailure, Result};
pub use executor::RequestExecutor;
pub use resolver::{PathResolver, Resolution, ResolveOptions, SearchDomain};
pub use resource_keys::{ResourceKeyEntry, ResourceKeyStore, RESOURCE_KEYS_HEADER};
pub use shaper::RequestShaper;
