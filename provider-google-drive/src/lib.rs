//! # Google Drive Provider
//!
//! Drive v3 transport glue for the core.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GoogleDriveConnector`], a [`DriveApi`](core_drive::DriveApi) over any
//!   [`HttpClient`](bridge_traits::http::HttpClient)
//! - Wire types for `files.list` / `files.get` responses
//! - Parsing of Google error envelopes and `Retry-After` hints into
//!   [`RemoteFailure`](core_drive::RemoteFailure) values the classifier
//!   understands
//!
//! Every method makes exactly one HTTP exchange. Retries, shaping and
//! cancellation belong to `core-drive`.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::GoogleDriveConnector;
pub use error::{failure_from_response, GoogleDriveError, Result};
pub use types::{FileResource, FilesListResponse};
