//! Path normalization and listing queries

use crate::error::{DriveError, Result};

/// Split a slash-delimited path into segments.
///
/// Surrounding whitespace, empty segments and `.` are dropped. `..` is
/// rejected: virtual paths are always walked downward from a root.
pub fn normalize(path: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();

    for segment in path.trim().split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(DriveError::InvalidPath(format!(
                    "'..' is not supported in '{}'",
                    path
                )))
            }
            name if name.contains('\0') => {
                return Err(DriveError::InvalidPath(
                    "path segments cannot contain NUL".to_string(),
                ))
            }
            name => segments.push(name.to_string()),
        }
    }

    Ok(segments)
}

/// Escape a value for use inside a single-quoted Drive query literal.
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Where a listed segment must live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentClause<'a> {
    /// Direct child of the given folder id
    Under(&'a str),
    /// No location constraint (first segment of a trash walk)
    Anywhere,
    /// Items other users shared with the caller
    SharedWithMe,
    /// Top of My Drive or shared with the caller
    RootOrSharedWithMe,
}

/// Search expression matching `name` at `clause`.
pub fn segment_query(name: &str, clause: ParentClause<'_>, trashed: bool) -> String {
    let mut query = format!("name = '{}'", escape_query_value(name));
    match clause {
        ParentClause::Under(parent) => {
            query.push_str(&format!(" and '{}' in parents", escape_query_value(parent)));
        }
        ParentClause::Anywhere => {}
        ParentClause::SharedWithMe => query.push_str(" and sharedWithMe = true"),
        ParentClause::RootOrSharedWithMe => {
            query.push_str(" and ('root' in parents or sharedWithMe = true)")
        }
    }
    query.push_str(if trashed {
        " and trashed = true"
    } else {
        " and trashed = false"
    });
    query
}
