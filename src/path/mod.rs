//! Dot-separated paths
//!
//! Two independent resolvers share only segment splitting: one walks
//! descriptors (schema side), the other walks live values (document side).

mod document;
mod schema;

pub use document::{get, get_mut, remove, set};
pub use schema::{resolve_attr_path, resolve_schema_path, update_candidates};

use thiserror::Error;

/// Result type for document path operations
pub type PathResult<T> = Result<T, PathError>;

/// Document-side path failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Segment '{segment}' of path '{path}' does not exist")]
    NotFound { path: String, segment: String },

    #[error("Segment '{segment}' of path '{path}' descends into a {found}")]
    NotContainer {
        path: String,
        segment: String,
        found: &'static str,
    },
}

/// Splits on `.`; the empty path has no segments
pub(crate) fn split_segments(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    }
}

/// Numeric list index; signs and leading `+` are rejected
pub(crate) fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_segments() {
        assert_eq!(split_segments("a.0.b"), vec!["a", "0", "b"]);
        assert!(split_segments("").is_empty());
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("12"), Some(12));
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index("+1"), None);
        assert_eq!(parse_index("x"), None);
    }
}
