//! Dotted glob pattern matching over document paths.
//!
//! Patterns use `.` as the segment separator and `*` as either a
//! single-segment wildcard or, when the whole pattern is `*`, an
//! unconditional match at any depth.

use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Path Keys
// ═══════════════════════════════════════════════════════════════════════════════

/// One step in a concrete document path: a map key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    Key(String),
    Index(usize),
}

impl PathKey {
    /// Compare against a pattern segment. Indices stringify for comparison.
    fn segment_matches(&self, segment: &str) -> bool {
        if segment == "*" {
            return true;
        }
        match self {
            Self::Key(key) => key == segment,
            Self::Index(index) => {
                segment.parse::<usize>().is_ok_and(|parsed| parsed == *index)
            }
        }
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathKey {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Render a concrete path as a dotted string (for error keys and logging).
pub fn join_path(path: &[PathKey]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

// ═══════════════════════════════════════════════════════════════════════════════
// Matching
// ═══════════════════════════════════════════════════════════════════════════════

/// Match a dotted glob pattern against a concrete path.
///
/// A bare `"*"` matches any path unconditionally. Otherwise the pattern's
/// segment count must equal the path length exactly (no prefix or suffix
/// matching), and each segment must equal the corresponding path key or be
/// the `*` wildcard. Segments are compared from the tail.
pub fn matches(pattern: &str, path: &[PathKey]) -> bool {
    if pattern == "*" {
        return true;
    }

    let segments: Vec<&str> = pattern.split('.').collect();
    if segments.len() != path.len() {
        return false;
    }

    segments
        .iter()
        .rev()
        .zip(path.iter().rev())
        .all(|(segment, key)| key.segment_matches(segment))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn path(keys: &[&str]) -> Vec<PathKey> {
        keys.iter().map(|k| PathKey::from(*k)).collect()
    }

    #[test]
    fn test_bare_wildcard_matches_anything() {
        assert!(matches("*", &path(&["a"])));
        assert!(matches("*", &path(&["a", "b", "c"])));
        assert!(matches("*", &[]));
    }

    #[test]
    fn test_exact_segment_count_is_required() {
        // Two pattern segments against a three-segment path never match,
        // even though the tail lines up.
        assert!(!matches("a.*", &path(&["x", "a", "b"])));
        assert!(matches("a.*", &path(&["a", "b"])));
        assert!(!matches("a.b", &path(&["a"])));
    }

    #[test]
    fn test_segment_wildcard() {
        assert!(matches("a.*.c", &path(&["a", "b", "c"])));
        assert!(!matches("a.*.c", &path(&["a", "b", "d"])));
    }

    #[test]
    fn test_index_segments_stringify() {
        let p = vec![PathKey::from("items"), PathKey::from(0), PathKey::from("qty")];
        assert!(matches("items.0.qty", &p));
        assert!(matches("items.*.qty", &p));
        assert!(!matches("items.1.qty", &p));
    }

    #[test]
    fn test_join_path() {
        let p = vec![PathKey::from("$"), PathKey::from("items"), PathKey::from(2)];
        assert_eq!(join_path(&p), "$.items.2");
    }
}
