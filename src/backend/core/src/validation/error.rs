//! Validation error types with field-level error support.
//!
//! This module provides:
//! - Field-level error tracking with dotted key paths (e.g. "doc.items.0.qty")
//! - Deterministic first-inserted-first-iterated ordering
//! - Key rewriting: prefixing and exact/boundary renames for composing
//!   nested-entity results into a parent's error set

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Kinds
// ═══════════════════════════════════════════════════════════════════════════════

/// The kind of validation error that occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Field is required but was missing or empty.
    Required,
    /// Value must be a scalar (or null), not a nested structure.
    Scalar,
    /// String length is below the minimum.
    MinLength { min: usize, actual: usize },
    /// String length exceeds the maximum.
    MaxLength { max: usize, actual: usize },
    /// Numeric value is below the minimum.
    MinValue { min: String, actual: String },
    /// Numeric value exceeds the maximum.
    MaxValue { max: String, actual: String },
    /// Value does not match the expected email format.
    InvalidEmail,
    /// Value does not match the expected pattern.
    Pattern { pattern: String },
    /// Value is not in the allowed set.
    NotInSet { allowed: Vec<String> },
    /// Field is derived by the system and may not be supplied by callers.
    Calculated,
    /// Field is immutable once the entity has been persisted.
    Unchangeable,
    /// A uniqueness constraint found a conflicting row.
    Unique,
    /// Custom validation failed.
    Custom { code: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "field is required"),
            Self::Scalar => write!(f, "must be scalar"),
            Self::MinLength { min, actual } => {
                write!(f, "must be at least {} characters (got {})", min, actual)
            }
            Self::MaxLength { max, actual } => {
                write!(f, "must be at most {} characters (got {})", max, actual)
            }
            Self::MinValue { min, actual } => {
                write!(f, "must be at least {} (got {})", min, actual)
            }
            Self::MaxValue { max, actual } => {
                write!(f, "must be at most {} (got {})", max, actual)
            }
            Self::InvalidEmail => write!(f, "must be a valid email address"),
            Self::Pattern { pattern } => write!(f, "must match pattern: {}", pattern),
            Self::NotInSet { allowed } => {
                write!(f, "must be one of: {}", allowed.join(", "))
            }
            Self::Calculated => write!(f, "calculated automatically"),
            Self::Unchangeable => write!(f, "cannot be changed"),
            Self::Unique => write!(f, "must be unique"),
            Self::Custom { code } => write!(f, "validation failed: {}", code),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Field Error
// ═══════════════════════════════════════════════════════════════════════════════

/// A single validation error for a specific field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// The kind of validation error.
    pub kind: ErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl FieldError {
    /// Create a new field error with the kind's default message.
    pub fn new(kind: ErrorKind) -> Self {
        let message = kind.to_string();
        Self { kind, message }
    }

    /// Create a new field error with a custom message.
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Bag
// ═══════════════════════════════════════════════════════════════════════════════

/// A collection of validation errors organized by dotted field key.
///
/// Iteration order is deterministic: keys come back in the order they were
/// first inserted, and messages accumulate under the same key instead of
/// creating duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorBag {
    entries: Vec<(String, Vec<FieldError>)>,
}

impl ErrorBag {
    /// Create a new empty error bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there are any validation errors.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the total number of errors across all fields.
    pub fn error_count(&self) -> usize {
        self.entries.iter().map(|(_, v)| v.len()).sum()
    }

    /// Get the number of fields with errors.
    pub fn field_count(&self) -> usize {
        self.entries.len()
    }

    /// Append an error for a specific field key.
    pub fn add(&mut self, key: impl Into<String>, error: FieldError) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, errors)) => errors.push(error),
            None => self.entries.push((key, vec![error])),
        }
    }

    /// Append an error with just the kind (auto-generates the message).
    pub fn add_kind(&mut self, key: impl Into<String>, kind: ErrorKind) {
        self.add(key, FieldError::new(kind));
    }

    /// Append an error with a custom message.
    pub fn add_with_message(
        &mut self,
        key: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) {
        self.add(key, FieldError::with_message(kind, message));
    }

    /// Get the errors for a specific field key.
    pub fn get(&self, key: &str) -> Option<&[FieldError]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Check if a specific field key has errors.
    pub fn has_errors(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Merge another bag into this one, concatenating message lists by key
    /// and preserving order. Keys are never duplicated.
    pub fn merge(&mut self, other: ErrorBag) {
        for (key, errors) in other.entries {
            match self.entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, existing)) => existing.extend(errors),
                None => self.entries.push((key, errors)),
            }
        }
    }

    /// Rewrite every key by prepending `prefix` plus a dot separator.
    pub fn prefix(&mut self, prefix: &str) {
        if prefix.is_empty() {
            return;
        }
        for (key, _) in &mut self.entries {
            *key = if key.is_empty() {
                prefix.to_string()
            } else {
                format!("{}.{}", prefix, key)
            };
        }
        self.coalesce();
    }

    /// Consuming variant of [`prefix`](Self::prefix).
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.prefix(prefix);
        self
    }

    /// Rename `from` to `to` in every key: exact matches, `from.` prefixes,
    /// `.from` suffixes and `.from.` interior occurrences. Renaming an
    /// interior or boundary segment to the empty string removes the segment
    /// and collapses to a single separator.
    pub fn rename_key(&mut self, from: &str, to: &str) {
        for (key, _) in &mut self.entries {
            *key = rename_one(key, from, to);
        }
        self.coalesce();
    }

    /// Iterate over `(key, errors)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldError])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// All field keys with errors, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Get the first error in insertion order.
    pub fn first_error(&self) -> Option<(&str, &FieldError)> {
        self.entries
            .first()
            .and_then(|(k, v)| v.first().map(|e| (k.as_str(), e)))
    }

    /// Convert to an ordered list of `(key, messages)` pairs.
    pub fn to_message_map(&self) -> Vec<(String, Vec<String>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().map(|e| e.message.clone()).collect()))
            .collect()
    }

    /// Convert to a flat list of `key: message` strings.
    pub fn to_flat_messages(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|(k, v)| v.iter().map(move |e| format!("{}: {}", k, e.message)))
            .collect()
    }

    /// Re-merge entries whose keys collided after a rewrite, keeping the
    /// position of the first occurrence.
    fn coalesce(&mut self) {
        let mut merged: Vec<(String, Vec<FieldError>)> = Vec::with_capacity(self.entries.len());
        for (key, errors) in self.entries.drain(..) {
            match merged.iter_mut().find(|(k, _)| *k == key) {
                Some((_, existing)) => existing.extend(errors),
                None => merged.push((key, errors)),
            }
        }
        self.entries = merged;
    }
}

fn rename_one(key: &str, from: &str, to: &str) -> String {
    if key == from {
        return to.to_string();
    }

    let mut out = key.to_string();

    let head = format!("{}.", from);
    if let Some(rest) = out.strip_prefix(&head) {
        out = if to.is_empty() {
            rest.to_string()
        } else {
            format!("{}.{}", to, rest)
        };
    }

    let tail = format!(".{}", from);
    if let Some(base) = out.strip_suffix(&tail) {
        out = if to.is_empty() {
            base.to_string()
        } else {
            format!("{}.{}", base, to)
        };
    }

    let interior = format!(".{}.", from);
    if out.contains(&interior) {
        let replacement = if to.is_empty() {
            ".".to_string()
        } else {
            format!(".{}.", to)
        };
        out = out.replace(&interior, &replacement);
    }

    out
}

impl fmt::Display for ErrorBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_flat_messages().join("; "))
    }
}

impl std::error::Error for ErrorBag {}

impl IntoIterator for ErrorBag {
    type Item = (String, Vec<FieldError>);
    type IntoIter = std::vec::IntoIter<(String, Vec<FieldError>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for ErrorBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, errors) in &self.entries {
            map.serialize_entry(key, errors)?;
        }
        map.end()
    }
}

/// Result type for individual validation operations.
pub type ValidationResult<T> = std::result::Result<T, ErrorBag>;

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut bag = ErrorBag::new();
        bag.add_kind("email", ErrorKind::Required);
        bag.add_kind("name", ErrorKind::MinLength { min: 2, actual: 1 });

        assert_eq!(bag.field_count(), 2);
        assert_eq!(bag.error_count(), 2);
        assert!(bag.has_errors("email"));
        assert!(bag.has_errors("name"));
        assert!(!bag.has_errors("other"));
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut bag = ErrorBag::new();
        bag.add_kind("c", ErrorKind::Required);
        bag.add_kind("a", ErrorKind::Required);
        bag.add_kind("b", ErrorKind::Required);
        bag.add_kind("a", ErrorKind::Scalar);

        let keys: Vec<_> = bag.keys().collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
        assert_eq!(bag.get("a").unwrap().len(), 2);
    }

    #[test]
    fn test_merge_accumulates_under_same_key() {
        let mut bag1 = ErrorBag::new();
        bag1.add_kind("field", ErrorKind::Required);

        let mut bag2 = ErrorBag::new();
        bag2.add_kind("field", ErrorKind::MinLength { min: 3, actual: 0 });
        bag2.add_kind("other", ErrorKind::Required);

        bag1.merge(bag2);
        assert_eq!(bag1.field_count(), 2);
        assert_eq!(bag1.get("field").unwrap().len(), 2);
    }

    #[test]
    fn test_prefix() {
        let mut bag = ErrorBag::new();
        bag.add_kind("street", ErrorKind::Required);
        bag.add_kind("city", ErrorKind::Required);

        bag.prefix("address");
        assert!(bag.has_errors("address.street"));
        assert!(bag.has_errors("address.city"));
    }

    #[test]
    fn test_prefix_round_trip_via_rename() {
        let mut bag = ErrorBag::new();
        bag.add_kind("amount", ErrorKind::Unchangeable);
        bag.add_kind("name", ErrorKind::Required);

        bag.prefix("user");
        assert!(bag.has_errors("user.amount"));

        bag.rename_key("user", "");
        let keys: Vec<_> = bag.keys().collect();
        assert_eq!(keys, vec!["amount", "name"]);
    }

    #[test]
    fn test_rename_key_exact() {
        let mut bag = ErrorBag::new();
        bag.add_kind("old", ErrorKind::Required);
        bag.rename_key("old", "new");
        assert!(bag.has_errors("new"));
        assert!(!bag.has_errors("old"));
    }

    #[test]
    fn test_rename_key_suffix_and_interior() {
        let mut bag = ErrorBag::new();
        bag.add_kind("doc.old", ErrorKind::Required);
        bag.add_kind("doc.old.qty", ErrorKind::Required);

        bag.rename_key("old", "items");
        assert!(bag.has_errors("doc.items"));
        assert!(bag.has_errors("doc.items.qty"));
    }

    #[test]
    fn test_rename_interior_to_empty_collapses_separator() {
        let mut bag = ErrorBag::new();
        bag.add_kind("doc.old.qty", ErrorKind::Required);
        bag.rename_key("old", "");
        assert!(bag.has_errors("doc.qty"));
    }

    #[test]
    fn test_rename_merges_colliding_keys() {
        let mut bag = ErrorBag::new();
        bag.add_kind("a", ErrorKind::Required);
        bag.add_kind("b", ErrorKind::Scalar);
        bag.rename_key("b", "a");

        assert_eq!(bag.field_count(), 1);
        assert_eq!(bag.get("a").unwrap().len(), 2);
    }

    #[test]
    fn test_serialize_keeps_order() {
        let mut bag = ErrorBag::new();
        bag.add_kind("z", ErrorKind::Required);
        bag.add_kind("a", ErrorKind::Required);

        let json = serde_json::to_string(&bag).unwrap();
        let z = json.find("\"z\"").unwrap();
        let a = json.find("\"a\"").unwrap();
        assert!(z < a);
    }

    #[test]
    fn test_first_error_and_display() {
        let mut bag = ErrorBag::new();
        bag.add_kind("name", ErrorKind::Required);
        let (key, error) = bag.first_error().unwrap();
        assert_eq!(key, "name");
        assert_eq!(error.kind, ErrorKind::Required);
        assert!(bag.to_string().contains("name"));
    }
}
