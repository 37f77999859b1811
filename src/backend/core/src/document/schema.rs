//! Per-document-column normalization schema.
//!
//! A [`DocumentSchema`] declares, as dotted glob patterns rooted at `$`, the
//! paths inside a document column that should be null-normalized, purged,
//! cast, sorted or reindexed before validation and storage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::document::cast::Cast;
use crate::document::path::{matches, PathKey};
use crate::error::{ErrorCode, Result, VetterError};

// ═══════════════════════════════════════════════════════════════════════════════
// Document Schema
// ═══════════════════════════════════════════════════════════════════════════════

/// Declarative normalization rules for one document-typed column.
///
/// Patterns are declared rooted at `$` (the document itself), e.g. `$.qty`
/// or `$.items.*.price`. The bare pattern `*` matches every path at any
/// depth in every rule set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DocumentSchemaSpec")]
pub struct DocumentSchema {
    /// Paths where an empty string or empty collection becomes null.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) nullable: Vec<String>,
    /// Paths where a null value is deleted outright.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) purges: Vec<String>,
    /// Paths with a scalar cast to apply.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) types: BTreeMap<String, Cast>,
    /// List-valued paths ordered by value.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) sorts: Vec<String>,
    /// Paths reindexed to a dense zero-based sequence.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) lists: Vec<String>,
}

impl DocumentSchema {
    /// Start building a schema.
    pub fn builder() -> DocumentSchemaBuilder {
        DocumentSchemaBuilder::default()
    }

    pub(crate) fn nullable_matches(&self, path: &[PathKey]) -> bool {
        self.nullable.iter().any(|p| matches(p, path))
    }

    pub(crate) fn purge_matches(&self, path: &[PathKey]) -> bool {
        self.purges.iter().any(|p| matches(p, path))
    }

    pub(crate) fn casts_for<'a>(
        &'a self,
        path: &'a [PathKey],
    ) -> impl Iterator<Item = &'a Cast> + 'a {
        self.types
            .iter()
            .filter(move |(pattern, _)| matches(pattern, path))
            .map(|(_, cast)| cast)
    }

    pub(crate) fn sort_matches(&self, path: &[PathKey]) -> bool {
        self.sorts.iter().any(|p| matches(p, path))
    }

    pub(crate) fn list_matches(&self, path: &[PathKey]) -> bool {
        self.lists.iter().any(|p| matches(p, path))
    }

    fn validate(self) -> Result<Self> {
        for pattern in self
            .nullable
            .iter()
            .chain(self.purges.iter())
            .chain(self.sorts.iter())
            .chain(self.lists.iter())
            .chain(self.types.keys())
        {
            validate_pattern(pattern)?;
        }
        Ok(self)
    }
}

/// Check a declared pattern: the global `*`, the root `$`, or a `$.`-rooted
/// dotted path without empty segments.
fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern == "*" || pattern == "$" {
        return Ok(());
    }

    let well_formed = pattern.strip_prefix("$.").is_some_and(|rest| {
        !rest.is_empty() && rest.split('.').all(|segment| !segment.is_empty())
    });

    if well_formed {
        Ok(())
    } else {
        Err(VetterError::configuration(
            ErrorCode::MalformedDocumentSchema,
            format!("document schema path must be rooted at '$': {:?}", pattern),
        ))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Fluent builder for [`DocumentSchema`].
#[derive(Debug, Default)]
pub struct DocumentSchemaBuilder {
    schema: DocumentSchema,
}

impl DocumentSchemaBuilder {
    pub fn nullable(mut self, pattern: impl Into<String>) -> Self {
        self.schema.nullable.push(pattern.into());
        self
    }

    pub fn purge(mut self, pattern: impl Into<String>) -> Self {
        self.schema.purges.push(pattern.into());
        self
    }

    pub fn cast(mut self, pattern: impl Into<String>, cast: Cast) -> Self {
        self.schema.types.insert(pattern.into(), cast);
        self
    }

    pub fn sort(mut self, pattern: impl Into<String>) -> Self {
        self.schema.sorts.push(pattern.into());
        self
    }

    pub fn list(mut self, pattern: impl Into<String>) -> Self {
        self.schema.lists.push(pattern.into());
        self
    }

    /// Validate the declared patterns and build the schema.
    pub fn build(self) -> Result<DocumentSchema> {
        self.schema.validate()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Declaration Form (serde)
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw declaration shape; unknown option keys are a configuration error.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DocumentSchemaSpec {
    nullable: Vec<String>,
    purges: Vec<String>,
    types: BTreeMap<String, Cast>,
    sorts: Vec<String>,
    lists: Vec<String>,
}

impl TryFrom<DocumentSchemaSpec> for DocumentSchema {
    type Error = VetterError;

    fn try_from(spec: DocumentSchemaSpec) -> Result<Self> {
        DocumentSchema {
            nullable: spec.nullable,
            purges: spec.purges,
            types: spec.types,
            sorts: spec.sorts,
            lists: spec.lists,
        }
        .validate()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accepts_rooted_patterns() {
        let schema = DocumentSchema::builder()
            .nullable("$.note")
            .purge("*")
            .cast("$.qty", Cast::integer())
            .sort("$.tags")
            .list("$.items.*")
            .build()
            .unwrap();
        assert_eq!(schema.nullable, vec!["$.note"]);
    }

    #[test]
    fn test_builder_rejects_unrooted_patterns() {
        let err = DocumentSchema::builder().nullable("note").build().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedDocumentSchema);

        let err = DocumentSchema::builder().purge("$.a..b").build().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedDocumentSchema);
    }

    #[test]
    fn test_deserialize_declaration_form() {
        let schema: DocumentSchema = serde_json::from_value(serde_json::json!({
            "types": {"$.qty": "integer", "$.at": "?datetime"},
            "purges": ["$.note"],
        }))
        .unwrap();
        assert_eq!(schema.types.len(), 2);
        assert_eq!(schema.purges, vec!["$.note"]);
    }

    #[test]
    fn test_deserialize_rejects_unknown_options() {
        let result: std::result::Result<DocumentSchema, _> =
            serde_json::from_value(serde_json::json!({"prune": ["$.note"]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_uppercase_cast_names() {
        let result: std::result::Result<DocumentSchema, _> =
            serde_json::from_value(serde_json::json!({"types": {"$.qty": "Integer"}}));
        assert!(result.is_err());
    }
}
