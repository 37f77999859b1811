//! Uniqueness rule canonicalization.
//!
//! Declared uniqueness rules are shorthand: table, column and identity
//! exclusion may all be left unset. Before the pipeline can probe the store
//! the shorthand is expanded against the entity: the table defaults to the
//! entity's qualified table, the column to the constrained field, and the
//! exclusion to the entity's own primary key when it has one. A rule whose
//! constrained field is unchanged on an existing entity is dropped entirely,
//! skipping the store round-trip.

use serde_json::Value;

use crate::entity::Entity;
use crate::error::{Result, VetterError};
use crate::validation::rules::UniqueSpec;

/// A fully-expanded uniqueness constraint, ready to query.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CanonicalUnique {
    pub table: String,
    pub column: String,
    /// `(column, value)` identity exclusion.
    pub exclude: Option<(String, Value)>,
}

/// Expand a shorthand spec against the entity.
///
/// Returns `Ok(None)` when the rule is dropped: the entity exists and the
/// constrained field is clean, so the stored value already satisfied the
/// constraint.
pub(crate) fn canonical_unique(
    entity: &Entity,
    field: &str,
    spec: &UniqueSpec,
) -> Result<Option<CanonicalUnique>> {
    let table = match &spec.table {
        Some(table) => table.clone(),
        None => entity.schema().qualified_table(),
    };
    if table.is_empty() {
        return Err(VetterError::usage(format!(
            "uniqueness rule on '{field}' has no resolvable table"
        )));
    }

    let column = match &spec.column {
        Some(column) => column.clone(),
        None => field.to_string(),
    };

    // The clean-skip looks only at the comparison column, never the whole
    // group; a changed sibling does not revive the rule.
    if entity.exists() && !entity.dirty(&column) {
        return Ok(None);
    }

    let exclude = match &spec.exclude {
        Some((value, identity_column)) => Some((identity_column.clone(), value.clone())),
        None => {
            let primary_key = entity.schema().primary_key();
            match entity.identity() {
                Some(identity) if column != primary_key => {
                    Some((primary_key.to_string(), identity.clone()))
                }
                _ => None,
            }
        }
    };

    Ok(Some(CanonicalUnique {
        table,
        column,
        exclude,
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
