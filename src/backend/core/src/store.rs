//! Persistence collaborator for uniqueness checks.
//!
//! The core never builds queries or talks to a database itself; it asks a
//! [`UniquenessStore`] one question: "is there at least one row matching
//! these equality/IS-NULL conjuncts, excluding my own identity?". The call
//! is synchronous and blocking; the pipeline waits for the answer before
//! proceeding.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

// ═══════════════════════════════════════════════════════════════════════════════
// Query Shape
// ═══════════════════════════════════════════════════════════════════════════════

/// An equality-predicate uniqueness probe. No joins, no aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueQuery {
    /// Qualified table name (`connection.table` or bare `table`).
    pub table: String,
    /// Column conjuncts: `Some(value)` means equality, `None` means IS NULL.
    pub conjuncts: Vec<(String, Option<Value>)>,
    /// Identity exclusion: `(column, value)` of the probing entity itself.
    pub exclude: Option<(String, Value)>,
    /// Whether soft-deleted rows still count as conflicts.
    pub include_soft_deleted: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Error surfaced by a persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// The query capability the pipeline requires for uniqueness checks.
pub trait UniquenessStore {
    /// Return whether at least one row matches the query.
    fn find_conflict(&self, query: &UniqueQuery) -> Result<bool, StoreError>;
}

impl<T: UniquenessStore + ?Sized> UniquenessStore for &T {
    fn find_conflict(&self, query: &UniqueQuery) -> Result<bool, StoreError> {
        (**self).find_conflict(query)
    }
}

impl<T: UniquenessStore + ?Sized> UniquenessStore for Arc<T> {
    fn find_conflict(&self, query: &UniqueQuery) -> Result<bool, StoreError> {
        (**self).find_conflict(query)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-Memory Store
// ═══════════════════════════════════════════════════════════════════════════════

/// Simple in-memory row store.
///
/// Backs the CLI's offline checks and the test suite; rows are plain JSON
/// maps keyed by table name. Query executions are counted so callers can
/// assert how many round-trips the pipeline performed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Map<String, Value>>>>,
    queries: AtomicUsize,
}

/// Column conventionally used to mark soft-deleted rows.
const SOFT_DELETE_COLUMN: &str = "deleted_at";

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row into a table, creating the table on first use.
    pub fn insert(&self, table: impl Into<String>, row: Map<String, Value>) {
        self.tables.write().entry(table.into()).or_default().push(row);
    }

    /// Number of uniqueness queries executed so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    fn row_matches(row: &Map<String, Value>, query: &UniqueQuery) -> bool {
        for (column, expected) in &query.conjuncts {
            let actual = row.get(column).filter(|v| !v.is_null());
            match expected {
                Some(value) if actual == Some(value) => {}
                None if actual.is_none() => {}
                _ => return false,
            }
        }

        if let Some((column, value)) = &query.exclude {
            if row.get(column) == Some(value) {
                return false;
            }
        }

        if !query.include_soft_deleted {
            let deleted = row.get(SOFT_DELETE_COLUMN).is_some_and(|v| !v.is_null());
            if deleted {
                return false;
            }
        }

        true
    }
}

impl UniquenessStore for MemoryStore {
    fn find_conflict(&self, query: &UniqueQuery) -> Result<bool, StoreError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        debug!(table = %query.table, conjuncts = query.conjuncts.len(), "uniqueness probe");

        let tables = self.tables.read();
        let Some(rows) = tables.get(&query.table) else {
            return Ok(false);
        };

        Ok(rows.iter().any(|row| Self::row_matches(row, query)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
