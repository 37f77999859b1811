//! Nested-document normalization engine.
//!
//! Document-typed entity columns carry arbitrary JSON trees. Before
//! validation and storage those trees are canonicalized by a small
//! declarative schema: paths are matched with dotted glob patterns and the
//! matched values are null-normalized, purged, cast, sorted or reindexed.
//!
//! - [`path`]: dotted glob pattern matching over concrete paths
//! - [`schema`]: the per-column [`DocumentSchema`] declaration
//! - [`cast`]: tolerant scalar coercions (integer/float/bool/string/datetime)
//! - [`mutate`]: the recursive bottom-up tree walker

pub mod cast;
pub mod mutate;
pub mod path;
pub mod schema;

pub use cast::{Cast, CastKind, DEFAULT_DATETIME_FORMAT};
pub use mutate::mutate;
pub use path::{join_path, matches, PathKey};
pub use schema::{DocumentSchema, DocumentSchemaBuilder};
