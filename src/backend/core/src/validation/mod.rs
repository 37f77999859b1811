//! Entity validation.
//!
//! Validation is a staged pipeline over a schema-bound entity: raw shape
//! first, then declared rules, then structural invariants, then the
//! post-validation hook. Failures are field-keyed [`ErrorBag`]s that compose
//! across nested entities via prefixing and key renames.
//!
//! - [`error`]: field errors and the ordered [`ErrorBag`]
//! - [`rules`]: the declarative [`Rule`] set
//! - [`canonicalize`]: uniqueness shorthand expansion
//! - [`invariants`]: calculated/unchangeable/uniqueness-group checks
//! - [`pipeline`]: the [`ValidationPipeline`] orchestrator

pub mod canonicalize;
pub mod error;
pub mod invariants;
pub mod pipeline;
pub mod rules;

pub use error::{ErrorBag, ErrorKind, FieldError, ValidationResult};
pub use pipeline::{ValidateOptions, ValidationPipeline};
pub use rules::{Rule, UniqueSpec};
