//! Vetter: schema-driven entity validation with document normalization.
//!
//! Entities declare a single schema (attributes, normalization sets,
//! constraint sets, rules, hooks); assignment normalizes input and a staged
//! pipeline validates before persistence. Document-typed columns carry their
//! own normalization schemas and are canonicalized by [`document::mutate`].
//!
//! # Quick start
//!
//! ```
//! use vetter_core::prelude::*;
//! use serde_json::json;
//!
//! let schema = EntitySchema::builder("User", "users")
//!     .attributes(["email", "name"])
//!     .trim(["name"])
//!     .unique(["email"])
//!     .rules("email", [Rule::Required, Rule::Email])
//!     .build()?;
//!
//! let mut user = Entity::new(schema);
//! user.set("email", json!("ada@example.com"))?;
//! user.set("name", json!("  Ada "))?;
//!
//! let pipeline = ValidationPipeline::new(MemoryStore::new());
//! pipeline.validate(&user)?;
//! # Ok::<(), vetter_core::VetterError>(())
//! ```

pub mod document;
pub mod entity;
pub mod error;
pub mod store;
pub mod translate;
pub mod validation;

pub use error::{ErrorCode, Result, VetterError};

/// Common imports for typical use.
pub mod prelude {
    pub use crate::document::{Cast, DocumentSchema};
    pub use crate::entity::{Entity, EntitySchema, EntitySchemaExport};
    pub use crate::error::{ErrorCode, Result, VetterError};
    pub use crate::store::{MemoryStore, UniquenessStore};
    pub use crate::translate::{Messages, Translator};
    pub use crate::validation::{ErrorBag, Rule, ValidateOptions, ValidationPipeline};
}
