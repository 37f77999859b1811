//! Entities: schema-bound attribute maps with change tracking.
//!
//! An [`Entity`] holds the current attribute values, the original values as
//! loaded from storage, and an existence flag. Assignment normalizes input
//! per the schema (trim, empty-string-to-null, datetime reformatting,
//! document mutation) so that validation and dirty tracking always see
//! canonical values.
//!
//! - [`schema`]: the [`EntitySchema`] declaration and its builder
//! - [`audit`]: declaration defect detection

pub mod audit;
pub mod schema;

pub use audit::{audit_export, AuditViolation};
pub use schema::{EntitySchema, EntitySchemaBuilder, EntitySchemaExport, Hook};

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::document::{mutate, Cast};
use crate::error::{Result, VetterError};
use crate::validation::rules::numeric;

// ═══════════════════════════════════════════════════════════════════════════════
// Entity
// ═══════════════════════════════════════════════════════════════════════════════

/// One record of an entity type, bound to its shared schema.
#[derive(Debug, Clone)]
pub struct Entity {
    schema: Arc<EntitySchema>,
    attributes: Map<String, Value>,
    original: Map<String, Value>,
    exists: bool,
}

impl Entity {
    /// A fresh, not-yet-persisted record with no attributes set.
    pub fn new(schema: Arc<EntitySchema>) -> Self {
        Self {
            schema,
            attributes: Map::new(),
            original: Map::new(),
            exists: false,
        }
    }

    /// A record loaded from storage. Values pass through the same
    /// normalization as user input, then become the original snapshot.
    pub fn from_persisted(schema: Arc<EntitySchema>, values: Map<String, Value>) -> Result<Self> {
        let mut entity = Self::new(schema);
        entity.fill(values)?;
        entity.original = entity.attributes.clone();
        entity.exists = true;
        Ok(entity)
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Current attribute values, in assignment order.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Assign a batch of attributes, normalizing each.
    pub fn fill(&mut self, values: Map<String, Value>) -> Result<()> {
        for (name, value) in values {
            self.set(&name, value)?;
        }
        Ok(())
    }

    /// Assign one attribute. Unknown names are a usage error, never a
    /// validation failure.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        if !self.schema.has_attribute(name) {
            return Err(VetterError::usage(format!(
                "unknown attribute '{}' on entity '{}'",
                name,
                self.schema.name()
            )));
        }

        let value = self.normalize(name, value);
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn normalize(&self, name: &str, mut value: Value) -> Value {
        if self.schema.trim.iter().any(|f| f == name) {
            if let Value::String(s) = &value {
                value = Value::String(s.trim().to_string());
            }
        }

        if self.schema.nullable.iter().any(|f| f == name) {
            if matches!(&value, Value::String(s) if s.is_empty()) {
                value = Value::Null;
            }
        }

        if !value.is_null() && self.schema.dates.iter().any(|f| f == name) {
            value = Cast::datetime(Some(&self.schema.date_format)).apply(value);
        }

        if let Some(doc_schema) = self.schema.document_schema(name) {
            value = mutate(&value, doc_schema);
        }

        value
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Original (persisted) value of an attribute.
    pub fn original(&self, name: &str) -> Option<&Value> {
        self.original.get(name)
    }

    /// Whether an attribute differs from its original snapshot. Absent and
    /// null compare equal.
    pub fn dirty(&self, name: &str) -> bool {
        let current = self.attributes.get(name).unwrap_or(&Value::Null);
        let original = self.original.get(name).unwrap_or(&Value::Null);
        !values_equivalent(current, original)
    }

    /// Primary key value, when set and non-null.
    pub fn identity(&self) -> Option<&Value> {
        self.attributes
            .get(self.schema.primary_key())
            .filter(|v| !v.is_null())
    }

    /// Promote the current values to the persisted snapshot.
    pub fn mark_persisted(&mut self) {
        self.original = self.attributes.clone();
        self.exists = true;
    }
}

/// Value equivalence for change tracking: exact equality, or numeric
/// equality across representations (`5`, `5.0`, `"5"`).
pub(crate) fn values_equivalent(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentSchema;
    use serde_json::json;

    fn schema() -> Arc<EntitySchema> {
        EntitySchema::builder("User", "users")
            .attributes(["email", "name", "born_at", "profile"])
            .trim(["name"])
            .nullable(["name"])
            .dates(["born_at"])
            .json_nested(
                "profile",
                DocumentSchema::builder()
                    .cast("$.age", Cast::integer())
                    .purge("$.note")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn map(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_unknown_attribute_is_usage_error() {
        let mut entity = Entity::new(schema());
        assert!(entity.set("nickname", json!("x")).is_err());
    }

    #[test]
    fn test_trim_then_nullable() {
        let mut entity = Entity::new(schema());
        entity.set("name", json!("  ")).unwrap();
        assert_eq!(entity.get("name"), Some(&Value::Null));

        entity.set("name", json!("  Ada ")).unwrap();
        assert_eq!(entity.get("name"), Some(&json!("Ada")));
    }

    #[test]
    fn test_date_normalization() {
        let mut entity = Entity::new(schema());
        entity.set("born_at", json!("1990-03-14")).unwrap();
        assert_eq!(entity.get("born_at"), Some(&json!("1990-03-14 00:00:00")));
    }

    #[test]
    fn test_document_column_is_mutated_on_assignment() {
        let mut entity = Entity::new(schema());
        entity
            .set("profile", json!({"age": "30", "note": null}))
            .unwrap();
        assert_eq!(entity.get("profile"), Some(&json!({"age": 30})));
    }

    #[test]
    fn test_dirty_tracking_with_numeric_equivalence() {
        let mut entity = Entity::from_persisted(schema(), map(&[("email", json!("a@b.co"))]))
            .unwrap();
        assert!(!entity.dirty("email"));

        entity.set("email", json!("x@y.z")).unwrap();
        assert!(entity.dirty("email"));

        entity.set("email", json!("a@b.co")).unwrap();
        assert!(!entity.dirty("email"));

        assert!(values_equivalent(&json!(5), &json!("5")));
        assert!(values_equivalent(&json!(5.0), &json!(5)));
        assert!(!values_equivalent(&json!("5a"), &json!(5)));
    }

    #[test]
    fn test_identity() {
        let mut entity = Entity::new(schema());
        assert!(entity.identity().is_none());

        entity.set("id", json!(7)).unwrap();
        assert_eq!(entity.identity(), Some(&json!(7)));
    }

    #[test]
    fn test_mark_persisted_resets_dirtiness() {
        let mut entity = Entity::new(schema());
        entity.set("email", json!("a@b.co")).unwrap();
        assert!(entity.dirty("email"));

        entity.mark_persisted();
        assert!(entity.exists());
        assert!(!entity.dirty("email"));
    }
}
