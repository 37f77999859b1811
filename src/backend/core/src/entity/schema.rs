//! Entity schema declaration.
//!
//! An [`EntitySchema`] is the single declaration an entity type carries: its
//! storage identity (table, connection, primary key), the attribute
//! whitelist, input normalization sets (trim, nullable, dates), structural
//! constraint sets (calculated, unchangeable, unique groups), per-column
//! document schemas, declared rules and the two lifecycle hooks. Schemas are
//! built once and shared behind an `Arc`; entities never mutate them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::document::DocumentSchema;
use crate::error::{Result, VetterError};
use crate::validation::error::ErrorBag;
use crate::validation::rules::Rule;

/// Lifecycle hook invoked with the entity and the accumulated errors.
pub type Hook = Arc<dyn Fn(&crate::entity::Entity, &mut ErrorBag) + Send + Sync>;

/// Default primary key column.
const DEFAULT_PRIMARY_KEY: &str = "id";

// ═══════════════════════════════════════════════════════════════════════════════
// Entity Schema
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete declaration for one entity type.
#[derive(Clone)]
pub struct EntitySchema {
    pub(crate) name: String,
    pub(crate) table: String,
    pub(crate) connection: Option<String>,
    pub(crate) primary_key: String,
    pub(crate) soft_deletes: bool,

    /// The attribute whitelist; assignment outside it is a usage error.
    pub(crate) attributes: Vec<String>,

    // Input normalization sets, applied on assignment.
    pub(crate) trim: Vec<String>,
    pub(crate) nullable: Vec<String>,
    pub(crate) dates: Vec<String>,
    pub(crate) date_format: String,

    // Structural constraint sets, checked by the pipeline.
    pub(crate) calculated: Vec<String>,
    pub(crate) unchangeable: Vec<String>,
    pub(crate) unique: Vec<Vec<String>>,

    /// Document-typed columns and their normalization schemas.
    pub(crate) json_nested: BTreeMap<String, DocumentSchema>,

    /// Declared rules, in declaration order.
    pub(crate) rules: Vec<(String, Vec<Rule>)>,

    /// Display names per locale, per field.
    pub(crate) attribute_names: HashMap<String, HashMap<String, String>>,

    pub(crate) after_validation: Option<Hook>,
    pub(crate) before_delete: Option<Hook>,
}

impl fmt::Debug for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("connection", &self.connection)
            .field("primary_key", &self.primary_key)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

impl EntitySchema {
    /// Start building a schema for the named entity type.
    pub fn builder(name: impl Into<String>, table: impl Into<String>) -> EntitySchemaBuilder {
        EntitySchemaBuilder::new(name, table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn soft_deletes(&self) -> bool {
        self.soft_deletes
    }

    /// Storage location qualified with the connection when one is set.
    pub fn qualified_table(&self) -> String {
        match &self.connection {
            Some(connection) => format!("{}.{}", connection, self.table),
            None => self.table.clone(),
        }
    }

    /// Whether a name is a declared attribute (the primary key counts).
    pub fn has_attribute(&self, name: &str) -> bool {
        name == self.primary_key || self.attributes.iter().any(|a| a == name)
    }

    pub(crate) fn document_schema(&self, field: &str) -> Option<&DocumentSchema> {
        self.json_nested.get(field)
    }

    /// Display name for a field in a locale, falling back to the field key.
    pub fn display_name(&self, locale: &str, field: &str) -> String {
        self.attribute_names
            .get(locale)
            .and_then(|names| names.get(field))
            .cloned()
            .unwrap_or_else(|| field.to_string())
    }

    /// Portable declaration form, without rules and hooks.
    pub fn export(&self) -> EntitySchemaExport {
        EntitySchemaExport {
            name: self.name.clone(),
            table: self.table.clone(),
            connection: self.connection.clone(),
            primary_key: self.primary_key.clone(),
            soft_deletes: self.soft_deletes,
            attributes: self.attributes.clone(),
            trim: self.trim.clone(),
            nullable: self.nullable.clone(),
            dates: self.dates.clone(),
            date_format: self.date_format.clone(),
            calculated: self.calculated.clone(),
            unchangeable: self.unchangeable.clone(),
            unique: self.unique.clone(),
            json_nested: self.json_nested.clone(),
            rule_fields: self.rules.iter().map(|(field, _)| field.clone()).collect(),
        }
    }

    /// Rebuild a schema from its portable form. Rules and hooks cannot cross
    /// the serialization boundary and come back empty.
    pub fn from_export(export: EntitySchemaExport) -> Result<Arc<Self>> {
        let mut builder = Self::builder(export.name, export.table)
            .primary_key(export.primary_key)
            .soft_deletes(export.soft_deletes)
            .attributes(export.attributes)
            .trim(export.trim)
            .nullable(export.nullable)
            .dates(export.dates)
            .date_format(export.date_format)
            .calculated(export.calculated)
            .unchangeable(export.unchangeable);

        if let Some(connection) = export.connection {
            builder = builder.connection(connection);
        }
        for group in export.unique {
            builder = builder.unique(group);
        }
        for (field, schema) in export.json_nested {
            builder = builder.json_nested(field, schema);
        }

        builder.build()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Fluent builder for [`EntitySchema`].
pub struct EntitySchemaBuilder {
    schema: EntitySchema,
}

impl EntitySchemaBuilder {
    fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: EntitySchema {
                name: name.into(),
                table: table.into(),
                connection: None,
                primary_key: DEFAULT_PRIMARY_KEY.to_string(),
                soft_deletes: false,
                attributes: Vec::new(),
                trim: Vec::new(),
                nullable: Vec::new(),
                dates: Vec::new(),
                date_format: crate::document::DEFAULT_DATETIME_FORMAT.to_string(),
                calculated: Vec::new(),
                unchangeable: Vec::new(),
                unique: Vec::new(),
                json_nested: BTreeMap::new(),
                rules: Vec::new(),
                attribute_names: HashMap::new(),
                after_validation: None,
                before_delete: None,
            },
        }
    }

    pub fn connection(mut self, connection: impl Into<String>) -> Self {
        self.schema.connection = Some(connection.into());
        self
    }

    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.schema.primary_key = key.into();
        self
    }

    pub fn soft_deletes(mut self, enabled: bool) -> Self {
        self.schema.soft_deletes = enabled;
        self
    }

    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.attributes = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn trim<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.trim = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn nullable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.nullable = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn dates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.dates = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.schema.date_format = format.into();
        self
    }

    pub fn calculated<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.calculated = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn unchangeable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.unchangeable = names.into_iter().map(Into::into).collect();
        self
    }

    /// Add a uniqueness group; a single-element group constrains one column.
    pub fn unique<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema
            .unique
            .push(group.into_iter().map(Into::into).collect());
        self
    }

    /// Declare a document-typed column with its normalization schema.
    pub fn json_nested(mut self, field: impl Into<String>, schema: DocumentSchema) -> Self {
        self.schema.json_nested.insert(field.into(), schema);
        self
    }

    /// Declare rules for a field key (plain, dotted or wildcard).
    pub fn rules<I>(mut self, field: impl Into<String>, rules: I) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        self.schema
            .rules
            .push((field.into(), rules.into_iter().collect()));
        self
    }

    /// Declare display names for a locale.
    pub fn attribute_names<I, K, V>(mut self, locale: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.schema.attribute_names.insert(
            locale.into(),
            names
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Register the post-validation hook. Registering it twice is a usage
    /// error: the hook must run exactly once per validation.
    pub fn after_validation<F>(mut self, hook: F) -> Result<Self>
    where
        F: Fn(&crate::entity::Entity, &mut ErrorBag) + Send + Sync + 'static,
    {
        if self.schema.after_validation.is_some() {
            return Err(VetterError::usage(format!(
                "after_validation hook already registered for entity '{}'",
                self.schema.name
            )));
        }
        self.schema.after_validation = Some(Arc::new(hook));
        Ok(self)
    }

    /// Register the pre-delete hook. Registering it twice is a usage error.
    pub fn before_delete<F>(mut self, hook: F) -> Result<Self>
    where
        F: Fn(&crate::entity::Entity, &mut ErrorBag) + Send + Sync + 'static,
    {
        if self.schema.before_delete.is_some() {
            return Err(VetterError::usage(format!(
                "before_delete hook already registered for entity '{}'",
                self.schema.name
            )));
        }
        self.schema.before_delete = Some(Arc::new(hook));
        Ok(self)
    }

    /// Audit the declaration and build the shared schema.
    pub fn build(self) -> Result<Arc<EntitySchema>> {
        self.schema.audit()?;
        Ok(Arc::new(self.schema))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Portable Declaration Form
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializable schema declaration, as read by the CLI.
///
/// Rules and hooks are code and do not serialize; `rule_fields` records
/// which fields carried rules so audits can still check their names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntitySchemaExport {
    pub name: String,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    pub soft_deletes: bool,
    pub attributes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trim: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nullable: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<String>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub calculated: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unchangeable: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub json_nested: BTreeMap<String, DocumentSchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rule_fields: Vec<String>,
}

fn default_primary_key() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

fn default_date_format() -> String {
    crate::document::DEFAULT_DATETIME_FORMAT.to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
