//! The four-stage validation pipeline.
//!
//! Stages run in a fixed order and short-circuit between stages, so later
//! stages only ever see input that already passed the earlier ones:
//!
//! 1. raw shape: non-document attributes must be scalar
//! 2. declared rules (plus any per-call additional rules)
//! 3. structural invariants: calculated, unchangeable, uniqueness groups
//! 4. the schema's post-validation hook
//!
//! Within a stage every failure is collected; a failing stage surfaces the
//! whole bag, prefixed with the caller's key prefix.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::entity::Entity;
use crate::error::{Result, VetterError};
use crate::store::{UniqueQuery, UniquenessStore};
use crate::translate::{AttributeNameCache, Messages, Translator};
use crate::validation::canonicalize::canonical_unique;
use crate::validation::error::{ErrorBag, ErrorKind, FieldError};
use crate::validation::invariants;
use crate::validation::rules::Rule;

// ═══════════════════════════════════════════════════════════════════════════════
// Options
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-call validation options.
#[derive(Default)]
pub struct ValidateOptions {
    /// Key prefix segments prepended to every error key; empty segments are
    /// dropped.
    pub prefix: Vec<String>,
    /// Extra rules merged after the schema's declared rules.
    pub additional_rules: Vec<(String, Vec<Rule>)>,
    /// Per-call display name overrides.
    pub attribute_names: HashMap<String, String>,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix = segments.into_iter().map(Into::into).collect();
        self
    }

    pub fn rules<I>(mut self, field: impl Into<String>, rules: I) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        self.additional_rules
            .push((field.into(), rules.into_iter().collect()));
        self
    }

    pub fn attribute_name(mut self, field: impl Into<String>, name: impl Into<String>) -> Self {
        self.attribute_names.insert(field.into(), name.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Pipeline
// ═══════════════════════════════════════════════════════════════════════════════

/// Validation pipeline bound to a persistence collaborator and a locale.
pub struct ValidationPipeline<S> {
    store: S,
    translator: Arc<dyn Translator>,
    locale: String,
    names: AttributeNameCache,
}

impl<S: UniquenessStore> ValidationPipeline<S> {
    /// Pipeline with the built-in English catalog.
    pub fn new(store: S) -> Self {
        Self {
            store,
            translator: Arc::new(Messages),
            locale: "en".to_string(),
            names: AttributeNameCache::new(),
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    /// Switch locale; resolved display names for the old locale are kept
    /// cached and the new locale resolves lazily.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate an entity with default options.
    pub fn validate(&self, entity: &Entity) -> Result<()> {
        self.validate_with(entity, ValidateOptions::default())
    }

    /// Validate an entity for persistence.
    pub fn validate_with(&self, entity: &Entity, options: ValidateOptions) -> Result<()> {
        let prefix = canonize_prefix(&options.prefix);
        self.cache_names(entity);

        debug!(entity = entity.schema().name(), "stage 1: raw shape");
        let bag = self.check_shape(entity, &options);
        if !bag.is_empty() {
            return Err(VetterError::Validation(bag.prefixed(&prefix)));
        }

        debug!(entity = entity.schema().name(), "stage 2: declared rules");
        let bag = self.check_rules(entity, &options)?;
        if !bag.is_empty() {
            return Err(VetterError::Validation(bag.prefixed(&prefix)));
        }

        debug!(entity = entity.schema().name(), "stage 3: invariants");
        let bag = invariants::check(entity, &self.store, self.translator.as_ref(), &self.locale)?;
        if !bag.is_empty() {
            return Err(VetterError::Validation(bag.prefixed(&prefix)));
        }

        debug!(entity = entity.schema().name(), "stage 4: post-validation hook");
        if let Some(hook) = &entity.schema().after_validation {
            let mut bag = ErrorBag::new();
            hook(entity, &mut bag);
            if !bag.is_empty() {
                return Err(VetterError::Validation(bag.prefixed(&prefix)));
            }
        }

        Ok(())
    }

    /// Validate an entity for deletion: per-call rules, then the schema's
    /// pre-delete hook.
    pub fn validate_delete(&self, entity: &Entity, options: ValidateOptions) -> Result<()> {
        let prefix = canonize_prefix(&options.prefix);
        self.cache_names(entity);

        let bag = self.check_rules(entity, &options)?;
        if !bag.is_empty() {
            return Err(VetterError::Validation(bag.prefixed(&prefix)));
        }

        if let Some(hook) = &entity.schema().before_delete {
            let mut bag = ErrorBag::new();
            hook(entity, &mut bag);
            if !bag.is_empty() {
                return Err(VetterError::Validation(bag.prefixed(&prefix)));
            }
        }

        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Stage 1
    // ───────────────────────────────────────────────────────────────────────────

    fn check_shape(&self, entity: &Entity, options: &ValidateOptions) -> ErrorBag {
        let mut bag = ErrorBag::new();
        for (field, value) in entity.attributes() {
            if entity.schema().document_schema(field).is_some() {
                continue;
            }
            if matches!(value, Value::Array(_) | Value::Object(_)) {
                let name = self.display_name(entity, options, field);
                let error = match self
                    .translator
                    .translate("validation.scalar", &[("attribute", &name)])
                {
                    Some(message) => FieldError::with_message(ErrorKind::Scalar, message),
                    None => FieldError::new(ErrorKind::Scalar),
                };
                bag.add(field, error);
            }
        }
        bag
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Stage 2
    // ───────────────────────────────────────────────────────────────────────────

    fn check_rules(&self, entity: &Entity, options: &ValidateOptions) -> Result<ErrorBag> {
        let mut bag = ErrorBag::new();
        let declared = entity.schema().rules.iter();
        let additional = options.additional_rules.iter();

        for (key, rules) in declared.chain(additional) {
            for (concrete, value) in expand_rule_key(entity, key) {
                for rule in rules {
                    if let Rule::Unique(spec) = rule {
                        // Uniqueness only applies to top-level attributes.
                        if !concrete.contains('.') {
                            self.check_unique(
                                entity,
                                options,
                                &concrete,
                                value.as_ref(),
                                spec,
                                &mut bag,
                            )?;
                        }
                        continue;
                    }
                    if let Some(error) = rule.evaluate(value.as_ref()) {
                        bag.add(&concrete, error);
                    }
                }
            }
        }

        Ok(bag)
    }

    fn check_unique(
        &self,
        entity: &Entity,
        options: &ValidateOptions,
        field: &str,
        value: Option<&Value>,
        spec: &crate::validation::rules::UniqueSpec,
        bag: &mut ErrorBag,
    ) -> Result<()> {
        // Absent or null never conflicts; presence is Required's job.
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(());
        };
        let Some(resolved) = canonical_unique(entity, field, spec)? else {
            return Ok(());
        };

        let query = UniqueQuery {
            table: resolved.table,
            conjuncts: vec![(resolved.column, Some(value.clone()))],
            exclude: resolved.exclude,
            include_soft_deleted: entity.schema().soft_deletes(),
        };

        if self.store.find_conflict(&query)? {
            let name = self.display_name(entity, options, field);
            let error = match self
                .translator
                .translate("validation.unique", &[("attributes", &name)])
            {
                Some(message) => FieldError::with_message(ErrorKind::Unique, message),
                None => FieldError::new(ErrorKind::Unique),
            };
            bag.add(field, error);
        }
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Display names
    // ───────────────────────────────────────────────────────────────────────────

    fn cache_key(&self, entity: &Entity) -> String {
        format!("{}:{}", self.locale, entity.schema().name())
    }

    fn cache_names(&self, entity: &Entity) {
        let key = self.cache_key(entity);
        if self.names.has_locale(&key) {
            return;
        }
        let resolved = entity
            .schema()
            .attribute_names
            .get(&self.locale)
            .cloned()
            .unwrap_or_default();
        self.names.fill(&key, resolved);
    }

    fn display_name(&self, entity: &Entity, options: &ValidateOptions, field: &str) -> String {
        if let Some(name) = options.attribute_names.get(field) {
            return name.clone();
        }
        self.names
            .get(&self.cache_key(entity), field)
            .unwrap_or_else(|| field.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rule Key Expansion
// ═══════════════════════════════════════════════════════════════════════════════

/// Expand a rule key over an entity's attributes into concrete dotted keys
/// and their values. `*` segments fan out over every element at that
/// position; concrete segments that resolve to nothing yield a `None` value
/// so presence rules still fire.
fn expand_rule_key(entity: &Entity, key: &str) -> Vec<(String, Option<Value>)> {
    let segments: Vec<&str> = key.split('.').collect();
    let mut out = Vec::new();

    let Some((head, rest)) = segments.split_first() else {
        return out;
    };

    if *head == "*" {
        for (name, value) in entity.attributes() {
            descend(name.clone(), Some(value), rest, &mut out);
        }
    } else {
        descend(head.to_string(), entity.get(head), rest, &mut out);
    }
    out
}

fn descend(path: String, value: Option<&Value>, segments: &[&str], out: &mut Vec<(String, Option<Value>)>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push((path, value.cloned()));
        return;
    };

    match (*head, value) {
        ("*", Some(Value::Object(entries))) => {
            for (key, item) in entries {
                descend(format!("{path}.{key}"), Some(item), rest, out);
            }
        }
        ("*", Some(Value::Array(items))) => {
            for (index, item) in items.iter().enumerate() {
                descend(format!("{path}.{index}"), Some(item), rest, out);
            }
        }
        ("*", _) => {}
        (segment, Some(Value::Object(entries))) => {
            descend(format!("{path}.{segment}"), entries.get(segment), rest, out);
        }
        (segment, Some(Value::Array(items))) => {
            let item = segment.parse::<usize>().ok().and_then(|i| items.get(i));
            descend(format!("{path}.{segment}"), item, rest, out);
        }
        (segment, _) => {
            descend(format!("{path}.{segment}"), None, rest, out);
        }
    }
}

/// Join prefix segments with dots, dropping empty segments.
fn canonize_prefix(segments: &[String]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(".")
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Cast, DocumentSchema};
    use crate::entity::EntitySchema;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn schema() -> Arc<EntitySchema> {
        EntitySchema::builder("User", "users")
            .attributes(["email", "age", "profile"])
            .json_nested(
                "profile",
                DocumentSchema::builder()
                    .cast("$.age", Cast::integer().optional())
                    .build()
                    .unwrap(),
            )
            .rules("email", [Rule::Required, Rule::Email])
            .rules("profile.links.*", [Rule::Scalar])
            .build()
            .unwrap()
    }

    fn pipeline() -> ValidationPipeline<MemoryStore> {
        ValidationPipeline::new(MemoryStore::new())
    }

    fn bag(result: Result<()>) -> ErrorBag {
        match result.unwrap_err() {
            VetterError::Validation(bag) => bag,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_shape_stage_rejects_structures_on_plain_columns() {
        let mut entity = Entity::new(schema());
        entity.set("age", json!([1, 2])).unwrap();

        let errors = bag(pipeline().validate(&entity));
        assert_eq!(errors.get("age").unwrap()[0].kind, ErrorKind::Scalar);
        // Rules never ran: the missing required email is not reported.
        assert!(!errors.has_errors("email"));
    }

    #[test]
    fn test_document_columns_are_exempt_from_shape_stage() {
        let mut entity = Entity::new(schema());
        entity.set("email", json!("a@b.co")).unwrap();
        entity.set("profile", json!({"age": "30"})).unwrap();

        assert!(pipeline().validate(&entity).is_ok());
    }

    #[test]
    fn test_rule_stage_aggregates_across_fields() {
        let entity = Entity::new(schema());
        let p = pipeline();
        let errors = bag(p.validate_with(
            &entity,
            ValidateOptions::new().rules("age", [Rule::Required]),
        ));
        assert!(errors.has_errors("email"));
        assert!(errors.has_errors("age"));
    }

    #[test]
    fn test_wildcard_rule_expands_into_document() {
        let mut entity = Entity::new(schema());
        entity.set("email", json!("a@b.co")).unwrap();
        entity
            .set("profile", json!({"links": {"home": "x", "bad": {"deep": 1}}}))
            .unwrap();

        let errors = bag(pipeline().validate(&entity));
        assert!(errors.has_errors("profile.links.bad"));
        assert!(!errors.has_errors("profile.links.home"));
    }

    #[test]
    fn test_prefix_applies_to_error_keys() {
        let entity = Entity::new(schema());
        let options = ValidateOptions::new().prefix(["order", "", "customer"]);
        let errors = bag(pipeline().validate_with(&entity, options));
        assert!(errors.has_errors("order.customer.email"));
    }

    #[test]
    fn test_unique_rule_probes_and_reports() {
        let schema = EntitySchema::builder("User", "users")
            .attributes(["email"])
            .rules("email", [Rule::Required, Rule::unique()])
            .build()
            .unwrap();

        let p = pipeline();
        p.store().insert(
            "users",
            serde_json::Map::from_iter([("email".to_string(), json!("a@b.co"))]),
        );

        let mut entity = Entity::new(schema);
        entity.set("email", json!("a@b.co")).unwrap();

        let errors = bag(p.validate(&entity));
        assert_eq!(errors.get("email").unwrap()[0].kind, ErrorKind::Unique);
    }

    #[test]
    fn test_hook_runs_last_and_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let schema = EntitySchema::builder("User", "users")
            .attributes(["email"])
            .after_validation(|_, bag| {
                CALLS.fetch_add(1, Ordering::SeqCst);
                bag.add_kind("email", ErrorKind::Custom { code: "veto".into() });
            })
            .unwrap()
            .build()
            .unwrap();

        let mut entity = Entity::new(schema);
        entity.set("email", json!("a@b.co")).unwrap();

        let errors = bag(pipeline().validate(&entity));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert!(matches!(
            errors.get("email").unwrap()[0].kind,
            ErrorKind::Custom { .. }
        ));
    }

    #[test]
    fn test_delete_hook_can_veto() {
        let schema = EntitySchema::builder("User", "users")
            .attributes(["email"])
            .before_delete(|entity, bag| {
                if entity.get("email").is_some() {
                    bag.add_kind("email", ErrorKind::Custom { code: "in_use".into() });
                }
            })
            .unwrap()
            .build()
            .unwrap();

        let mut entity = Entity::new(schema);
        entity.set("email", json!("a@b.co")).unwrap();

        assert!(pipeline()
            .validate_delete(&entity, ValidateOptions::default())
            .is_err());
    }

    #[test]
    fn test_display_name_override() {
        let entity = Entity::new(schema());
        let options = ValidateOptions::new()
            .rules("age", [Rule::Required])
            .attribute_name("age", "Age");
        let errors = bag(pipeline().validate_with(&entity, options));
        // Override names surface in stage-1/unique messages; rule messages
        // keep the kind's default text.
        assert!(errors.has_errors("age"));
    }
}
