//! Structural invariants: calculated fields, unchangeable fields and
//! uniqueness groups.
//!
//! Unlike declared rules, these checks come from the schema's constraint
//! sets and always run together; their failures aggregate into one bag so a
//! caller sees every structural defect at once.

use tracing::debug;

use crate::entity::Entity;
use crate::error::Result;
use crate::store::{UniqueQuery, UniquenessStore};
use crate::translate::Translator;
use crate::validation::error::{ErrorBag, ErrorKind, FieldError};

/// Run all structural checks and aggregate the failures.
pub(crate) fn check<S: UniquenessStore>(
    entity: &Entity,
    store: &S,
    translator: &dyn Translator,
    locale: &str,
) -> Result<ErrorBag> {
    let mut bag = ErrorBag::new();
    let schema = entity.schema();

    // Calculated fields may never be supplied with a changed value, not even
    // on a fresh entity.
    for field in &schema.calculated {
        if entity.attributes().contains_key(field) && entity.dirty(field) {
            bag.add(field, labeled_error(
                ErrorKind::Calculated,
                "validation.calculated",
                entity,
                translator,
                locale,
                field,
            ));
        }
    }

    // Unchangeable fields lock only once the entity has been persisted.
    if entity.exists() {
        for field in &schema.unchangeable {
            if entity.dirty(field) {
                bag.add(field, labeled_error(
                    ErrorKind::Unchangeable,
                    "validation.unchangeable",
                    entity,
                    translator,
                    locale,
                    field,
                ));
            }
        }
    }

    for group in &schema.unique {
        if group.is_empty() {
            continue;
        }
        // No member changed: the stored combination already passed.
        if !group.iter().any(|field| entity.dirty(field)) {
            debug!(entity = schema.name(), group = ?group, "uniqueness group clean, skipping probe");
            continue;
        }

        let query = UniqueQuery {
            table: schema.qualified_table(),
            conjuncts: group
                .iter()
                .map(|field| {
                    let value = entity.get(field).filter(|v| !v.is_null()).cloned();
                    (field.clone(), value)
                })
                .collect(),
            exclude: entity
                .identity()
                .map(|id| (schema.primary_key().to_string(), id.clone())),
            include_soft_deleted: schema.soft_deletes(),
        };

        if store.find_conflict(&query)? {
            let names: Vec<String> = group
                .iter()
                .map(|field| schema.display_name(locale, field))
                .collect();
            let message = translator
                .translate("validation.unique", &[("attributes", &names.join(", "))]);
            let error = match message {
                Some(message) => FieldError::with_message(ErrorKind::Unique, message),
                None => FieldError::new(ErrorKind::Unique),
            };
            // The violation is keyed to the group's first field.
            bag.add(&group[0], error);
        }
    }

    Ok(bag)
}

fn labeled_error(
    kind: ErrorKind,
    key: &str,
    entity: &Entity,
    translator: &dyn Translator,
    locale: &str,
    field: &str,
) -> FieldError {
    let name = entity.schema().display_name(locale, field);
    match translator.translate(key, &[("attribute", &name)]) {
        Some(message) => FieldError::with_message(kind, message),
        None => FieldError::new(kind),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntitySchema;
    use crate::store::MemoryStore;
    use crate::translate::Messages;
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    fn schema() -> Arc<EntitySchema> {
        EntitySchema::builder("Invoice", "invoices")
            .attributes(["number", "amount", "total"])
            .calculated(["total"])
            .unchangeable(["amount"])
            .unique(["number"])
            .build()
            .unwrap()
    }

    fn persisted(pairs: &[(&str, Value)]) -> Entity {
        let map: Map<String, Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Entity::from_persisted(schema(), map).unwrap()
    }

    fn run(entity: &Entity, store: &MemoryStore) -> ErrorBag {
        check(entity, store, &Messages, "en").unwrap()
    }

    #[test]
    fn test_calculated_rejected_even_on_fresh_entity() {
        let store = MemoryStore::new();
        let mut entity = Entity::new(schema());
        entity.set("total", json!(99)).unwrap();

        let bag = run(&entity, &store);
        assert!(bag.has_errors("total"));
        assert_eq!(bag.get("total").unwrap()[0].kind, ErrorKind::Calculated);
    }

    #[test]
    fn test_calculated_untouched_is_fine() {
        let store = MemoryStore::new();
        let entity = persisted(&[("id", json!(1)), ("total", json!(99))]);
        assert!(!run(&entity, &store).has_errors("total"));
    }

    #[test]
    fn test_unchangeable_only_binds_existing_entities() {
        let store = MemoryStore::new();
        let mut fresh = Entity::new(schema());
        fresh.set("amount", json!(100)).unwrap();
        assert!(run(&fresh, &store).is_empty());

        let mut entity = persisted(&[("id", json!(1)), ("amount", json!(100))]);
        entity.set("amount", json!(150)).unwrap();
        let bag = run(&entity, &store);
        assert_eq!(bag.get("amount").unwrap()[0].kind, ErrorKind::Unchangeable);
        assert_eq!(
            bag.get("amount").unwrap()[0].message,
            "The amount field cannot be changed."
        );
    }

    #[test]
    fn test_unique_group_conflict_keys_first_field() {
        let store = MemoryStore::new();
        store.insert(
            "invoices",
            Map::from_iter([("number".to_string(), json!("INV-1"))]),
        );

        let mut entity = Entity::new(schema());
        entity.set("number", json!("INV-1")).unwrap();

        let bag = run(&entity, &store);
        assert_eq!(bag.get("number").unwrap()[0].kind, ErrorKind::Unique);
    }

    #[test]
    fn test_clean_group_skips_the_store() {
        let store = MemoryStore::new();
        let entity = persisted(&[("id", json!(1)), ("number", json!("INV-1"))]);

        run(&entity, &store);
        assert_eq!(store.query_count(), 0);
    }

    #[test]
    fn test_self_row_is_excluded() {
        let store = MemoryStore::new();
        store.insert(
            "invoices",
            Map::from_iter([
                ("id".to_string(), json!(1)),
                ("number".to_string(), json!("INV-2")),
            ]),
        );

        let mut entity = persisted(&[("id", json!(1)), ("number", json!("INV-1"))]);
        entity.set("number", json!("INV-2")).unwrap();

        assert!(run(&entity, &store).is_empty());
        assert_eq!(store.query_count(), 1);
    }

    #[test]
    fn test_null_member_probes_is_null() {
        let schema = EntitySchema::builder("User", "users")
            .attributes(["email", "team_id"])
            .unique(["email", "team_id"])
            .build()
            .unwrap();

        let store = MemoryStore::new();
        store.insert(
            "users",
            Map::from_iter([
                ("email".to_string(), json!("a@b.co")),
                ("team_id".to_string(), Value::Null),
            ]),
        );

        let mut entity = Entity::new(schema);
        entity.set("email", json!("a@b.co")).unwrap();

        let bag = check(&entity, &store, &Messages, "en").unwrap();
        assert!(bag.has_errors("email"));
    }
}
