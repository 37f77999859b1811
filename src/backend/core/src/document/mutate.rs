//! Recursive document normalization.
//!
//! [`mutate`] walks a JSON-like tree bottom-up and applies the
//! [`DocumentSchema`] rules at every path: null-normalization, purging,
//! scalar casts, value ordering and dense reindexing. The function is pure;
//! the input tree is never modified in place.

use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::document::path::PathKey;
use crate::document::schema::DocumentSchema;

/// Synthetic key the document root is wrapped under, so root-level patterns
/// (`$`) match via a path of length one.
const ROOT_KEY: &str = "$";

// ═══════════════════════════════════════════════════════════════════════════════
// Mutation
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalize a document tree according to its schema.
pub fn mutate(value: &Value, schema: &DocumentSchema) -> Value {
    let mut path = vec![PathKey::Key(ROOT_KEY.to_string())];
    apply(value.clone(), &mut path, schema).unwrap_or(Value::Null)
}

/// Apply the schema at one node. Returns `None` when the node was purged.
fn apply(value: Value, path: &mut Vec<PathKey>, schema: &DocumentSchema) -> Option<Value> {
    // Children first: sort/list rules must see already-normalized subtrees.
    let mut value = match value {
        Value::Object(entries) => {
            let mut out = Map::new();
            for (key, item) in entries {
                path.push(PathKey::Key(key.clone()));
                let kept = apply(item, path, schema);
                path.pop();
                if let Some(item) = kept {
                    out.insert(key, item);
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            let mut out = Vec::new();
            for (index, item) in items.into_iter().enumerate() {
                path.push(PathKey::Index(index));
                let kept = apply(item, path, schema);
                path.pop();
                if let Some(item) = kept {
                    out.push(item);
                }
            }
            Value::Array(out)
        }
        other => other,
    };

    if is_emptyish(&value) && schema.nullable_matches(path) {
        value = Value::Null;
    }

    // Null leaves below the root are deleted outright under a purge match.
    if value.is_null() && path.len() > 1 && schema.purge_matches(path) {
        return None;
    }

    for cast in schema.casts_for(path) {
        value = cast.apply(value);
    }

    if schema.sort_matches(path) {
        value = sort_by_value(value);
    }

    if schema.list_matches(path) {
        value = reindex(value);
    }

    Some(value)
}

/// Empty string, empty list or empty map: candidates for null-normalization.
fn is_emptyish(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        _ => false,
    }
}

/// Order a collection by its values, preserving key association for maps.
fn sort_by_value(value: Value) -> Value {
    match value {
        Value::Array(mut items) => {
            items.sort_by(compare_values);
            Value::Array(items)
        }
        Value::Object(entries) => {
            let mut pairs: Vec<(String, Value)> = entries.into_iter().collect();
            pairs.sort_by(|(_, a), (_, b)| compare_values(a, b));
            Value::Object(pairs.into_iter().collect())
        }
        other => other,
    }
}

/// Reindex a collection into a dense zero-based sequence, dropping any
/// associative keys.
fn reindex(value: Value) -> Value {
    match value {
        Value::Object(entries) => Value::Array(entries.into_values().collect()),
        other => other,
    }
}

/// Total order over document values: rank by type family, then within type.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => rank(a).cmp(&rank(b)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
