//! Message translation and attribute display names.
//!
//! Validation messages are rendered through a [`Translator`]: a keyed
//! catalog with `:placeholder` substitution. The built-in [`Messages`]
//! catalog carries the English templates; integrations can supply their own
//! translator for other locales. Resolved attribute display names are held
//! in an [`AttributeNameCache`] keyed by locale, so repeated validations of
//! the same schema do not re-resolve them.

use parking_lot::RwLock;
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════════════
// Translator
// ═══════════════════════════════════════════════════════════════════════════════

/// A keyed message catalog with placeholder substitution.
pub trait Translator: Send + Sync {
    /// Resolve a message template by key and substitute `:name` placeholders
    /// from `params`. Returns `None` when the key is unknown.
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> Option<String>;
}

/// Substitute `:name` placeholders in a template.
pub(crate) fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!(":{name}"), value);
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// English Catalog
// ═══════════════════════════════════════════════════════════════════════════════

/// The built-in English message catalog.
#[derive(Debug, Default, Clone, Copy)]
pub struct Messages;

impl Messages {
    fn template(key: &str) -> Option<&'static str> {
        Some(match key {
            "validation.scalar" => "The :attribute must be a scalar value.",
            "validation.not_empty" => "The :attribute field cannot be empty.",
            "validation.calculated" => "The :attribute field is calculated automatically.",
            "validation.unchangeable" => "The :attribute field cannot be changed.",
            "validation.unique" => "The combination of :attributes must be unique.",
            "validation.is_list" => "The :attribute must be a plain list.",
            _ => return None,
        })
    }
}

impl Translator for Messages {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> Option<String> {
        Self::template(key).map(|template| substitute(template, params))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Attribute Name Cache
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-locale cache of resolved attribute display names.
///
/// Resolution happens at most once per `(locale, schema)` pair; switching
/// locale at runtime invalidates the stale entries via [`invalidate`].
///
/// [`invalidate`]: AttributeNameCache::invalidate
#[derive(Debug, Default)]
pub struct AttributeNameCache {
    names: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl AttributeNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display name for a field in a locale, if resolved.
    pub fn get(&self, locale: &str, field: &str) -> Option<String> {
        self.names.read().get(locale)?.get(field).cloned()
    }

    /// Whether any names have been resolved for a locale.
    pub fn has_locale(&self, locale: &str) -> bool {
        self.names.read().contains_key(locale)
    }

    /// Store the resolved names for a locale, replacing previous entries.
    pub fn fill(&self, locale: &str, names: HashMap<String, String>) {
        self.names.write().insert(locale.to_string(), names);
    }

    /// Drop the resolved names for a locale.
    pub fn invalidate(&self, locale: &str) {
        self.names.write().remove(locale);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution() {
        let msg = Messages
            .translate("validation.unchangeable", &[("attribute", "amount")])
            .unwrap();
        assert_eq!(msg, "The amount field cannot be changed.");
    }

    #[test]
    fn test_unknown_key() {
        assert!(Messages.translate("validation.nope", &[]).is_none());
    }

    #[test]
    fn test_multiple_placeholders() {
        let msg = substitute(":a and :b", &[("a", "x"), ("b", "y")]);
        assert_eq!(msg, "x and y");
    }

    #[test]
    fn test_name_cache_fill_and_invalidate() {
        let cache = AttributeNameCache::new();
        assert!(!cache.has_locale("en"));

        cache.fill("en", HashMap::from([("email".to_string(), "Email".to_string())]));
        assert_eq!(cache.get("en", "email").as_deref(), Some("Email"));

        cache.invalidate("en");
        assert!(cache.get("en", "email").is_none());
    }
}
