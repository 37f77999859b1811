//! Declarative validation rules.
//!
//! Rules are a tagged variant type built once at schema declaration time
//! (there is no string mini-DSL to parse at runtime). Each rule evaluates
//! against the attribute's current JSON value; uniqueness rules carry their
//! constraint spec and are resolved by the pipeline against the persistence
//! collaborator.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::validation::error::{ErrorKind, FieldError};

// ═══════════════════════════════════════════════════════════════════════════════
// Pre-compiled Regex Patterns
// ═══════════════════════════════════════════════════════════════════════════════

/// Email validation regex (RFC 5322 simplified).
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("Invalid email regex")
});

// ═══════════════════════════════════════════════════════════════════════════════
// Uniqueness Constraint Spec
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameters of a uniqueness constraint, in shorthand or expanded form.
///
/// Shorthand forms leave fields unset; the canonicalizer fills them in from
/// the entity's identity before the pipeline runs (see
/// [`canonicalize`](crate::validation::canonicalize)).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniqueSpec {
    /// Qualified storage location; defaults to the entity's own table.
    pub table: Option<String>,
    /// Comparison column; defaults to the constrained field's name.
    pub column: Option<String>,
    /// `(identity value, identity column)` exclusion clause.
    pub exclude: Option<(Value, String)>,
}

impl UniqueSpec {
    /// Fully-shorthand spec: table, column and exclusion all inferred.
    pub fn inferred() -> Self {
        Self::default()
    }

    /// Constrain against an explicit table, column still inferred.
    pub fn in_table(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Self::default()
        }
    }

    /// Constrain against an explicit table and column.
    pub fn in_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: Some(column.into()),
            exclude: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rule
// ═══════════════════════════════════════════════════════════════════════════════

/// A single declared validation rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Value must be present and non-empty.
    Required,
    /// Value must be a scalar or null, never a nested structure.
    Scalar,
    /// String minimum length (characters).
    MinLength(usize),
    /// String maximum length (characters).
    MaxLength(usize),
    /// Numeric minimum value.
    Min(f64),
    /// Numeric maximum value.
    Max(f64),
    /// String must look like an email address.
    Email,
    /// String must match a custom regex.
    Pattern { regex: Regex, description: String },
    /// Value must be one of the allowed literals.
    OneOf(Vec<String>),
    /// Value must be unique in the backing store.
    Unique(UniqueSpec),
}

impl Rule {
    /// Build a custom pattern rule from a regex string.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern {
            regex: Regex::new(pattern)?,
            description: pattern.to_string(),
        })
    }

    /// Shorthand uniqueness rule; the canonicalizer infers the parameters.
    pub fn unique() -> Self {
        Self::Unique(UniqueSpec::inferred())
    }

    /// Evaluate the rule against a field value (`None` when the attribute is
    /// absent). Uniqueness rules are not evaluated here; they require the
    /// persistence collaborator and are handled by the pipeline.
    pub fn evaluate(&self, value: Option<&Value>) -> Option<FieldError> {
        match self {
            Self::Required => eval_required(value),
            Self::Scalar => eval_scalar(value),
            Self::MinLength(min) => eval_min_length(value, *min),
            Self::MaxLength(max) => eval_max_length(value, *max),
            Self::Min(min) => eval_min(value, *min),
            Self::Max(max) => eval_max(value, *max),
            Self::Email => eval_email(value),
            Self::Pattern { regex, description } => eval_pattern(value, regex, description),
            Self::OneOf(allowed) => eval_one_of(value, allowed),
            Self::Unique(_) => None,
        }
    }
}

fn eval_required(value: Option<&Value>) -> Option<FieldError> {
    let empty = match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    };
    empty.then(|| FieldError::new(ErrorKind::Required))
}

fn eval_scalar(value: Option<&Value>) -> Option<FieldError> {
    match value {
        Some(Value::Array(_)) | Some(Value::Object(_)) => {
            Some(FieldError::new(ErrorKind::Scalar))
        }
        _ => None,
    }
}

fn eval_min_length(value: Option<&Value>, min: usize) -> Option<FieldError> {
    let s = value.and_then(Value::as_str)?;
    let actual = s.chars().count();
    (actual < min).then(|| FieldError::new(ErrorKind::MinLength { min, actual }))
}

fn eval_max_length(value: Option<&Value>, max: usize) -> Option<FieldError> {
    let s = value.and_then(Value::as_str)?;
    let actual = s.chars().count();
    (actual > max).then(|| FieldError::new(ErrorKind::MaxLength { max, actual }))
}

fn eval_min(value: Option<&Value>, min: f64) -> Option<FieldError> {
    let actual = numeric(value?)?;
    (actual < min).then(|| {
        FieldError::new(ErrorKind::MinValue {
            min: min.to_string(),
            actual: actual.to_string(),
        })
    })
}

fn eval_max(value: Option<&Value>, max: f64) -> Option<FieldError> {
    let actual = numeric(value?)?;
    (actual > max).then(|| {
        FieldError::new(ErrorKind::MaxValue {
            max: max.to_string(),
            actual: actual.to_string(),
        })
    })
}

fn eval_email(value: Option<&Value>) -> Option<FieldError> {
    let s = value.and_then(Value::as_str)?;
    // Empty is valid here; presence is Required's job.
    (!s.is_empty() && !EMAIL_REGEX.is_match(s)).then(|| FieldError::new(ErrorKind::InvalidEmail))
}

fn eval_pattern(value: Option<&Value>, regex: &Regex, description: &str) -> Option<FieldError> {
    let s = value.and_then(Value::as_str)?;
    (!s.is_empty() && !regex.is_match(s)).then(|| {
        FieldError::new(ErrorKind::Pattern {
            pattern: description.to_string(),
        })
    })
}

fn eval_one_of(value: Option<&Value>, allowed: &[String]) -> Option<FieldError> {
    let repr = scalar_repr(value?)?;
    (!allowed.iter().any(|a| *a == repr)).then(|| {
        FieldError::new(ErrorKind::NotInSet {
            allowed: allowed.to_vec(),
        })
    })
}

/// Numeric view of a value: numbers directly, numeric strings parsed.
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Scalar literal representation used for set-membership comparison.
fn scalar_repr(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required() {
        assert!(Rule::Required.evaluate(None).is_some());
        assert!(Rule::Required.evaluate(Some(&Value::Null)).is_some());
        assert!(Rule::Required.evaluate(Some(&json!(""))).is_some());
        assert!(Rule::Required.evaluate(Some(&json!("  "))).is_some());
        assert!(Rule::Required.evaluate(Some(&json!("x"))).is_none());
        assert!(Rule::Required.evaluate(Some(&json!(0))).is_none());
    }

    #[test]
    fn test_scalar() {
        assert!(Rule::Scalar.evaluate(Some(&json!({"a": 1}))).is_some());
        assert!(Rule::Scalar.evaluate(Some(&json!([1]))).is_some());
        assert!(Rule::Scalar.evaluate(Some(&json!("x"))).is_none());
        assert!(Rule::Scalar.evaluate(Some(&Value::Null)).is_none());
        assert!(Rule::Scalar.evaluate(None).is_none());
    }

    #[test]
    fn test_length_rules() {
        assert!(Rule::MinLength(3).evaluate(Some(&json!("hi"))).is_some());
        assert!(Rule::MinLength(3).evaluate(Some(&json!("hello"))).is_none());
        assert!(Rule::MaxLength(3).evaluate(Some(&json!("hello"))).is_some());
        // Non-strings are out of scope for length rules.
        assert!(Rule::MinLength(3).evaluate(Some(&json!(12))).is_none());
    }

    #[test]
    fn test_numeric_rules_accept_numeric_strings() {
        assert!(Rule::Min(10.0).evaluate(Some(&json!(5))).is_some());
        assert!(Rule::Min(10.0).evaluate(Some(&json!("5"))).is_some());
        assert!(Rule::Min(10.0).evaluate(Some(&json!("15"))).is_none());
        assert!(Rule::Max(10.0).evaluate(Some(&json!(11))).is_some());
        assert!(Rule::Max(10.0).evaluate(Some(&json!("abc"))).is_none());
    }

    #[test]
    fn test_email() {
        assert!(Rule::Email.evaluate(Some(&json!("a@b.co"))).is_none());
        assert!(Rule::Email.evaluate(Some(&json!("nope"))).is_some());
        assert!(Rule::Email.evaluate(Some(&json!(""))).is_none());
    }

    #[test]
    fn test_pattern() {
        let rule = Rule::pattern(r"^[A-Z]{3}$").unwrap();
        assert!(rule.evaluate(Some(&json!("ABC"))).is_none());
        assert!(rule.evaluate(Some(&json!("abc"))).is_some());
    }

    #[test]
    fn test_one_of() {
        let rule = Rule::OneOf(vec!["red".into(), "green".into()]);
        assert!(rule.evaluate(Some(&json!("red"))).is_none());
        assert!(rule.evaluate(Some(&json!("blue"))).is_some());
        assert!(rule.evaluate(Some(&Value::Null)).is_none());
    }

    #[test]
    fn test_unique_is_inert_without_a_store() {
        assert!(Rule::unique().evaluate(Some(&json!("x"))).is_none());
    }
}
