//! Scalar type coercion for document values.
//!
//! Casts are deliberately tolerant: a value that cannot be coerced (a
//! non-numeric string under an integer cast, an unparseable date) is left
//! unchanged so that genuinely invalid input surfaces later as a declared
//! rule failure instead of an internal error.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

/// Default output format for datetime casts.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ═══════════════════════════════════════════════════════════════════════════════
// Cast
// ═══════════════════════════════════════════════════════════════════════════════

/// The coercion to apply at a matched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastKind {
    Integer,
    Float,
    Bool,
    String,
    /// Parse a date-like string or unix timestamp and reformat it with the
    /// given strftime-style format.
    Datetime(std::string::String),
}

/// A cast with an optional-null marker (`?` prefix in the declaration form:
/// leave nulls untouched instead of coercing them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cast {
    pub kind: CastKind,
    pub optional: bool,
}

impl Cast {
    pub fn integer() -> Self {
        Self::new(CastKind::Integer)
    }

    pub fn float() -> Self {
        Self::new(CastKind::Float)
    }

    pub fn bool() -> Self {
        Self::new(CastKind::Bool)
    }

    pub fn string() -> Self {
        Self::new(CastKind::String)
    }

    pub fn datetime(format: Option<&str>) -> Self {
        Self::new(CastKind::Datetime(
            format.unwrap_or(DEFAULT_DATETIME_FORMAT).to_string(),
        ))
    }

    fn new(kind: CastKind) -> Self {
        Self {
            kind,
            optional: false,
        }
    }

    /// Mark the cast as null-preserving.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Apply the cast to a value.
    ///
    /// Container values (objects, arrays) pass through untouched; casts only
    /// make sense for scalar leaves.
    pub fn apply(&self, value: Value) -> Value {
        if self.optional && value.is_null() {
            return value;
        }
        if value.is_object() || value.is_array() {
            return value;
        }

        match &self.kind {
            CastKind::Integer => cast_integer(value),
            CastKind::Float => cast_float(value),
            CastKind::Bool => cast_bool(value),
            CastKind::String => cast_string(value),
            CastKind::Datetime(format) => cast_datetime(value, format),
        }
    }
}

fn cast_integer(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Value::Number(n)
            } else {
                match n.as_f64() {
                    Some(f) => Value::Number(Number::from(f as i64)),
                    None => Value::Number(n),
                }
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Value::Number(Number::from(i))
            } else if let Ok(f) = trimmed.parse::<f64>() {
                Value::Number(Number::from(f as i64))
            } else {
                // Guard: never turn a genuinely non-numeric string into garbage.
                Value::String(s)
            }
        }
        Value::Bool(b) => Value::Number(Number::from(i64::from(b))),
        Value::Null => Value::Number(Number::from(0)),
        other => other,
    }
}

fn cast_float(value: Value) -> Value {
    let number = |f: f64| Number::from_f64(f).map(Value::Number);
    match value {
        Value::Number(n) => match n.as_f64().and_then(|f| Number::from_f64(f)) {
            Some(f) => Value::Number(f),
            None => Value::Number(n),
        },
        Value::String(s) => match s.trim().parse::<f64>().ok().and_then(number) {
            Some(v) => v,
            None => Value::String(s),
        },
        Value::Bool(b) => number(if b { 1.0 } else { 0.0 }).unwrap_or(Value::Bool(b)),
        Value::Null => number(0.0).unwrap_or(Value::Null),
        other => other,
    }
}

fn cast_bool(value: Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(b),
        Value::Number(n) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => Value::Bool(!(s.is_empty() || s == "0")),
        Value::Null => Value::Bool(false),
        other => other,
    }
}

fn cast_string(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(if b { "1".to_string() } else { String::new() }),
        Value::Null => Value::String(String::new()),
        other => other,
    }
}

fn cast_datetime(value: Value, format: &str) -> Value {
    let parsed = match &value {
        Value::String(s) => parse_datetime(s),
        Value::Number(n) => n.as_i64().and_then(timestamp_to_naive),
        _ => None,
    };

    match parsed {
        Some(dt) => Value::String(dt.format(format).to_string()),
        // Unparseable input stays as-is; declared rules will flag it.
        None => value,
    }
}

fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(ts) = input.parse::<i64>() {
        return timestamp_to_naive(ts);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}

fn timestamp_to_naive(ts: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.naive_utc())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Declaration Form
// ═══════════════════════════════════════════════════════════════════════════════

/// Error for an invalid cast declaration.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unsupported cast: {0:?} (expected a lowercase name like \"integer\" or \"?datetime:%Y-%m-%d\")")]
pub struct CastParseError(pub String);

impl FromStr for Cast {
    type Err = CastParseError;

    /// Parse the declaration form: an optional `?` prefix, a lowercase cast
    /// name, and for `datetime` an optional `:format` suffix.
    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        let (optional, rest) = match input.strip_prefix('?') {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        let (name, format) = match rest.split_once(':') {
            Some((name, format)) => (name, Some(format)),
            None => (rest, None),
        };

        let cast = match (name, format) {
            ("integer", None) => Cast::integer(),
            ("float", None) => Cast::float(),
            ("bool", None) => Cast::bool(),
            ("string", None) => Cast::string(),
            ("datetime", format) => Cast::datetime(format),
            _ => return Err(CastParseError(input.to_string())),
        };

        Ok(if optional { cast.optional() } else { cast })
    }
}

impl fmt::Display for Cast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "?")?;
        }
        match &self.kind {
            CastKind::Integer => write!(f, "integer"),
            CastKind::Float => write!(f, "float"),
            CastKind::Bool => write!(f, "bool"),
            CastKind::String => write!(f, "string"),
            CastKind::Datetime(format) if format == DEFAULT_DATETIME_FORMAT => {
                write!(f, "datetime")
            }
            CastKind::Datetime(format) => write!(f, "datetime:{}", format),
        }
    }
}

impl Serialize for Cast {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cast {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = std::string::String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
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
    fn test_integer_cast() {
        assert_eq!(Cast::integer().apply(json!("5")), json!(5));
        assert_eq!(Cast::integer().apply(json!("5.9")), json!(5));
        assert_eq!(Cast::integer().apply(json!(7)), json!(7));
        assert_eq!(Cast::integer().apply(json!(true)), json!(1));
        assert_eq!(Cast::integer().apply(Value::Null), json!(0));
    }

    #[test]
    fn test_integer_cast_skips_non_numeric_strings() {
        assert_eq!(Cast::integer().apply(json!("abc")), json!("abc"));
        assert_eq!(Cast::integer().apply(json!("12abc")), json!("12abc"));
    }

    #[test]
    fn test_optional_cast_leaves_null_untouched() {
        assert_eq!(Cast::integer().optional().apply(Value::Null), Value::Null);
        assert_eq!(Cast::bool().optional().apply(Value::Null), Value::Null);
    }

    #[test]
    fn test_float_cast() {
        assert_eq!(Cast::float().apply(json!("2.5")), json!(2.5));
        assert_eq!(Cast::float().apply(json!("x")), json!("x"));
    }

    #[test]
    fn test_bool_cast() {
        assert_eq!(Cast::bool().apply(json!("0")), json!(false));
        assert_eq!(Cast::bool().apply(json!("")), json!(false));
        assert_eq!(Cast::bool().apply(json!("yes")), json!(true));
        assert_eq!(Cast::bool().apply(json!(0)), json!(false));
        assert_eq!(Cast::bool().apply(json!(3)), json!(true));
    }

    #[test]
    fn test_string_cast() {
        assert_eq!(Cast::string().apply(json!(42)), json!("42"));
        assert_eq!(Cast::string().apply(json!(true)), json!("1"));
    }

    #[test]
    fn test_datetime_cast_reformats() {
        let cast = Cast::datetime(None);
        assert_eq!(
            cast.apply(json!("2024-03-01")),
            json!("2024-03-01 00:00:00")
        );
        assert_eq!(
            cast.apply(json!("2024-03-01 10:20:30")),
            json!("2024-03-01 10:20:30")
        );
    }

    #[test]
    fn test_datetime_cast_from_timestamp() {
        let cast = Cast::datetime(Some("%Y-%m-%d"));
        assert_eq!(cast.apply(json!(0)), json!("1970-01-01"));
    }

    #[test]
    fn test_datetime_cast_tolerates_garbage() {
        let cast = Cast::datetime(None);
        assert_eq!(cast.apply(json!("not a date")), json!("not a date"));
    }

    #[test]
    fn test_containers_pass_through() {
        assert_eq!(Cast::integer().apply(json!([1, 2])), json!([1, 2]));
        assert_eq!(Cast::string().apply(json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn test_parse_declaration_form() {
        assert_eq!("integer".parse::<Cast>().unwrap(), Cast::integer());
        assert_eq!(
            "?integer".parse::<Cast>().unwrap(),
            Cast::integer().optional()
        );
        assert_eq!(
            "datetime:%Y".parse::<Cast>().unwrap(),
            Cast::datetime(Some("%Y"))
        );
        assert!("Integer".parse::<Cast>().is_err());
        assert!("uuid".parse::<Cast>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for raw in ["integer", "?float", "bool", "string", "datetime", "?datetime:%Y-%m-%d"] {
            let cast: Cast = raw.parse().unwrap();
            assert_eq!(cast.to_string(), raw);
        }
    }
}
