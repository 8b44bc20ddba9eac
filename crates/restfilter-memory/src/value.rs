//! Typed cell values.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use restfilter_core::{ColumnKind, StoreError};
use serde_json::Value as Json;

use crate::coerce::coerce;

/// A single cell of a [`MemoryTable`](crate::MemoryTable).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Text.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time, without zone (UTC).
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Whether this is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Read a JSON cell as a value of the column type.
    ///
    /// JSON `null` is NULL for every kind. Strings are coerced the same way
    /// filter operands are, so dates and numbers may be given as text.
    pub fn from_json(json: &Json, kind: ColumnKind, column: &str) -> Result<Value, StoreError> {
        let mismatch = || StoreError::TypeMismatch {
            path: column.to_string(),
            value: json.to_string(),
            expected: kind_name(kind).to_string(),
        };
        match (json, kind) {
            (Json::Null, _) => Ok(Value::Null),
            (Json::String(s), _) => coerce(kind, s, column),
            (Json::Bool(b), ColumnKind::Boolean | ColumnKind::NullBoolean) => Ok(Value::Bool(*b)),
            (
                Json::Number(n),
                ColumnKind::Integer | ColumnKind::AutoId | ColumnKind::Relation,
            ) => n.as_i64().map(Value::Int).ok_or_else(mismatch),
            (Json::Number(n), ColumnKind::Float | ColumnKind::Decimal) => {
                n.as_f64().map(Value::Float).ok_or_else(mismatch)
            }
            (Json::Number(n), ColumnKind::Char | ColumnKind::Text) => Ok(Value::String(n.to_string())),
            (Json::Bool(b), ColumnKind::Char | ColumnKind::Text) => Ok(Value::String(b.to_string())),
            _ => Err(mismatch()),
        }
    }

    /// Render as JSON. Dates use ISO 8601.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Date(_) | Value::Timestamp(_) => Json::String(self.to_string()),
        }
    }

    /// Equality between two non-null values of compatible types.
    pub fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) => (*a as f64) == *b,
            (Value::Float(a), Value::Int(b)) => *a == (*b as f64),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Timestamp(a), Value::Date(b)) => a.date() == *b && a.time() == chrono::NaiveTime::MIN,
            (Value::Date(a), Value::Timestamp(b)) => *a == b.date() && b.time() == chrono::NaiveTime::MIN,
            _ => false,
        }
    }

    /// Ordering between two non-null values, if comparable.
    pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Date(b)) => Some(a.cmp(&b.and_time(chrono::NaiveTime::MIN))),
            (Value::Date(a), Value::Timestamp(b)) => Some(a.and_time(chrono::NaiveTime::MIN).cmp(b)),
            _ => None,
        }
    }

    /// Total order for sorting: NULLs first, incomparable values equal.
    pub fn sort_cmp(a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => Self::compare_values(a, b).unwrap_or(Ordering::Equal),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

/// Type name used in mismatch errors.
pub(crate) fn kind_name(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Char | ColumnKind::Text => "string",
        ColumnKind::Integer | ColumnKind::AutoId | ColumnKind::Relation => "integer",
        ColumnKind::Float | ColumnKind::Decimal => "number",
        ColumnKind::Boolean | ColumnKind::NullBoolean => "boolean",
        ColumnKind::Date => "date",
        ColumnKind::DateTime => "datetime",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_by_kind() {
        assert_eq!(Value::from_json(&json!(5), ColumnKind::Integer, "n").unwrap(), Value::Int(5));
        assert_eq!(Value::from_json(&json!("5"), ColumnKind::Integer, "n").unwrap(), Value::Int(5));
        assert_eq!(Value::from_json(&json!(1.5), ColumnKind::Decimal, "n").unwrap(), Value::Float(1.5));
        assert_eq!(Value::from_json(&json!(null), ColumnKind::Date, "d").unwrap(), Value::Null);
        assert_eq!(
            Value::from_json(&json!(7), ColumnKind::Text, "s").unwrap(),
            Value::String("7".into())
        );
        assert_eq!(
            Value::from_json(&json!("2024-02-29"), ColumnKind::Date, "d").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
    }

    #[test]
    fn test_from_json_mismatch() {
        let err = Value::from_json(&json!(1.5), ColumnKind::Integer, "age").unwrap_err();
        assert_eq!(err.to_string(), "value '1.5' is not a valid integer for 'age'");
        assert!(Value::from_json(&json!([1]), ColumnKind::Text, "s").is_err());
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::Int(3).to_json(), json!(3));
        assert_eq!(Value::Float(f64::NAN).to_json(), json!(null));
        let d = Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(d.to_json(), json!("2024-01-02"));
    }

    #[test]
    fn test_numeric_comparisons_mix_int_and_float() {
        assert!(Value::values_equal(&Value::Int(2), &Value::Float(2.0)));
        assert_eq!(
            Value::compare_values(&Value::Int(2), &Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::compare_values(&Value::Int(2), &Value::String("2".into())), None);
    }

    #[test]
    fn test_sort_puts_nulls_first() {
        assert_eq!(Value::sort_cmp(&Value::Null, &Value::Int(0)), Ordering::Less);
        assert_eq!(Value::sort_cmp(&Value::Int(1), &Value::Null), Ordering::Greater);
        assert_eq!(Value::sort_cmp(&Value::Null, &Value::Null), Ordering::Equal);
    }
}
