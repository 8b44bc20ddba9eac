//! Coercion of raw operand strings to column types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use restfilter_core::{ColumnKind, StoreError};

use crate::value::{kind_name, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Coerce `raw` to a value of `kind`.
///
/// Numbers and booleans are trimmed first. Booleans accept `true`, `t`, `1`,
/// `false`, `f` and `0`, case-insensitively. Date-times accept RFC 3339
/// (converted to UTC), ISO 8601 without zone, or a bare date at midnight.
pub fn coerce(kind: ColumnKind, raw: &str, path: &str) -> Result<Value, StoreError> {
    let mismatch = || StoreError::TypeMismatch {
        path: path.to_string(),
        value: raw.to_string(),
        expected: kind_name(kind).to_string(),
    };
    let trimmed = raw.trim();

    match kind {
        ColumnKind::Char | ColumnKind::Text => Ok(Value::String(raw.to_string())),
        ColumnKind::Integer | ColumnKind::AutoId | ColumnKind::Relation => {
            trimmed.parse().map(Value::Int).map_err(|_| mismatch())
        }
        ColumnKind::Float | ColumnKind::Decimal => trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Float)
            .ok_or_else(mismatch),
        ColumnKind::Boolean | ColumnKind::NullBoolean => parse_bool(trimmed)
            .map(Value::Bool)
            .ok_or_else(mismatch),
        ColumnKind::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map(Value::Date)
            .map_err(|_| mismatch()),
        ColumnKind::DateTime => parse_datetime(trimmed)
            .map(Value::Timestamp)
            .ok_or_else(mismatch),
    }
}

/// Parse an integer null-test flag: zero is false, anything else true.
pub fn coerce_flag(raw: &str, path: &str) -> Result<bool, StoreError> {
    raw.trim()
        .parse::<i64>()
        .map(|flag| flag != 0)
        .map_err(|_| StoreError::TypeMismatch {
            path: path.to_string(),
            value: raw.to_string(),
            expected: "integer flag".to_string(),
        })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}
