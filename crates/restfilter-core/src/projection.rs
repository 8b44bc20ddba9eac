//! Field projection for partial responses.
//!
//! The `fields` parameter (repeatable, comma-separated) names the output
//! fields a client wants. A [`Projection`] never mutates the DTO; it yields
//! the selected field list, or plucks dotted paths out of rendered JSON rows.
//!
//! # Path syntax
//!
//! ```text
//! a.b.c     nested object keys
//! items.0   array index
//! items.*   every element of an array or every value of an object
//! ```

use serde_json::{Map, Value};

use crate::config::FilterConfig;
use crate::params::QueryParams;
use crate::schema::{DtoField, DtoSchema};

const DELIMITER: char = '.';
const WILDCARD: &str = "*";

/// Flatten comma-separated lists into unique items, in first-appearance
/// order. Empty items are dropped.
pub fn collect_items_from_string_lists<S: AsRef<str>>(lists: &[S]) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in lists.iter().flat_map(|s| s.as_ref().split(',')) {
        let item = item.trim();
        if !item.is_empty() && !items.iter().any(|i| i == item) {
            items.push(item.to_string());
        }
    }
    items
}

/// The output fields requested by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Create a projection over the given paths.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lists: Vec<S> = fields.into_iter().collect();
        Self {
            fields: collect_items_from_string_lists(&lists),
        }
    }

    /// The projection requested by `params`, or `None` when the fields
    /// parameter is absent.
    pub fn from_params(params: &QueryParams, config: &FilterConfig) -> Option<Self> {
        if !params.contains(&config.fields_param) {
            return None;
        }
        Some(Self {
            fields: collect_items_from_string_lists(params.get_all(&config.fields_param)),
        })
    }

    /// The requested paths.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether no path was requested.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The DTO's output fields whose names were requested, in DTO order.
    pub fn select_fields<'a>(&self, dto: &'a DtoSchema) -> Vec<&'a DtoField> {
        dto.fields
            .iter()
            .filter(|f| self.fields.iter().any(|name| *name == f.name))
            .collect()
    }

    /// Extract the requested paths from a rendered row.
    ///
    /// Arrays are plucked element-wise. Non-object values, and any value when
    /// the projection is empty, are returned unchanged. Keys of the result are
    /// absolute dotted paths; paths that do not resolve map to `null`.
    pub fn pluck(&self, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.iter().map(|v| self.pluck(v)).collect()),
            Value::Object(_) if !self.fields.is_empty() => {
                let mut out = Map::new();
                for field in &self.fields {
                    for (path, found) in traverse(field, value) {
                        out.insert(path, found);
                    }
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }
}

/// Every `(absolute path, value)` pair matching `path` within `value`.
///
/// A path that does not resolve yields one pair with the unresolved path and
/// `null`; a wildcard over an empty container yields nothing.
pub fn traverse(path: &str, value: &Value) -> Vec<(String, Value)> {
    let fragments: Vec<&str> = path.split(DELIMITER).filter(|f| !f.is_empty()).collect();
    let mut out = Vec::new();
    traverse_into(&fragments, Some(value), &mut Vec::new(), &mut out);
    out
}

fn traverse_into(
    path: &[&str],
    value: Option<&Value>,
    prefix: &mut Vec<String>,
    out: &mut Vec<(String, Value)>,
) {
    let unresolved = |prefix: &[String], out: &mut Vec<(String, Value)>| {
        let mut parts: Vec<&str> = prefix.iter().map(String::as_str).collect();
        parts.extend_from_slice(path);
        out.push((parts.join("."), Value::Null));
    };

    let value = match value {
        Some(Value::Null) | None => return unresolved(&prefix[..], out),
        Some(v) => v,
    };
    let Some((&head, rest)) = path.split_first() else {
        out.push((prefix.join("."), value.clone()));
        return;
    };

    let descend = |key: String,
                   child: &Value,
                   prefix: &mut Vec<String>,
                   out: &mut Vec<(String, Value)>| {
        prefix.push(key);
        traverse_into(rest, Some(child), prefix, out);
        prefix.pop();
    };

    match value {
        Value::Object(map) if head == WILDCARD => {
            for (key, child) in map {
                descend(key.clone(), child, prefix, out);
            }
        }
        Value::Array(items) if head == WILDCARD => {
            for (idx, child) in items.iter().enumerate() {
                descend(idx.to_string(), child, prefix, out);
            }
        }
        Value::Object(map) => {
            prefix.push(head.to_string());
            traverse_into(rest, map.get(head), prefix, out);
            prefix.pop();
        }
        Value::Array(items) => match head.parse::<usize>().ok().and_then(|i| items.get(i)) {
            Some(child) => descend(head.to_string(), child, prefix, out),
            None => unresolved(&prefix[..], out),
        },
        _ => unresolved(&prefix[..], out),
    }
}
