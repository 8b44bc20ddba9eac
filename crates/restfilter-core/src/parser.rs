//! Parsing of raw query-parameter values.
//!
//! # Expression syntax
//!
//! ```text
//! value              -> eq:value
//! op:value           -> single-valued operator
//! op:(a, b, c)       -> multi-valued operator; () or [] optional
//! isnull:1           -> boolean operator, integer operand
//! ```
//!
//! The operator is everything before the first `:`. A value that contains a
//! `:` therefore needs an explicit operator (`eq:10:30`).

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{FilterError, Result};
use crate::operator::Operator;
use crate::predicate::Operand;

static SEARCH_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]+)"|(\S+)"#).unwrap_or_else(|e| panic!("invalid search regex: {e}"))
});

static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s{2,}").unwrap_or_else(|e| panic!("invalid whitespace regex: {e}"))
});

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExpression {
    /// The resolved operator.
    pub operator: &'static Operator,
    /// The operand, not yet converted by the field.
    pub operand: Operand,
}

/// Parse one raw value given for `field`.
///
/// Validates the operator token, the operand count against the operator's
/// arity, and the integer operand of boolean operators. For boolean
/// operators the operand is normalized to its integer form.
pub fn parse_expression(field: &str, expr: &str) -> Result<ParsedExpression> {
    let (operator, value) = match expr.split_once(':') {
        Some((opname, value)) => {
            let operator = Operator::lookup(opname).ok_or_else(|| FilterError::UnknownOperator {
                field: field.to_string(),
                operator: opname.to_string(),
            })?;
            (operator, value)
        }
        None => (Operator::default_operator(), expr),
    };

    if operator.is_multi_valued() {
        let values = parse_array(value);
        if values.len() < operator.min_vals || values.len() > operator.max_vals {
            return Err(FilterError::ArityViolation {
                field: field.to_string(),
                operator: operator.name.to_string(),
                expected: operator.expected_value_description(),
                got: values.len(),
            });
        }
        return Ok(ParsedExpression {
            operator,
            operand: Operand::List(values),
        });
    }

    let operand = if operator.boolean {
        let flag: i64 = value.trim().parse().map_err(|_| FilterError::BooleanParse {
            field: field.to_string(),
            operator: operator.name.to_string(),
            expected: operator.expected_value_description(),
        })?;
        Operand::Scalar(flag.to_string())
    } else {
        Operand::Scalar(value.to_string())
    };

    Ok(ParsedExpression { operator, operand })
}

/// Parse an array operand such as `a,b`, `(1, 2, 3)` or `[x]`.
///
/// A single enclosing pair of parentheses or brackets is stripped, the rest is
/// split on commas and each element trimmed. A blank operand is an empty list.
pub fn parse_array(expr: &str) -> Vec<String> {
    let expr = expr.trim();
    let inner = expr
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .or_else(|| expr.strip_prefix('[').and_then(|s| s.strip_suffix(']')))
        .unwrap_or(expr);
    if inner.is_empty() {
        return Vec::new();
    }
    inner.split(',').map(|s| s.trim().to_string()).collect()
}

/// Split a free-text query into search terms.
///
/// Whitespace separates terms; a double-quoted run is one term with the quotes
/// removed, surrounding whitespace trimmed and inner whitespace runs collapsed
/// to one space.
pub fn normalize_query(query: &str) -> Vec<String> {
    SEARCH_TERMS
        .captures_iter(query)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| MULTI_SPACE.replace_all(m.as_str().trim(), " ").into_owned())
        .collect()
}

/// Split an ordering parameter into its comma-separated keys.
///
/// Keys are trimmed; empty segments are dropped.
pub fn split_ordering(param: &str) -> Vec<String> {
    param
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
