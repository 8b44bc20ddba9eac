//! Error types for filter compilation and application.

use thiserror::Error;

/// Errors raised while compiling or applying query-string filters.
///
/// Every variant except [`FilterError::Store`] is a client-facing validation
/// failure: the whole filter/ordering pass for the request is rejected and
/// nothing is partially applied.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A query parameter names no field of the resolved catalog.
    #[error("Unknown filter field: '{field}' (choices are {})", .choices.join(", "))]
    UnknownField {
        /// The offending parameter name.
        field: String,
        /// Every name in the catalog, in catalog order.
        choices: Vec<String>,
    },

    /// The `op:` prefix of an expression is not a known operator.
    #[error("{field}: unknown operator \"{operator}\"")]
    UnknownOperator {
        /// Field the expression was given for.
        field: String,
        /// The unrecognized operator token.
        operator: String,
    },

    /// The operand count is outside the operator's arity bounds.
    #[error("{field}: \"{operator}\" operator expects {expected}")]
    ArityViolation {
        /// Field the expression was given for.
        field: String,
        /// Operator name.
        operator: String,
        /// Human-readable expectation, e.g. `a list of exactly 2 values`.
        expected: String,
        /// Number of values actually supplied.
        got: usize,
    },

    /// A boolean operator was given an operand that is not an integer.
    #[error("{field}: \"{operator}\" operator expects {expected}")]
    BooleanParse {
        /// Field the expression was given for.
        field: String,
        /// Operator name.
        operator: String,
        /// Human-readable expectation.
        expected: String,
    },

    /// The store could not coerce an operand to the field's type.
    #[error("{field}: the given operator or value are inappropriate for this field")]
    TypeMismatch {
        /// API-facing field name.
        field: String,
    },

    /// A requested sort key is not in the ordering catalog.
    #[error("Unknown ordering field: '{field}' (choices are {})", .choices.join(", "))]
    UnknownOrderingField {
        /// The requested key, without its `-` prefix.
        field: String,
        /// Every name in the ordering catalog.
        choices: Vec<String>,
    },

    /// Two catalog entries share a name.
    #[error("duplicate field name in catalog: '{0}'")]
    DuplicateField(String),

    /// A store failure that is not attributable to client input.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl FilterError {
    /// Whether this error was caused by the request's query string.
    pub fn is_validation(&self) -> bool {
        !matches!(self, FilterError::Store(_) | FilterError::DuplicateField(_))
    }

    /// Name of the field the error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            FilterError::UnknownField { field, .. }
            | FilterError::UnknownOperator { field, .. }
            | FilterError::ArityViolation { field, .. }
            | FilterError::BooleanParse { field, .. }
            | FilterError::TypeMismatch { field }
            | FilterError::UnknownOrderingField { field, .. } => Some(field),
            FilterError::DuplicateField(name) => Some(name),
            FilterError::Store(_) => None,
        }
    }
}

/// Errors reported by a [`DataSource`](crate::DataSource) implementation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// An operand could not be coerced to the column's type.
    #[error("value '{value}' is not a valid {expected} for '{path}'")]
    TypeMismatch {
        /// Accessor path of the column.
        path: String,
        /// The raw operand.
        value: String,
        /// Name of the expected type.
        expected: String,
    },

    /// An accessor path or sort term names no column.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// The operand shape does not fit the lookup (e.g. a scalar for `range`).
    #[error("invalid operand for '{path}': {reason}")]
    InvalidOperand {
        /// Accessor path of the column.
        path: String,
        /// What was wrong with the operand.
        reason: String,
    },
}

/// Result alias for filter operations.
pub type Result<T> = std::result::Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_field_lists_choices() {
        let err = FilterError::UnknownField {
            field: "colour".into(),
            choices: vec!["id".into(), "name".into(), "age".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown filter field: 'colour' (choices are id, name, age)"
        );
        assert!(err.is_validation());
        assert_eq!(err.field(), Some("colour"));
    }

    #[test]
    fn test_arity_message() {
        let err = FilterError::ArityViolation {
            field: "age".into(),
            operator: "between".into(),
            expected: "a list of exactly 2 values".into(),
            got: 3,
        };
        assert_eq!(
            err.to_string(),
            "age: \"between\" operator expects a list of exactly 2 values"
        );
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = FilterError::TypeMismatch { field: "age".into() };
        assert_eq!(
            err.to_string(),
            "age: the given operator or value are inappropriate for this field"
        );
    }

    #[test]
    fn test_store_error_is_not_validation() {
        let err: FilterError = StoreError::UnknownColumn("owner.name".into()).into();
        assert!(!err.is_validation());
        assert_eq!(err.field(), None);
        assert_eq!(err.to_string(), "store error: unknown column 'owner.name'");
    }
}
