//! Predicate evaluation against table rows.
//!
//! A [`Predicate`] is compiled once against a [`TableSchema`]: accessor paths
//! are resolved to column positions and operands are coerced to the column
//! type. Compilation is where type mismatches surface; evaluation itself
//! cannot fail.

use restfilter_core::{Lookup, Predicate, StoreError, TableSchema, TargetOp};

use crate::coerce::{coerce, coerce_flag};
use crate::value::Value;

/// A comparison against one column, with typed operands.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnTest {
    /// Equal to the value.
    Exact(Value),
    /// Less than.
    Lt(Value),
    /// Less than or equal.
    Lte(Value),
    /// Greater than.
    Gt(Value),
    /// Greater than or equal.
    Gte(Value),
    /// Rendered value contains the lowercased needle, case-insensitively.
    IContains(String),
    /// Equal to one of the values.
    In(Vec<Value>),
    /// Between both bounds, inclusive.
    Range(Value, Value),
    /// NULL when set, not NULL otherwise.
    IsNull(bool),
}

/// A predicate ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledPredicate {
    /// Test one column.
    Column {
        /// Column position in the row.
        index: usize,
        /// The comparison.
        test: ColumnTest,
    },
    /// All children match; true when empty.
    And(Vec<CompiledPredicate>),
    /// Some child matches; false when empty.
    Or(Vec<CompiledPredicate>),
    /// The child does not match.
    Not(Box<CompiledPredicate>),
}

/// Compiles and evaluates predicates.
pub struct PredicateEvaluator;

impl PredicateEvaluator {
    /// Resolve paths and coerce operands of `predicate` against `schema`.
    pub fn compile(
        predicate: &Predicate,
        schema: &TableSchema,
    ) -> Result<CompiledPredicate, StoreError> {
        match predicate {
            Predicate::Lookup(lookup) => Self::compile_lookup(lookup, schema),
            Predicate::And(children) => Ok(CompiledPredicate::And(
                children
                    .iter()
                    .map(|c| Self::compile(c, schema))
                    .collect::<Result<_, _>>()?,
            )),
            Predicate::Or(children) => Ok(CompiledPredicate::Or(
                children
                    .iter()
                    .map(|c| Self::compile(c, schema))
                    .collect::<Result<_, _>>()?,
            )),
            Predicate::Not(inner) => Ok(CompiledPredicate::Not(Box::new(Self::compile(
                inner, schema,
            )?))),
        }
    }

    fn compile_lookup(lookup: &Lookup, schema: &TableSchema) -> Result<CompiledPredicate, StoreError> {
        let path = lookup.path.as_str();
        let index = schema
            .column_index(path)
            .ok_or_else(|| StoreError::UnknownColumn(path.to_string()))?;
        let kind = schema.columns[index].kind;

        let scalar = || {
            lookup.operand.as_scalar().ok_or_else(|| StoreError::InvalidOperand {
                path: path.to_string(),
                reason: format!("'{}' expects a single value", lookup.op),
            })
        };
        let list = || {
            lookup.operand.as_list().ok_or_else(|| StoreError::InvalidOperand {
                path: path.to_string(),
                reason: format!("'{}' expects a list of values", lookup.op),
            })
        };
        let typed = |raw: &str| coerce(kind, raw, path);

        let test = match lookup.op {
            TargetOp::Exact => ColumnTest::Exact(typed(scalar()?)?),
            TargetOp::Lt => ColumnTest::Lt(typed(scalar()?)?),
            TargetOp::Lte => ColumnTest::Lte(typed(scalar()?)?),
            TargetOp::Gt => ColumnTest::Gt(typed(scalar()?)?),
            TargetOp::Gte => ColumnTest::Gte(typed(scalar()?)?),
            TargetOp::IContains => ColumnTest::IContains(scalar()?.to_lowercase()),
            TargetOp::In => ColumnTest::In(
                list()?
                    .iter()
                    .map(|v| typed(v.as_str()))
                    .collect::<Result<_, _>>()?,
            ),
            TargetOp::Range => match list()? {
                [lo, hi] => ColumnTest::Range(typed(lo.as_str())?, typed(hi.as_str())?),
                other => {
                    return Err(StoreError::InvalidOperand {
                        path: path.to_string(),
                        reason: format!("'range' expects 2 values, got {}", other.len()),
                    })
                }
            },
            TargetOp::IsNull => ColumnTest::IsNull(coerce_flag(scalar()?, path)?),
        };
        Ok(CompiledPredicate::Column { index, test })
    }

    /// Whether `row` satisfies `predicate`.
    ///
    /// Comparisons against NULL are false, so a negated comparison matches
    /// NULL rows.
    pub fn evaluate(predicate: &CompiledPredicate, row: &[Value]) -> bool {
        match predicate {
            CompiledPredicate::Column { index, test } => {
                row.get(*index).is_some_and(|value| Self::test(test, value))
            }
            CompiledPredicate::And(children) => children.iter().all(|c| Self::evaluate(c, row)),
            CompiledPredicate::Or(children) => children.iter().any(|c| Self::evaluate(c, row)),
            CompiledPredicate::Not(inner) => !Self::evaluate(inner, row),
        }
    }

    fn test(test: &ColumnTest, value: &Value) -> bool {
        if let ColumnTest::IsNull(expected) = test {
            return value.is_null() == *expected;
        }
        if value.is_null() {
            return false;
        }
        let cmp = |operand: &Value| Value::compare_values(value, operand);
        match test {
            ColumnTest::Exact(operand) => Value::values_equal(value, operand),
            ColumnTest::Lt(operand) => cmp(operand).is_some_and(|o| o.is_lt()),
            ColumnTest::Lte(operand) => cmp(operand).is_some_and(|o| o.is_le()),
            ColumnTest::Gt(operand) => cmp(operand).is_some_and(|o| o.is_gt()),
            ColumnTest::Gte(operand) => cmp(operand).is_some_and(|o| o.is_ge()),
            ColumnTest::IContains(needle) => {
                value.to_string().to_lowercase().contains(needle.as_str())
            }
            ColumnTest::In(operands) => operands.iter().any(|o| Value::values_equal(value, o)),
            ColumnTest::Range(lo, hi) => {
                cmp(lo).is_some_and(|o| o.is_ge()) && cmp(hi).is_some_and(|o| o.is_le())
            }
            ColumnTest::IsNull(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restfilter_core::{ColumnKind, Operand};

    fn schema() -> TableSchema {
        TableSchema::new("people", "id")
            .with_column("id", ColumnKind::AutoId)
            .with_column("name", ColumnKind::Text)
            .with_column("age", ColumnKind::Integer)
    }

    fn row(id: i64, name: &str, age: Option<i64>) -> Vec<Value> {
        vec![
            Value::Int(id),
            Value::String(name.into()),
            age.map(Value::Int).unwrap_or(Value::Null),
        ]
    }

    fn matches(predicate: Predicate, row: &[Value]) -> bool {
        let compiled = PredicateEvaluator::compile(&predicate, &schema()).unwrap();
        PredicateEvaluator::evaluate(&compiled, row)
    }

    #[test]
    fn test_range_is_inclusive() {
        let p = Predicate::lookup("age", TargetOp::Range, Operand::list(["18", "65"]));
        assert!(matches(p.clone(), &row(1, "a", Some(18))));
        assert!(matches(p.clone(), &row(1, "a", Some(65))));
        assert!(!matches(p.clone(), &row(1, "a", Some(66))));
        assert!(!matches(p, &row(1, "a", None)));
    }

    #[test]
    fn test_icontains_is_case_insensitive() {
        let p = Predicate::lookup("name", TargetOp::IContains, Operand::scalar("SMI"));
        assert!(matches(p.clone(), &row(1, "John Smith", None)));
        assert!(!matches(p, &row(1, "Jones", None)));

        let p = Predicate::lookup("age", TargetOp::IContains, Operand::scalar("4"));
        assert!(matches(p, &row(1, "x", Some(42))));
    }

    #[test]
    fn test_null_comparisons_are_false() {
        let p = Predicate::lookup("age", TargetOp::Exact, Operand::scalar("3"));
        assert!(!matches(p.clone(), &row(1, "a", None)));
        assert!(matches(!p, &row(1, "a", None)));
    }

    #[test]
    fn test_isnull_flag() {
        let is_null = Predicate::lookup("age", TargetOp::IsNull, Operand::scalar("1"));
        let not_null = Predicate::lookup("age", TargetOp::IsNull, Operand::scalar("0"));
        assert!(matches(is_null.clone(), &row(1, "a", None)));
        assert!(!matches(is_null, &row(1, "a", Some(1))));
        assert!(matches(not_null, &row(1, "a", Some(1))));
    }

    #[test]
    fn test_empty_groups() {
        assert!(matches(Predicate::all([]), &row(1, "a", None)));
        assert!(!matches(Predicate::any([]), &row(1, "a", None)));
    }

    #[test]
    fn test_compile_errors() {
        let bad_value = Predicate::lookup("age", TargetOp::Gt, Operand::scalar("old"));
        assert!(matches!(
            PredicateEvaluator::compile(&bad_value, &schema()),
            Err(StoreError::TypeMismatch { .. })
        ));

        let bad_path = Predicate::lookup("team.name", TargetOp::Exact, Operand::scalar("x"));
        assert_eq!(
            PredicateEvaluator::compile(&bad_path, &schema()),
            Err(StoreError::UnknownColumn("team.name".into()))
        );

        let bad_shape = Predicate::lookup("age", TargetOp::In, Operand::scalar("1"));
        assert!(matches!(
            PredicateEvaluator::compile(&bad_shape, &schema()),
            Err(StoreError::InvalidOperand { .. })
        ));
    }
}
