//! The in-memory table.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use restfilter_core::{DataSource, OrderTerm, Predicate, StoreError, TableSchema};
use serde_json::{Map, Value as Json};
use tracing::trace;

use crate::evaluator::{CompiledPredicate, PredicateEvaluator};
use crate::value::Value;

/// One row; cells are in schema column order.
pub type Row = Vec<Value>;

/// Alias accepted for the primary key in sort terms.
const PK_ALIAS: &str = "pk";

#[derive(Debug, Clone)]
struct SortKey {
    index: usize,
    descending: bool,
}

#[derive(Debug, Clone)]
enum Step {
    Keep(CompiledPredicate),
    Drop(CompiledPredicate),
}

/// A lazily filtered view over shared, immutable rows.
///
/// Every [`DataSource`] method returns a new view; rows are only scanned by
/// [`rows`](Self::rows), [`count`](Self::count) and
/// [`to_json`](Self::to_json).
#[derive(Debug, Clone)]
pub struct MemoryTable {
    schema: Arc<TableSchema>,
    rows: Arc<Vec<Row>>,
    steps: Vec<Step>,
    distinct: bool,
    empty: bool,
    ordering: Vec<SortKey>,
}

impl MemoryTable {
    /// Create a table over rows already typed against `schema`.
    ///
    /// Rows must have one cell per column.
    pub fn new(schema: TableSchema, rows: Vec<Row>) -> Result<Self, StoreError> {
        if schema.column_index(&schema.primary_key).is_none() {
            return Err(StoreError::UnknownColumn(schema.primary_key.clone()));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != schema.columns.len()) {
            return Err(StoreError::InvalidOperand {
                path: schema.name.clone(),
                reason: format!(
                    "row has {} cells, table has {} columns",
                    bad.len(),
                    schema.columns.len()
                ),
            });
        }
        Ok(Self {
            schema: Arc::new(schema),
            rows: Arc::new(rows),
            steps: Vec::new(),
            distinct: false,
            empty: false,
            ordering: Vec::new(),
        })
    }

    /// Total number of stored rows, ignoring every filter.
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    /// Materialize the view.
    pub fn rows(&self) -> Vec<Row> {
        if self.empty {
            return Vec::new();
        }

        let pk = self.pk_index();
        let mut seen = HashSet::new();
        let mut out: Vec<Row> = Vec::new();
        for row in self.rows.iter() {
            let keep = self.steps.iter().all(|step| match step {
                Step::Keep(p) => PredicateEvaluator::evaluate(p, row),
                Step::Drop(p) => !PredicateEvaluator::evaluate(p, row),
            });
            if !keep {
                continue;
            }
            if self.distinct && !seen.insert(row[pk].to_string()) {
                continue;
            }
            out.push(row.clone());
        }

        if !self.ordering.is_empty() {
            out.sort_by(|a, b| self.compare_rows(a, b));
        }
        trace!(table = %self.schema.name, matched = out.len(), "materialized view");
        out
    }

    /// Number of rows in the view.
    pub fn count(&self) -> usize {
        self.rows().len()
    }

    /// Materialize the view as JSON objects keyed by column name.
    pub fn to_json(&self) -> Vec<Json> {
        self.rows()
            .into_iter()
            .map(|row| {
                let object: Map<String, Json> = self
                    .schema
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, value)| (col.name.clone(), value.to_json()))
                    .collect();
                Json::Object(object)
            })
            .collect()
    }

    fn pk_index(&self) -> usize {
        // Checked in `new`.
        self.schema.column_index(&self.schema.primary_key).unwrap_or(0)
    }

    fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        for key in &self.ordering {
            let cmp = Value::sort_cmp(&a[key.index], &b[key.index]);
            let cmp = if key.descending { cmp.reverse() } else { cmp };
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    }

    fn with_step(&self, step: Step) -> Self {
        let mut next = self.clone();
        next.steps.push(step);
        next
    }
}

impl DataSource for MemoryTable {
    fn filter(&self, predicate: Predicate) -> Result<Self, StoreError> {
        let compiled = PredicateEvaluator::compile(&predicate, &self.schema)?;
        Ok(self.with_step(Step::Keep(compiled)))
    }

    fn exclude(&self, predicate: Predicate) -> Result<Self, StoreError> {
        let compiled = PredicateEvaluator::compile(&predicate, &self.schema)?;
        Ok(self.with_step(Step::Drop(compiled)))
    }

    fn distinct(&self) -> Self {
        let mut next = self.clone();
        next.distinct = true;
        next
    }

    fn none(&self) -> Self {
        let mut next = self.clone();
        next.empty = true;
        next
    }

    fn order_by(&self, terms: &[OrderTerm]) -> Result<Self, StoreError> {
        let ordering = terms
            .iter()
            .map(|term| {
                let column = if term.source == PK_ALIAS {
                    self.schema.primary_key.as_str()
                } else {
                    term.source.as_str()
                };
                self.schema
                    .column_index(column)
                    .map(|index| SortKey {
                        index,
                        descending: term.descending,
                    })
                    .ok_or_else(|| StoreError::UnknownColumn(term.source.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut next = self.clone();
        next.ordering = ordering;
        Ok(next)
    }

    fn primary_key(&self) -> &str {
        &self.schema.primary_key
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restfilter_core::{ColumnKind, Operand, TargetOp};

    fn table() -> MemoryTable {
        let schema = TableSchema::new("people", "id")
            .with_column("id", ColumnKind::AutoId)
            .with_column("name", ColumnKind::Text)
            .with_column("age", ColumnKind::Integer);
        let rows = vec![
            vec![Value::Int(1), Value::String("ann".into()), Value::Int(30)],
            vec![Value::Int(2), Value::String("bob".into()), Value::Null],
            vec![Value::Int(3), Value::String("cy".into()), Value::Int(20)],
        ];
        MemoryTable::new(schema, rows).unwrap()
    }

    fn ids(table: &MemoryTable) -> Vec<i64> {
        table
            .rows()
            .iter()
            .map(|r| match r[0] {
                Value::Int(id) => id,
                _ => panic!("non-integer id"),
            })
            .collect()
    }

    #[test]
    fn test_filter_is_lazy_and_non_mutating() {
        let base = table();
        let p = Predicate::lookup("age", TargetOp::Gt, Operand::scalar("25"));
        let filtered = base.filter(p).unwrap();
        assert_eq!(ids(&filtered), vec![1]);
        assert_eq!(base.count(), 3);
    }

    #[test]
    fn test_exclude_keeps_nulls() {
        let p = Predicate::lookup("age", TargetOp::Exact, Operand::scalar("30"));
        assert_eq!(ids(&table().exclude(p).unwrap()), vec![2, 3]);
    }

    #[test]
    fn test_order_by_nulls_first_and_replaces() {
        let ordered = table().order_by(&[OrderTerm::asc("age")]).unwrap();
        assert_eq!(ids(&ordered), vec![2, 3, 1]);
        let ordered = ordered.order_by(&[OrderTerm::desc("pk")]).unwrap();
        assert_eq!(ids(&ordered), vec![3, 2, 1]);
    }

    #[test]
    fn test_order_by_unknown_column() {
        let err = table().order_by(&[OrderTerm::asc("height")]).unwrap_err();
        assert_eq!(err, StoreError::UnknownColumn("height".into()));
    }

    #[test]
    fn test_none_and_distinct() {
        assert_eq!(table().none().count(), 0);
        assert_eq!(table().distinct().count(), 3);
        assert_eq!(table().none().total(), 3);
    }

    #[test]
    fn test_filter_type_mismatch_leaves_source_usable() {
        let base = table();
        let p = Predicate::lookup("age", TargetOp::Gt, Operand::scalar("old"));
        assert!(matches!(base.filter(p), Err(StoreError::TypeMismatch { .. })));
        assert_eq!(base.count(), 3);
    }

    #[test]
    fn test_to_json() {
        let json = table()
            .filter(Predicate::lookup("id", TargetOp::Exact, Operand::scalar("2")))
            .unwrap()
            .to_json();
        assert_eq!(json, vec![serde_json::json!({"id": 2, "name": "bob", "age": null})]);
    }

    #[test]
    fn test_new_validates_rows() {
        let schema = TableSchema::new("t", "id").with_column("id", ColumnKind::AutoId);
        assert!(MemoryTable::new(schema.clone(), vec![vec![]]).is_err());
        let schema = TableSchema::new("t", "uid").with_column("id", ColumnKind::AutoId);
        assert_eq!(
            MemoryTable::new(schema, vec![]).unwrap_err(),
            StoreError::UnknownColumn("uid".into())
        );
    }
}
