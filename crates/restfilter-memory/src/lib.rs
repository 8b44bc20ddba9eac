//! restfilter memory - an in-memory, schema-typed data source.
//!
//! [`MemoryTable`] implements [`restfilter_core::DataSource`] over rows held
//! in memory. Operand strings are coerced to column types when a predicate is
//! applied, so malformed operands fail at `filter`/`exclude` time with
//! [`StoreError::TypeMismatch`](restfilter_core::StoreError::TypeMismatch),
//! before any row is read.
//!
//! NULL semantics follow SQL: every comparison with NULL is false, so
//! `exclude` keeps NULL rows.

pub mod coerce;
pub mod dataset;
pub mod evaluator;
pub mod table;
pub mod value;

pub use coerce::coerce;
pub use dataset::{Dataset, DatasetError};
pub use evaluator::{ColumnTest, CompiledPredicate, PredicateEvaluator};
pub use table::{MemoryTable, Row};
pub use value::Value;
