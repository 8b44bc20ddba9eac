//! The data-source contract consumed by the filters.

use crate::error::StoreError;
use crate::filter::ordering::OrderTerm;
use crate::predicate::Predicate;
use crate::schema::TableSchema;

/// A lazily filtered, queryset-like view over a table.
///
/// Every method returns a new view and leaves the receiver untouched; rows are
/// only fetched when the implementation's own terminal call is made, which is
/// outside this crate. Implementations should validate operands (type
/// coercion, column existence) when a predicate is applied, so that errors are
/// reported while the request is still being compiled.
pub trait DataSource: Clone {
    /// Keep only rows matching `predicate`.
    fn filter(&self, predicate: Predicate) -> Result<Self, StoreError>;

    /// Drop rows matching `predicate`.
    fn exclude(&self, predicate: Predicate) -> Result<Self, StoreError>;

    /// Eliminate duplicate rows.
    fn distinct(&self) -> Self;

    /// A view with no rows.
    fn none(&self) -> Self;

    /// Order by the given terms, replacing any previous ordering.
    fn order_by(&self, terms: &[OrderTerm]) -> Result<Self, StoreError>;

    /// Name of the unique identity column.
    fn primary_key(&self) -> &str;

    /// Column introspection.
    fn schema(&self) -> &TableSchema;
}
