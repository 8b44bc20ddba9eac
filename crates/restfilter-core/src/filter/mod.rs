//! Filter backends.
//!
//! Each backend reads its own query parameters from a [`ServingContext`] and
//! narrows or orders a [`DataSource`]:
//!
//! - [`ExpressionFilter`]: one `field=op:value` expression per parameter
//! - [`SimpleFilter`]: free-text search across fields
//! - [`OrderingFilter`]: sort keys with a primary-key tiebreaker
//!
//! [`FilterPipeline`] chains the three in that order.

pub mod expression;
pub mod ordering;
pub mod search;

pub use expression::{Clause, CompiledFilter, ExpressionFilter};
pub use ordering::{OrderTerm, OrderingField, OrderingFilter};
pub use search::{SearchOutcome, SimpleFilter};

use serde::Serialize;
use tracing::debug;

use crate::catalog::CatalogCache;
use crate::config::FilterConfig;
use crate::context::ServingContext;
use crate::error::Result;
use crate::field::Datatype;
use crate::source::DataSource;

/// A request-scoped transformation of a data source.
pub trait FilterBackend {
    /// Narrow or order `source` according to the request in `ctx`.
    ///
    /// On error the caller's source is left untouched and nothing is applied.
    fn filter_source<D, C>(&self, source: D, ctx: &C) -> Result<D>
    where
        D: DataSource,
        C: ServingContext + ?Sized;

    /// Describe what this backend offers for `ctx`, or `None` when it has no
    /// fields to offer.
    fn describe<C>(&self, ctx: &C) -> Result<Option<FilterDescription>>
    where
        C: ServingContext + ?Sized;
}

/// A field as listed in a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescription {
    /// API-facing name.
    pub name: String,
    /// Declared datatype.
    pub datatype: Datatype,
    /// Excluded from free-text search.
    pub advanced: bool,
}

/// An operator as listed in a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorDescription {
    /// Query-string token.
    pub name: &'static str,
    /// Human-readable meaning.
    pub description: &'static str,
    /// Expected operand, e.g. `a list of exactly 2 values`.
    pub expects: String,
}

/// An expression present in the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveFilter {
    /// Field name.
    pub field: String,
    /// Raw expression as given.
    pub expression: String,
}

/// What the expression filter offers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionDescription {
    /// Filterable fields.
    pub fields: Vec<FieldDescription>,
    /// The operator catalog.
    pub operators: Vec<OperatorDescription>,
    /// Expressions in the current request.
    pub active_filters: Vec<ActiveFilter>,
}

/// What the free-text filter offers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDescription {
    /// Name of the search parameter.
    pub search_param: String,
    /// Fields searched.
    pub fields: Vec<FieldDescription>,
    /// The raw search string of the current request.
    pub terms: String,
}

/// What the ordering filter offers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderingDescription {
    /// Name of the ordering parameter.
    pub ordering_param: String,
    /// Ordering used when none is requested.
    pub default_ordering: Option<Vec<String>>,
    /// Orderable keys.
    pub fields: Vec<OrderingField>,
    /// Keys requested by the current request.
    pub ordering: Option<Vec<String>>,
}

/// Structured description of one backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterDescription {
    /// Expression filter.
    Expression(ExpressionDescription),
    /// Free-text filter.
    Search(SearchDescription),
    /// Ordering filter.
    Ordering(OrderingDescription),
}

/// Expression filter, then free-text search, then ordering.
#[derive(Debug, Clone, Default)]
pub struct FilterPipeline {
    expression: ExpressionFilter,
    search: SimpleFilter,
    ordering: OrderingFilter,
}

impl FilterPipeline {
    /// Build the three backends from one configuration.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            expression: ExpressionFilter::new(config.clone()),
            search: SimpleFilter::new(config.clone()),
            ordering: OrderingFilter::new(config),
        }
    }

    /// Share a catalog cache between the backends.
    pub fn with_cache(self, cache: CatalogCache) -> Self {
        Self {
            expression: self.expression.with_cache(cache.clone()),
            search: self.search.with_cache(cache.clone()),
            ordering: self.ordering.with_cache(cache),
        }
    }

    /// Replace the ordering backend.
    pub fn with_ordering(mut self, ordering: OrderingFilter) -> Self {
        self.ordering = ordering;
        self
    }

    /// The expression backend.
    pub fn expression(&self) -> &ExpressionFilter {
        &self.expression
    }

    /// The free-text backend.
    pub fn search(&self) -> &SimpleFilter {
        &self.search
    }

    /// The ordering backend.
    pub fn ordering(&self) -> &OrderingFilter {
        &self.ordering
    }

    /// Apply the expression filter, the free-text filter and the ordering.
    ///
    /// The first failing backend rejects the whole request.
    pub fn filter_source<D, C>(&self, source: D, ctx: &C) -> Result<D>
    where
        D: DataSource,
        C: ServingContext + ?Sized,
    {
        let source = self.expression.filter_source(source, ctx)?;
        let source = self.search.filter_source(source, ctx)?;
        let source = self.ordering.filter_source(source, ctx)?;
        debug!(dto = %ctx.dto().name, "filter pipeline applied");
        Ok(source)
    }

    /// Descriptions of every backend that has fields to offer.
    pub fn describe<C>(&self, ctx: &C) -> Result<Vec<FilterDescription>>
    where
        C: ServingContext + ?Sized,
    {
        let descriptions = [
            self.expression.describe(ctx)?,
            self.search.describe(ctx)?,
            self.ordering.describe(ctx)?,
        ];
        Ok(descriptions.into_iter().flatten().collect())
    }
}
