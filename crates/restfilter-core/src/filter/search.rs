//! Free-text search over the non-advanced fields of the catalog.
//!
//! The search parameter is split into terms (see
//! [`normalize_query`](crate::parser::normalize_query)). A row matches when
//! every term matches at least one field: string fields by case-insensitive
//! substring, integer fields by equality when the term is all digits.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::catalog::{CatalogCache, FilterCatalog};
use crate::config::FilterConfig;
use crate::context::ServingContext;
use crate::error::{FilterError, Result, StoreError};
use crate::field::{Datatype, FilterableField};
use crate::filter::{FieldDescription, FilterBackend, FilterDescription, SearchDescription};
use crate::operator::TargetOp;
use crate::parser::normalize_query;
use crate::predicate::{Operand, Predicate};
use crate::source::DataSource;

/// Result of compiling a free-text query.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// No terms were given; the source is left as is.
    PassThrough,
    /// Some term can match no field; the result is empty.
    Nothing,
    /// Keep rows matching the predicate.
    Match(Predicate),
}

/// Free-text search backend.
#[derive(Debug, Clone, Default)]
pub struct SimpleFilter {
    config: FilterConfig,
    cache: Option<CatalogCache>,
}

impl SimpleFilter {
    /// Create a search filter reading `config.search_param`.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    /// Memoize DTO-derived catalogs in `cache`.
    pub fn with_cache(mut self, cache: CatalogCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn catalog<C>(&self, ctx: &C) -> Result<Arc<FilterCatalog>>
    where
        C: ServingContext + ?Sized,
    {
        FilterCatalog::resolve(ctx, self.cache.as_ref())
    }

    /// The raw search string of the request.
    pub fn raw_query<'a, C>(&self, ctx: &'a C) -> &'a str
    where
        C: ServingContext + ?Sized,
    {
        ctx.query_params()
            .get(&self.config.search_param)
            .unwrap_or_default()
    }

    /// The normalized search terms of the request.
    pub fn terms<C>(&self, ctx: &C) -> Vec<String>
    where
        C: ServingContext + ?Sized,
    {
        normalize_query(self.raw_query(ctx))
    }

    /// Compile the request's free-text query.
    pub fn compile<C>(&self, ctx: &C) -> Result<SearchOutcome>
    where
        C: ServingContext + ?Sized,
    {
        let terms = self.terms(ctx);
        if terms.is_empty() {
            return Ok(SearchOutcome::PassThrough);
        }

        let catalog = self.catalog(ctx)?;
        let mut groups = Vec::with_capacity(terms.len());
        for term in &terms {
            let group: Vec<Predicate> = catalog
                .iter()
                .filter(|f| !f.advanced)
                .filter_map(|f| term_predicate(f, term))
                .collect();
            if group.is_empty() {
                debug!(term = %term, "search term matches no field");
                return Ok(SearchOutcome::Nothing);
            }
            groups.push(Predicate::any(group));
        }
        let predicate = Predicate::all(groups);
        debug!(terms = terms.len(), predicate = %predicate, "compiled search");
        Ok(SearchOutcome::Match(predicate))
    }
}

/// The lookup for one term on one field, or `None` when the field's datatype
/// cannot match the term.
fn term_predicate(field: &FilterableField, term: &str) -> Option<Predicate> {
    let target = match field.datatype {
        Datatype::String => TargetOp::IContains,
        Datatype::Integer if is_integer_term(term) => TargetOp::Exact,
        _ => {
            trace!(field = %field.name, term = %term, "field skipped for search term");
            return None;
        }
    };
    match field.build_predicate(target, Operand::scalar(term)) {
        Ok(predicate) => Some(predicate),
        Err(e) => {
            trace!(field = %field.name, error = %e, "field rejected search term");
            None
        }
    }
}

/// All ASCII digits and small enough to be stored as an integer.
fn is_integer_term(term: &str) -> bool {
    !term.is_empty() && term.bytes().all(|b| b.is_ascii_digit()) && term.parse::<i64>().is_ok()
}

impl FilterBackend for SimpleFilter {
    fn filter_source<D, C>(&self, source: D, ctx: &C) -> Result<D>
    where
        D: DataSource,
        C: ServingContext + ?Sized,
    {
        match self.compile(ctx)? {
            SearchOutcome::PassThrough => Ok(source),
            SearchOutcome::Nothing => Ok(source.none()),
            SearchOutcome::Match(predicate) => source.filter(predicate).map_err(|e| match e {
                StoreError::TypeMismatch { .. } | StoreError::InvalidOperand { .. } => {
                    FilterError::TypeMismatch {
                        field: self.config.search_param.clone(),
                    }
                }
                other => FilterError::Store(other),
            }),
        }
    }

    fn describe<C>(&self, ctx: &C) -> Result<Option<FilterDescription>>
    where
        C: ServingContext + ?Sized,
    {
        let catalog = self.catalog(ctx)?;
        let fields: Vec<FieldDescription> = catalog
            .iter()
            .filter(|f| !f.advanced && matches!(f.datatype, Datatype::String | Datatype::Integer))
            .map(|f| FieldDescription {
                name: f.name.clone(),
                datatype: f.datatype,
                advanced: f.advanced,
            })
            .collect();
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(FilterDescription::Search(SearchDescription {
            search_param: self.config.search_param.clone(),
            fields,
            terms: self.raw_query(ctx).to_string(),
        })))
    }
}
