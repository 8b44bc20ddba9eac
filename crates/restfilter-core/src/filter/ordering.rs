//! Ordering resolution.
//!
//! The ordering parameter is a comma-separated list of sort keys, each
//! optionally prefixed by `-` for descending order. Keys are resolved against
//! the ordering catalog and expanded into store sort terms; the primary key is
//! always appended as a tiebreaker so that pagination sees a total order.

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::catalog::{CatalogCache, OrderingCatalog};
use crate::config::FilterConfig;
use crate::context::ServingContext;
use crate::error::{FilterError, Result};
use crate::filter::{FilterBackend, FilterDescription, OrderingDescription};
use crate::parser::split_ordering;
use crate::schema::{DtoSchema, TableSchema};
use crate::source::DataSource;

/// Alias accepted as the primary key in a default ordering.
const PK_ALIAS: &str = "pk";

/// A store sort term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderTerm {
    /// Accessor path or sort expression.
    pub source: String,
    /// Descending when set.
    pub descending: bool,
}

impl OrderTerm {
    /// An ascending term.
    pub fn asc(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            descending: false,
        }
    }

    /// A descending term.
    pub fn desc(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            descending: true,
        }
    }

    /// Parse `name` or `-name`.
    pub fn parse(term: &str) -> Self {
        match term.strip_prefix('-') {
            Some(source) => Self::desc(source),
            None => Self::asc(term),
        }
    }
}

impl fmt::Display for OrderTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.source)
        } else {
            f.write_str(&self.source)
        }
    }
}

impl Serialize for OrderTerm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A key that can be used in the ordering parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OrderingField {
    /// API-facing sort key.
    pub name: String,
    /// Store sort terms this key expands to, in order.
    pub source: Vec<String>,
}

impl OrderingField {
    /// A key sorting by the accessor of the same name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: vec![name.clone()],
            name,
        }
    }

    /// A key expanding to one or more sort terms (composite ordering).
    pub fn with_sources<I, S>(name: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            source: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// The sort terms for this key; descending negates every term.
    pub fn terms(&self, descending: bool) -> Vec<OrderTerm> {
        self.source
            .iter()
            .map(|s| OrderTerm {
                source: s.clone(),
                descending,
            })
            .collect()
    }

    /// One key per non-relation column.
    pub fn for_schema(table: &TableSchema) -> Vec<OrderingField> {
        table
            .columns
            .iter()
            .filter(|c| !c.kind.is_relation())
            .map(|c| Self::new(c.name.clone()))
            .collect()
    }

    /// Autodetect keys from a DTO's readable output fields.
    pub fn for_dto(dto: &DtoSchema) -> Vec<OrderingField> {
        dto.fields
            .iter()
            .filter(|f| f.is_detectable())
            .map(|f| Self::new(f.accessor()))
            .collect()
    }
}

/// Resolves the ordering parameter into store sort terms.
#[derive(Debug, Clone, Default)]
pub struct OrderingFilter {
    config: FilterConfig,
    ordering_fields: Option<Vec<String>>,
    cache: Option<CatalogCache>,
}

impl OrderingFilter {
    /// Create an ordering filter reading `config.ordering_param`.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            ordering_fields: None,
            cache: None,
        }
    }

    /// Restrict the catalog to these keys unless the context overrides it.
    pub fn with_ordering_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ordering_fields = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Memoize DTO-derived catalogs in `cache`.
    pub fn with_cache(mut self, cache: CatalogCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The resolved ordering catalog for `ctx`.
    pub fn catalog<C>(&self, ctx: &C) -> Result<std::sync::Arc<OrderingCatalog>>
    where
        C: ServingContext + ?Sized,
    {
        OrderingCatalog::resolve(ctx, self.ordering_fields.as_deref(), self.cache.as_ref())
    }

    /// The keys requested by the ordering parameter, if any.
    pub fn requested<C>(&self, ctx: &C) -> Vec<String>
    where
        C: ServingContext + ?Sized,
    {
        ctx.query_params()
            .get(&self.config.ordering_param)
            .map(split_ordering)
            .unwrap_or_default()
    }

    /// Resolve requested keys into sort terms, without the tiebreaker.
    ///
    /// Falls back to the context's default ordering when no key is requested.
    pub fn ordering<C>(&self, ctx: &C) -> Result<Vec<OrderTerm>>
    where
        C: ServingContext + ?Sized,
    {
        let requested = self.requested(ctx);
        if requested.is_empty() {
            let default = ctx
                .default_ordering()
                .map(|terms| terms.iter().map(|t| OrderTerm::parse(t)).collect())
                .unwrap_or_default();
            return Ok(default);
        }

        let catalog = self.catalog(ctx)?;
        let mut terms = Vec::new();
        for key in &requested {
            let (name, descending) = match key.strip_prefix('-') {
                Some(name) => (name, true),
                None => (key.as_str(), false),
            };
            let field = catalog.get(name).ok_or_else(|| {
                debug!(field = %name, "rejected unknown ordering key");
                FilterError::UnknownOrderingField {
                    field: name.to_string(),
                    choices: catalog.names(),
                }
            })?;
            terms.extend(field.terms(descending));
        }
        Ok(terms)
    }

    /// The effective ordering: the resolved terms plus the primary key, unless
    /// the primary key is already present in either direction.
    pub fn effective_ordering<C>(&self, ctx: &C, primary_key: &str) -> Result<Vec<OrderTerm>>
    where
        C: ServingContext + ?Sized,
    {
        let mut terms = self.ordering(ctx)?;
        let has_pk = terms
            .iter()
            .any(|t| t.source == primary_key || t.source == PK_ALIAS);
        if !has_pk {
            terms.push(OrderTerm::asc(primary_key));
        }
        Ok(terms)
    }
}

impl FilterBackend for OrderingFilter {
    fn filter_source<D, C>(&self, source: D, ctx: &C) -> Result<D>
    where
        D: DataSource,
        C: ServingContext + ?Sized,
    {
        let pk = source.primary_key().to_string();
        let terms: Vec<OrderTerm> = self
            .effective_ordering(ctx, &pk)?
            .into_iter()
            .map(|t| {
                if t.source == PK_ALIAS {
                    OrderTerm {
                        source: pk.clone(),
                        descending: t.descending,
                    }
                } else {
                    t
                }
            })
            .collect();
        let rendered: Vec<String> = terms.iter().map(ToString::to_string).collect();
        debug!(ordering = %rendered.join(","), "applying ordering");
        Ok(source.order_by(&terms)?)
    }

    fn describe<C>(&self, ctx: &C) -> Result<Option<FilterDescription>>
    where
        C: ServingContext + ?Sized,
    {
        let catalog = self.catalog(ctx)?;
        if catalog.is_empty() {
            return Ok(None);
        }
        let requested = self.requested(ctx);
        Ok(Some(FilterDescription::Ordering(OrderingDescription {
            ordering_param: self.config.ordering_param.clone(),
            default_ordering: ctx.default_ordering().map(<[String]>::to_vec),
            fields: catalog.iter().cloned().collect(),
            ordering: (!requested.is_empty()).then_some(requested),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ListRequest;
    use crate::params::QueryParams;
    use crate::schema::{DtoField, DtoFieldKind};

    fn dto() -> DtoSchema {
        DtoSchema::new("people")
            .with_field(DtoField::new("id", DtoFieldKind::Integer))
            .with_field(DtoField::new("name", DtoFieldKind::String))
            .with_field(DtoField::new("age", DtoFieldKind::Integer))
    }

    fn request(query: &str) -> ListRequest {
        ListRequest::new(QueryParams::parse(query), dto())
    }

    fn render(terms: &[OrderTerm]) -> Vec<String> {
        terms.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_tiebreaker_appended() {
        let filter = OrderingFilter::default();
        let terms = filter.effective_ordering(&request("ordering=name"), "id").unwrap();
        assert_eq!(render(&terms), vec!["name", "id"]);
    }

    #[test]
    fn test_tiebreaker_not_duplicated() {
        let filter = OrderingFilter::default();
        let terms = filter.effective_ordering(&request("ordering=-id"), "id").unwrap();
        assert_eq!(render(&terms), vec!["-id"]);
    }

    #[test]
    fn test_no_ordering_yields_pk() {
        let filter = OrderingFilter::default();
        let terms = filter.effective_ordering(&request(""), "id").unwrap();
        assert_eq!(render(&terms), vec!["id"]);
    }

    #[test]
    fn test_unknown_key_is_error() {
        let filter = OrderingFilter::default();
        let err = filter
            .effective_ordering(&request("ordering=name,-colour"), "id")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown ordering field: 'colour' (choices are id, name, age)"
        );
    }

    #[test]
    fn test_composite_key_expands() {
        let dto = dto().with_ordering_fields(vec![
            OrderingField::with_sources("fullname", ["last_name", "first_name"]),
            OrderingField::new("id"),
        ]);
        let ctx = ListRequest::new(QueryParams::parse("ordering=-fullname"), dto);
        let terms = OrderingFilter::default().effective_ordering(&ctx, "id").unwrap();
        assert_eq!(render(&terms), vec!["-last_name", "-first_name", "id"]);
    }

    #[test]
    fn test_default_ordering_used_when_absent() {
        let ctx = request("ordering=").with_default_ordering(["-age"]);
        let terms = OrderingFilter::default().effective_ordering(&ctx, "id").unwrap();
        assert_eq!(render(&terms), vec!["-age", "id"]);

        let ctx = request("").with_default_ordering(["-pk"]);
        let terms = OrderingFilter::default().effective_ordering(&ctx, "id").unwrap();
        assert_eq!(render(&terms), vec!["-pk"]);
    }

    #[test]
    fn test_configured_names_restrict_catalog() {
        let filter = OrderingFilter::default().with_ordering_fields(["age"]);
        assert!(filter.effective_ordering(&request("ordering=age"), "id").is_ok());
        let err = filter
            .effective_ordering(&request("ordering=name"), "id")
            .unwrap_err();
        assert!(matches!(err, FilterError::UnknownOrderingField { .. }));

        // The context override wins over the filter's own list.
        let ctx = request("ordering=name").with_ordering_fields(["name"]);
        assert!(filter.effective_ordering(&ctx, "id").is_ok());
    }

    #[test]
    fn test_custom_ordering_param() {
        let filter = OrderingFilter::new(FilterConfig::with_params("sort", "q", "fields"));
        let terms = filter.effective_ordering(&request("sort=age"), "id").unwrap();
        assert_eq!(render(&terms), vec!["age", "id"]);
        let terms = filter.effective_ordering(&request("ordering=age"), "id").unwrap();
        assert_eq!(render(&terms), vec!["id"]);
    }

    #[test]
    fn test_order_term_parse() {
        assert_eq!(OrderTerm::parse("-age"), OrderTerm::desc("age"));
        assert_eq!(OrderTerm::parse("age"), OrderTerm::asc("age"));
        assert_eq!(OrderTerm::desc("age").to_string(), "-age");
    }

    #[test]
    fn test_describe() {
        let ctx = request("ordering=-age").with_default_ordering(["name"]);
        let description = OrderingFilter::default().describe(&ctx).unwrap().unwrap();
        let json = serde_json::to_value(&description).unwrap();
        assert_eq!(json["kind"], "ordering");
        assert_eq!(json["ordering_param"], "ordering");
        assert_eq!(json["ordering"], serde_json::json!(["-age"]));
        assert_eq!(json["default_ordering"], serde_json::json!(["name"]));
        assert_eq!(json["fields"][1]["name"], "name");
    }
}
