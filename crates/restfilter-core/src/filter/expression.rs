//! The expression filter: `field=op:value` query parameters.
//!
//! Every parameter that is not on the ignore-list must name a field of the
//! catalog. Each occurrence of a parameter is parsed and compiled into one
//! [`Clause`]; clauses are AND-combined across occurrences and parameters.
//! Negating operators (`ne`, `unlike`, `out`) compile the same lookup as their
//! positive twin and are applied through [`DataSource::exclude`].

use std::sync::Arc;

use tracing::{debug, trace};

use crate::catalog::{CatalogCache, FilterCatalog};
use crate::config::FilterConfig;
use crate::context::ServingContext;
use crate::error::{FilterError, Result, StoreError};
use crate::filter::{
    ActiveFilter, ExpressionDescription, FieldDescription, FilterBackend, FilterDescription,
    OperatorDescription,
};
use crate::operator::{operators, Operator};
use crate::parser::parse_expression;
use crate::predicate::Predicate;
use crate::source::DataSource;

/// One compiled `field=op:value` occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// API-facing field name.
    pub field: String,
    /// The operator used.
    pub operator: &'static Operator,
    /// The positive predicate; negation is applied by [`Clause::apply`].
    pub predicate: Predicate,
}

impl Clause {
    /// Whether matching rows are excluded.
    pub fn is_negated(&self) -> bool {
        self.operator.negate
    }

    /// The predicate with negation folded in.
    pub fn effective_predicate(&self) -> Predicate {
        if self.is_negated() {
            !self.predicate.clone()
        } else {
            self.predicate.clone()
        }
    }

    /// Keep or exclude matching rows.
    ///
    /// Operand errors from the store are reported against the field.
    pub fn apply<D: DataSource>(&self, source: &D) -> Result<D> {
        let applied = if self.is_negated() {
            source.exclude(self.predicate.clone())
        } else {
            source.filter(self.predicate.clone())
        };
        applied.map_err(|e| match e {
            StoreError::TypeMismatch { .. } | StoreError::InvalidOperand { .. } => {
                debug!(field = %self.field, error = %e, "operand rejected by store");
                FilterError::TypeMismatch {
                    field: self.field.clone(),
                }
            }
            other => FilterError::Store(other),
        })
    }
}

/// All clauses of one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    clauses: Vec<Clause>,
}

impl CompiledFilter {
    /// The compiled clauses, in request order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Whether the request had no filter expressions.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The AND of every clause, with negation folded in.
    pub fn predicate(&self) -> Predicate {
        Predicate::all(self.clauses.iter().map(Clause::effective_predicate))
    }

    /// Apply every clause to `source`, then eliminate duplicates.
    ///
    /// With no clauses the source is returned as is.
    pub fn apply<D: DataSource>(&self, source: &D) -> Result<D> {
        let mut current = source.clone();
        for clause in &self.clauses {
            current = clause.apply(&current)?;
        }
        if self.clauses.is_empty() {
            return Ok(current);
        }
        Ok(current.distinct())
    }
}

/// Compiles and applies `field=op:value` query parameters.
#[derive(Debug, Clone, Default)]
pub struct ExpressionFilter {
    config: FilterConfig,
    cache: Option<CatalogCache>,
}

impl ExpressionFilter {
    /// Create an expression filter with the given ignore-list.
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

    /// The resolved filter catalog for `ctx`.
    pub fn catalog<C>(&self, ctx: &C) -> Result<Arc<FilterCatalog>>
    where
        C: ServingContext + ?Sized,
    {
        FilterCatalog::resolve(ctx, self.cache.as_ref())
    }

    /// Whether the parameter `name` is never a filter field for `ctx`.
    pub fn is_ignored<C>(&self, ctx: &C, name: &str) -> bool
    where
        C: ServingContext + ?Sized,
    {
        match ctx.non_filtering_fields() {
            Some(names) => names.iter().any(|n| n == name),
            None => self.config.is_ignored(name),
        }
    }

    /// Parse and compile every filter expression of the request.
    ///
    /// Nothing is applied; the first invalid expression rejects the request.
    pub fn compile<C>(&self, ctx: &C) -> Result<CompiledFilter>
    where
        C: ServingContext + ?Sized,
    {
        let params = ctx.query_params();
        if params.names().all(|name| self.is_ignored(ctx, name)) {
            return Ok(CompiledFilter::default());
        }

        let catalog = self.catalog(ctx)?;
        let mut clauses = Vec::new();
        for (name, values) in params.iter() {
            if self.is_ignored(ctx, name) {
                trace!(param = %name, "skipping reserved parameter");
                continue;
            }
            let field = catalog.require(name).inspect_err(|_| {
                debug!(field = %name, "rejected unknown filter field");
            })?;
            for expr in values {
                let parsed = parse_expression(&field.name, expr).inspect_err(|e| {
                    debug!(field = %name, expression = %expr, error = %e, "rejected filter expression");
                })?;
                let predicate = field.build_predicate(parsed.operator.target, parsed.operand)?;
                debug!(
                    field = %field.name,
                    operator = parsed.operator.name,
                    predicate = %predicate,
                    "compiled filter clause"
                );
                clauses.push(Clause {
                    field: field.name.clone(),
                    operator: parsed.operator,
                    predicate,
                });
            }
        }
        Ok(CompiledFilter { clauses })
    }
}

impl FilterBackend for ExpressionFilter {
    fn filter_source<D, C>(&self, source: D, ctx: &C) -> Result<D>
    where
        D: DataSource,
        C: ServingContext + ?Sized,
    {
        self.compile(ctx)?.apply(&source)
    }

    fn describe<C>(&self, ctx: &C) -> Result<Option<FilterDescription>>
    where
        C: ServingContext + ?Sized,
    {
        let catalog = self.catalog(ctx)?;
        if catalog.is_empty() {
            return Ok(None);
        }
        let params = ctx.query_params();
        let fields = catalog
            .iter()
            .map(|f| FieldDescription {
                name: f.name.clone(),
                datatype: f.datatype,
                advanced: f.advanced,
            })
            .collect();
        let operators = operators()
            .iter()
            .map(|op| OperatorDescription {
                name: op.name,
                description: op.description,
                expects: op.expected_value_description(),
            })
            .collect();
        let active_filters = catalog
            .iter()
            .filter_map(|f| {
                params.get(&f.name).map(|expr| ActiveFilter {
                    field: f.name.clone(),
                    expression: expr.to_string(),
                })
            })
            .collect();
        Ok(Some(FilterDescription::Expression(ExpressionDescription {
            fields,
            operators,
            active_filters,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ListRequest;
    use crate::field::{Datatype, FilterableField};
    use crate::operator::TargetOp;
    use crate::params::QueryParams;
    use crate::predicate::Operand;
    use crate::schema::{DtoField, DtoFieldKind, DtoSchema};

    fn dto() -> DtoSchema {
        DtoSchema::new("people")
            .with_field(DtoField::new("id", DtoFieldKind::Integer))
            .with_field(DtoField::new("name", DtoFieldKind::String))
            .with_field(DtoField::new("age", DtoFieldKind::Integer))
    }

    fn compile(query: &str) -> Result<CompiledFilter> {
        let ctx = ListRequest::new(QueryParams::parse(query), dto());
        ExpressionFilter::default().compile(&ctx)
    }

    #[test]
    fn test_reserved_params_are_skipped() {
        let compiled = compile("page=2&page_size=10&ordering=-age&q=x&format=json&fields=id&stream=1")
            .unwrap();
        assert!(compiled.is_empty());
        assert!(compiled.predicate().is_always_true());
    }

    #[test]
    fn test_clause_per_occurrence() {
        let compiled = compile("age=ge:18&name=like:smith&age=lt:65").unwrap();
        let summary: Vec<(&str, &str)> = compiled
            .clauses()
            .iter()
            .map(|c| (c.field.as_str(), c.operator.name))
            .collect();
        assert_eq!(summary, vec![("age", "ge"), ("age", "lt"), ("name", "like")]);
        assert_eq!(
            compiled.predicate().to_string(),
            "age gte \"18\" AND age lt \"65\" AND name icontains \"smith\""
        );
    }

    #[test]
    fn test_negated_operator_keeps_positive_lookup() {
        let compiled = compile("name=unlike:bob").unwrap();
        let clause = &compiled.clauses()[0];
        assert!(clause.is_negated());
        assert_eq!(
            clause.predicate,
            Predicate::lookup("name", TargetOp::IContains, Operand::scalar("bob"))
        );
        assert_eq!(compiled.predicate().to_string(), "NOT (name icontains \"bob\")");
    }

    #[test]
    fn test_unknown_field() {
        let err = compile("colour=red").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown filter field: 'colour' (choices are id, name, age)"
        );
    }

    #[test]
    fn test_errors_name_the_field() {
        let err = compile("age=between:(1,2,3)").unwrap_err();
        assert_eq!(err.field(), Some("age"));
        assert!(err.to_string().contains("exactly 2 values"));

        let err = compile("name=startswith:x").unwrap_err();
        assert_eq!(err.to_string(), "name: unknown operator \"startswith\"");
    }

    #[test]
    fn test_context_ignore_list_replaces_config() {
        let ctx = ListRequest::new(QueryParams::parse("page=1&debug=1"), dto())
            .with_non_filtering_fields(["debug"]);
        let err = ExpressionFilter::default().compile(&ctx).unwrap_err();
        assert!(matches!(err, FilterError::UnknownField { ref field, .. } if field == "page"));
    }

    #[test]
    fn test_deserialized_search_param_is_skipped() {
        let config: FilterConfig = serde_json::from_str(r#"{"search_param": "query"}"#).unwrap();
        let ctx = ListRequest::new(QueryParams::parse("query=smith"), dto());
        let compiled = ExpressionFilter::new(config.clone()).compile(&ctx).unwrap();
        assert!(compiled.is_empty());

        let ctx = ListRequest::new(QueryParams::parse("q=smith"), dto());
        let err = ExpressionFilter::new(config).compile(&ctx).unwrap_err();
        assert!(matches!(err, FilterError::UnknownField { ref field, .. } if field == "q"));
    }

    #[test]
    fn test_shared_cache_separates_same_named_dtos() {
        let cache = CatalogCache::new();
        let filter = ExpressionFilter::default().with_cache(cache.clone());

        let names = DtoSchema::new("items").with_field(DtoField::new("name", DtoFieldKind::String));
        let ctx = ListRequest::new(QueryParams::parse("name=x"), names);
        assert_eq!(filter.compile(&ctx).unwrap().clauses().len(), 1);

        let prices =
            DtoSchema::new("items").with_field(DtoField::new("price", DtoFieldKind::Integer));
        let ctx = ListRequest::new(QueryParams::parse("price=gt:3"), prices);
        let compiled = filter.compile(&ctx).unwrap();
        assert_eq!(compiled.predicate().to_string(), "price gt \"3\"");
        assert_eq!(cache.filter_entries(), 2);
    }

    #[test]
    fn test_converter_and_custom_source() {
        let fields = vec![
            FilterableField::typed("age", Datatype::Integer),
            FilterableField::new("email").with_converter(|v| v.to_lowercase()),
            FilterableField::new("person").with_custom_source(|_, op, operand: Operand| {
                Ok(Predicate::lookup("first", op, operand.clone())
                    | Predicate::lookup("last", op, operand))
            }),
        ];
        let ctx = ListRequest::new(
            QueryParams::parse("email=in:(A@X.COM,b@x.com)&person=like:ann"),
            dto(),
        )
        .with_filterable_fields(fields);
        let compiled = ExpressionFilter::default().compile(&ctx).unwrap();
        assert_eq!(
            compiled.predicate().to_string(),
            "email in [\"a@x.com\", \"b@x.com\"] AND (first icontains \"ann\" OR last icontains \"ann\")"
        );
    }

    #[test]
    fn test_describe_lists_active_filters() {
        let ctx = ListRequest::new(QueryParams::parse("age=gt:3&age=lt:9&q=x"), dto());
        let description = ExpressionFilter::default().describe(&ctx).unwrap().unwrap();
        match description {
            FilterDescription::Expression(d) => {
                assert_eq!(d.fields.len(), 3);
                assert_eq!(d.operators.len(), 12);
                assert_eq!(d.operators[10].expects, "a list of exactly 2 values");
                assert_eq!(
                    d.active_filters,
                    vec![ActiveFilter {
                        field: "age".into(),
                        expression: "lt:9".into(),
                    }]
                );
            }
            other => panic!("expected expression description, got {:?}", other),
        }
    }
}
