//! restfilter core - query-string filters compiled into store predicates.
//!
//! This crate turns the query parameters of a list endpoint into composable
//! predicates, free-text searches and orderings over an abstract
//! [`DataSource`]. It performs no I/O: rows are fetched by the data source
//! implementation, outside this crate.
//!
//! # Query Syntax
//!
//! ```text
//! ?status=active                 status equals "active" (default operator eq)
//! ?age=between:(18,65)           18 <= age <= 65
//! ?name=like:smith               name contains "smith", case-insensitive
//! ?tag=out:[a,b]                 tag is neither "a" nor "b"
//! ?deleted_at=isnull:1           deleted_at is null
//! ?q=alice "new york"            every term matches some searchable field
//! ?ordering=-age,name            descending age, then name, then primary key
//! ```
//!
//! Operators: `eq ne lt le gt ge like unlike in out between isnull`.
//!
//! # Usage
//!
//! ```rust
//! use restfilter_core::{
//!     DtoField, DtoFieldKind, DtoSchema, ExpressionFilter, ListRequest, QueryParams,
//! };
//!
//! let dto = DtoSchema::new("people")
//!     .with_field(DtoField::new("name", DtoFieldKind::String))
//!     .with_field(DtoField::new("age", DtoFieldKind::Integer));
//! let request = ListRequest::new(QueryParams::parse("age=between:(18,65)&page=2"), dto);
//!
//! let compiled = ExpressionFilter::default().compile(&request).unwrap();
//! assert_eq!(compiled.predicate().to_string(), r#"age range ["18", "65"]"#);
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod field;
pub mod filter;
pub mod operator;
pub mod params;
pub mod parser;
pub mod predicate;
pub mod projection;
pub mod schema;
pub mod source;

pub use catalog::{CatalogCache, FilterCatalog, OrderingCatalog};
pub use config::FilterConfig;
pub use context::{ListRequest, ServingContext};
pub use error::{FilterError, Result, StoreError};
pub use field::{CustomPredicateBuilder, Datatype, FieldSource, FilterableField};
pub use filter::{
    Clause, CompiledFilter, ExpressionFilter, FilterBackend, FilterDescription, FilterPipeline,
    OrderTerm, OrderingField, OrderingFilter, SearchOutcome, SimpleFilter,
};
pub use operator::{operators, Operator, TargetOp, OPERATORS};
pub use params::QueryParams;
pub use parser::{normalize_query, parse_array, parse_expression, ParsedExpression};
pub use predicate::{Lookup, Operand, Predicate};
pub use projection::{collect_items_from_string_lists, Projection};
pub use schema::{ColumnDef, ColumnKind, DtoField, DtoFieldKind, DtoSchema, TableSchema};
pub use source::DataSource;
