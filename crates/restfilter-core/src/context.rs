//! The serving-context contract: what a list endpoint exposes to the filters.

use crate::field::FilterableField;
use crate::params::QueryParams;
use crate::schema::DtoSchema;

/// Per-request view of a list endpoint.
///
/// Only [`query_params`](Self::query_params) and [`dto`](Self::dto) are
/// required; every override defaults to "not set", in which case catalogs are
/// derived from the DTO.
pub trait ServingContext {
    /// The request's query parameters.
    fn query_params(&self) -> &QueryParams;

    /// The output schema of the endpoint.
    fn dto(&self) -> &DtoSchema;

    /// Explicit filterable fields for this endpoint.
    fn filterable_fields(&self) -> Option<&[FilterableField]> {
        None
    }

    /// Explicit ordering field names for this endpoint.
    fn ordering_fields(&self) -> Option<&[String]> {
        None
    }

    /// Ordering terms used when the request gives none.
    fn default_ordering(&self) -> Option<&[String]> {
        None
    }

    /// Parameter names never treated as filter fields, replacing the
    /// configured ignore-list.
    fn non_filtering_fields(&self) -> Option<&[String]> {
        None
    }
}

/// A concrete [`ServingContext`] assembled by the caller.
#[derive(Debug, Clone)]
pub struct ListRequest {
    params: QueryParams,
    dto: DtoSchema,
    filterable_fields: Option<Vec<FilterableField>>,
    ordering_fields: Option<Vec<String>>,
    default_ordering: Option<Vec<String>>,
    non_filtering_fields: Option<Vec<String>>,
}

impl ListRequest {
    /// Create a request over `dto` with the given parameters.
    pub fn new(params: QueryParams, dto: DtoSchema) -> Self {
        Self {
            params,
            dto,
            filterable_fields: None,
            ordering_fields: None,
            default_ordering: None,
            non_filtering_fields: None,
        }
    }

    /// Set explicit filterable fields.
    pub fn with_filterable_fields(mut self, fields: Vec<FilterableField>) -> Self {
        self.filterable_fields = Some(fields);
        self
    }

    /// Set explicit ordering field names.
    pub fn with_ordering_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ordering_fields = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the default ordering.
    pub fn with_default_ordering<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_ordering = Some(terms.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the ignore-list for this request.
    pub fn with_non_filtering_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_filtering_fields = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

impl ServingContext for ListRequest {
    fn query_params(&self) -> &QueryParams {
        &self.params
    }

    fn dto(&self) -> &DtoSchema {
        &self.dto
    }

    fn filterable_fields(&self) -> Option<&[FilterableField]> {
        self.filterable_fields.as_deref()
    }

    fn ordering_fields(&self) -> Option<&[String]> {
        self.ordering_fields.as_deref()
    }

    fn default_ordering(&self) -> Option<&[String]> {
        self.default_ordering.as_deref()
    }

    fn non_filtering_fields(&self) -> Option<&[String]> {
        self.non_filtering_fields.as_deref()
    }
}
