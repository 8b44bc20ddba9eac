//! Per-request field catalogs.
//!
//! A catalog is resolved once per request and never mutated afterwards.
//! Resolution priority for filters is: the serving context's explicit list,
//! then the list the DTO carries, then autodetection from the DTO's output
//! fields. Orderings resolve the same way, with names configured on the
//! ordering filter sitting next to the context's list.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::context::ServingContext;
use crate::error::{FilterError, Result};
use crate::field::{Datatype, FieldSource, FilterableField};
use crate::filter::ordering::OrderingField;
use crate::schema::{DtoField, DtoSchema};

/// Filterable fields by name, in declaration order.
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    fields: Vec<FilterableField>,
}

impl FilterCatalog {
    /// Build a catalog, rejecting duplicate names.
    pub fn new(fields: Vec<FilterableField>) -> Result<Self> {
        check_unique(fields.iter().map(|f| f.name.as_str()))?;
        Ok(Self { fields })
    }

    /// Resolve the filter catalog for `ctx`.
    ///
    /// Context overrides bypass `cache`; DTO-derived catalogs are memoized
    /// under the DTO's content when a cache is given.
    pub fn resolve<C>(ctx: &C, cache: Option<&CatalogCache>) -> Result<Arc<FilterCatalog>>
    where
        C: ServingContext + ?Sized,
    {
        if let Some(fields) = ctx.filterable_fields() {
            return Ok(Arc::new(Self::new(fields.to_vec())?));
        }

        let dto = ctx.dto();
        let derive = || {
            let fields = dto
                .filterable_fields
                .clone()
                .unwrap_or_else(|| FilterableField::for_dto(dto));
            Self::new(fields)
        };

        match cache {
            Some(cache) => cache.filters(CatalogKey::new(dto), derive),
            None => Ok(Arc::new(derive()?)),
        }
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FilterableField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by name, failing with the list of valid names.
    pub fn require(&self, name: &str) -> Result<&FilterableField> {
        self.get(name).ok_or_else(|| FilterError::UnknownField {
            field: name.to_string(),
            choices: self.names(),
        })
    }

    /// Every field name, in catalog order.
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Iterate fields in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &FilterableField> {
        self.fields.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the catalog has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Ordering keys by name, in declaration order.
#[derive(Debug, Clone)]
pub struct OrderingCatalog {
    fields: Vec<OrderingField>,
}

impl OrderingCatalog {
    /// Build a catalog, rejecting duplicate names.
    pub fn new(fields: Vec<OrderingField>) -> Result<Self> {
        check_unique(fields.iter().map(|f| f.name.as_str()))?;
        Ok(Self { fields })
    }

    /// Resolve the ordering catalog for `ctx`.
    ///
    /// Names from the context win over `configured`; either produces one
    /// single-term key per name.
    pub fn resolve<C>(
        ctx: &C,
        configured: Option<&[String]>,
        cache: Option<&CatalogCache>,
    ) -> Result<Arc<OrderingCatalog>>
    where
        C: ServingContext + ?Sized,
    {
        if let Some(names) = ctx.ordering_fields().or(configured) {
            let fields = names.iter().map(OrderingField::new).collect();
            return Ok(Arc::new(Self::new(fields)?));
        }

        let dto = ctx.dto();
        let derive = || {
            let fields = dto
                .ordering_fields
                .clone()
                .unwrap_or_else(|| OrderingField::for_dto(dto));
            Self::new(fields)
        };

        match cache {
            Some(cache) => cache.orderings(CatalogKey::new(dto), derive),
            None => Ok(Arc::new(derive()?)),
        }
    }

    /// Look up a key by name.
    pub fn get(&self, name: &str) -> Option<&OrderingField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Every key name, in catalog order.
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Iterate keys in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &OrderingField> {
        self.fields.iter()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the catalog has no keys.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn check_unique<'a>(names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(FilterError::DuplicateField(name.to_string()));
        }
    }
    Ok(())
}

/// Identity of a DTO as far as catalog derivation is concerned.
///
/// Two DTOs share an entry only when their name, output fields and explicit
/// catalogs all match. Custom sources and converters compare by pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CatalogKey {
    name: String,
    fields: Vec<DtoField>,
    filterable: Option<Vec<FilterKey>>,
    ordering: Option<Vec<OrderingField>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FilterKey {
    name: String,
    path: Option<String>,
    custom: Option<usize>,
    converter: Option<usize>,
    datatype: Datatype,
    advanced: bool,
}

impl CatalogKey {
    fn new(dto: &DtoSchema) -> Self {
        Self {
            name: dto.name.clone(),
            fields: dto.fields.clone(),
            filterable: dto
                .filterable_fields
                .as_ref()
                .map(|fields| fields.iter().map(FilterKey::new).collect()),
            ordering: dto.ordering_fields.clone(),
        }
    }
}

impl FilterKey {
    fn new(field: &FilterableField) -> Self {
        let custom = match &field.source {
            FieldSource::Path(_) => None,
            FieldSource::Custom(builder) => Some(Arc::as_ptr(builder).cast::<()>() as usize),
        };
        Self {
            name: field.name.clone(),
            path: field.path().map(str::to_string),
            custom,
            converter: field
                .converter
                .as_ref()
                .map(|c| Arc::as_ptr(c).cast::<()>() as usize),
            datatype: field.datatype,
            advanced: field.advanced,
        }
    }
}

/// Memoizes DTO-derived catalogs by DTO content.
///
/// Derivation is a pure function of the DTO, so entries are never
/// invalidated. Cloning shares the underlying maps; the cache is safe for
/// concurrent readers.
#[derive(Clone, Default)]
pub struct CatalogCache {
    filters: Arc<DashMap<CatalogKey, Arc<FilterCatalog>>>,
    orderings: Arc<DashMap<CatalogKey, Arc<OrderingCatalog>>>,
}

impl CatalogCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn filters<F>(&self, key: CatalogKey, derive: F) -> Result<Arc<FilterCatalog>>
    where
        F: FnOnce() -> Result<FilterCatalog>,
    {
        if let Some(hit) = self.filters.get(&key) {
            trace!(dto = %key.name, "filter catalog cache hit");
            return Ok(Arc::clone(hit.value()));
        }
        let catalog = Arc::new(derive()?);
        self.filters.insert(key, Arc::clone(&catalog));
        Ok(catalog)
    }

    fn orderings<F>(&self, key: CatalogKey, derive: F) -> Result<Arc<OrderingCatalog>>
    where
        F: FnOnce() -> Result<OrderingCatalog>,
    {
        if let Some(hit) = self.orderings.get(&key) {
            trace!(dto = %key.name, "ordering catalog cache hit");
            return Ok(Arc::clone(hit.value()));
        }
        let catalog = Arc::new(derive()?);
        self.orderings.insert(key, Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Number of memoized filter catalogs.
    pub fn filter_entries(&self) -> usize {
        self.filters.len()
    }

    /// Number of memoized ordering catalogs.
    pub fn ordering_entries(&self) -> usize {
        self.orderings.len()
    }

    /// Drop every memoized catalog.
    pub fn clear(&self) {
        self.filters.clear();
        self.orderings.clear();
    }
}

impl fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogCache")
            .field("filters", &self.filters.len())
            .field("orderings", &self.orderings.len())
            .finish()
    }
}
