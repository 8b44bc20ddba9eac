//! Schema descriptors consumed for catalog auto-derivation.
//!
//! Two shapes are supported: a [`TableSchema`] describing the store's
//! columns, and a [`DtoSchema`] describing the output fields of the
//! serialized representation a list endpoint returns.

use serde::{Deserialize, Serialize};

use crate::field::{Datatype, FilterableField};
use crate::filter::ordering::OrderingField;

/// Primitive column types reported by store introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Bounded string.
    Char,
    /// Unbounded string.
    Text,
    /// Integer.
    Integer,
    /// Auto-incrementing integer identity.
    AutoId,
    /// Floating point.
    Float,
    /// Fixed-precision decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// Nullable boolean.
    NullBoolean,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Relation to another table.
    Relation,
}

impl ColumnKind {
    /// Filter datatype for this column, or `None` for relations.
    pub fn datatype(&self) -> Option<Datatype> {
        match self {
            ColumnKind::Char | ColumnKind::Text => Some(Datatype::String),
            ColumnKind::Integer | ColumnKind::AutoId => Some(Datatype::Integer),
            ColumnKind::Float | ColumnKind::Decimal => Some(Datatype::Float),
            ColumnKind::Boolean | ColumnKind::NullBoolean => Some(Datatype::Boolean),
            ColumnKind::Date | ColumnKind::DateTime => Some(Datatype::Datetime),
            ColumnKind::Relation => None,
        }
    }

    /// Whether this column points at another table.
    pub fn is_relation(&self) -> bool {
        matches!(self, ColumnKind::Relation)
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name; dotted names address joined columns.
    pub name: String,
    /// Primitive type.
    pub kind: ColumnKind,
}

impl ColumnDef {
    /// Create a column definition.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A table schema (store-side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Name of the unique identity column.
    pub primary_key: String,
    /// Column definitions, in declaration order.
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Create a table schema with no columns.
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column.
    pub fn with_column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.push(ColumnDef::new(name, kind));
        self
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Output field kinds of a DTO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DtoFieldKind {
    /// Boolean.
    Boolean,
    /// Integer.
    Integer,
    /// Floating point.
    Float,
    /// Decimal.
    Decimal,
    /// Date and time.
    DateTime,
    /// Calendar date (rendered as a string).
    Date,
    /// String.
    String,
    /// A nested representation of a related object.
    Nested,
    /// Anything else.
    Other,
}

impl DtoFieldKind {
    /// Filter datatype autodetected for this kind.
    pub fn datatype(&self) -> Datatype {
        match self {
            DtoFieldKind::Boolean => Datatype::Boolean,
            DtoFieldKind::Integer => Datatype::Integer,
            DtoFieldKind::Float | DtoFieldKind::Decimal => Datatype::Float,
            DtoFieldKind::DateTime => Datatype::Datetime,
            _ => Datatype::String,
        }
    }
}

/// Source marker of a field that renders the whole object.
pub const WHOLE_OBJECT_SOURCE: &str = "*";

/// An output field of a DTO.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DtoField {
    /// Output name.
    pub name: String,
    /// Store accessor, when different from the name.
    #[serde(default)]
    pub source: Option<String>,
    /// Field kind.
    pub kind: DtoFieldKind,
    /// Accepted on input but never rendered.
    #[serde(default)]
    pub write_only: bool,
}

impl DtoField {
    /// Create a readable field.
    pub fn new(name: impl Into<String>, kind: DtoFieldKind) -> Self {
        Self {
            name: name.into(),
            source: None,
            kind,
            write_only: false,
        }
    }

    /// Set the store accessor.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Mark as write-only.
    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    /// The accessor used for filtering and ordering: the source, else the name.
    pub fn accessor(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }

    /// Whether this field takes part in catalog autodetection.
    pub fn is_detectable(&self) -> bool {
        !self.write_only && self.source.as_deref() != Some(WHOLE_OBJECT_SOURCE)
    }
}

/// Output schema of a list endpoint.
///
/// A DTO may carry precomputed filter and ordering catalogs; when it does not,
/// catalogs are autodetected from its output fields.
#[derive(Debug, Clone, Default)]
pub struct DtoSchema {
    /// Schema name; also the catalog cache key.
    pub name: String,
    /// Output fields, in declaration order.
    pub fields: Vec<DtoField>,
    /// Precomputed filterable fields.
    pub filterable_fields: Option<Vec<FilterableField>>,
    /// Precomputed ordering fields.
    pub ordering_fields: Option<Vec<OrderingField>>,
}

impl DtoSchema {
    /// Create an empty DTO schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an output field.
    pub fn with_field(mut self, field: DtoField) -> Self {
        self.fields.push(field);
        self
    }

    /// Provide an explicit filter catalog.
    pub fn with_filterable_fields(mut self, fields: Vec<FilterableField>) -> Self {
        self.filterable_fields = Some(fields);
        self
    }

    /// Provide an explicit ordering catalog.
    pub fn with_ordering_fields(mut self, fields: Vec<OrderingField>) -> Self {
        self.ordering_fields = Some(fields);
        self
    }

    /// Build a DTO mirroring a table, with catalogs computed from the table.
    ///
    /// Relation columns are rendered as nested objects; they are neither
    /// filterable nor orderable.
    pub fn from_table(table: &TableSchema) -> Self {
        let fields = table
            .columns
            .iter()
            .map(|c| {
                let kind = match c.kind {
                    ColumnKind::Char | ColumnKind::Text => DtoFieldKind::String,
                    ColumnKind::Integer | ColumnKind::AutoId => DtoFieldKind::Integer,
                    ColumnKind::Float => DtoFieldKind::Float,
                    ColumnKind::Decimal => DtoFieldKind::Decimal,
                    ColumnKind::Boolean | ColumnKind::NullBoolean => DtoFieldKind::Boolean,
                    ColumnKind::Date => DtoFieldKind::Date,
                    ColumnKind::DateTime => DtoFieldKind::DateTime,
                    ColumnKind::Relation => DtoFieldKind::Nested,
                };
                DtoField::new(c.name.clone(), kind)
            })
            .collect();

        Self {
            name: table.name.clone(),
            fields,
            filterable_fields: Some(FilterableField::for_schema(table)),
            ordering_fields: Some(OrderingField::for_schema(table)),
        }
    }

    /// Get an output field by name.
    pub fn field(&self, name: &str) -> Option<&DtoField> {
        self.fields.iter().find(|f| f.name == name)
    }
}
