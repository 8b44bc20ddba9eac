//! Filterable field descriptors.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::operator::TargetOp;
use crate::predicate::{Operand, Predicate};
use crate::schema::{DtoSchema, TableSchema};

/// The type of values a field holds.
///
/// The datatype decides which fields take part in free-text search; operator
/// validity is left to the store's type coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    /// String value.
    String,
    /// Integer value.
    Integer,
    /// Floating point value.
    Float,
    /// Boolean value.
    Boolean,
    /// Date or date-time value.
    Datetime,
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Datatype::String => "string",
            Datatype::Integer => "integer",
            Datatype::Float => "float",
            Datatype::Boolean => "boolean",
            Datatype::Datetime => "datetime",
        };
        f.write_str(s)
    }
}

/// Builds the predicate for a field whose filtering is not a plain accessor
/// comparison (computed fields, cross-table lookups).
pub trait CustomPredicateBuilder: Send + Sync {
    /// Build the predicate for `field target operand`. The operand has
    /// already been converted.
    fn build_predicate(
        &self,
        field: &FilterableField,
        target: TargetOp,
        operand: Operand,
    ) -> Result<Predicate>;
}

impl<F> CustomPredicateBuilder for F
where
    F: Fn(&FilterableField, TargetOp, Operand) -> Result<Predicate> + Send + Sync,
{
    fn build_predicate(
        &self,
        field: &FilterableField,
        target: TargetOp,
        operand: Operand,
    ) -> Result<Predicate> {
        self(field, target, operand)
    }
}

/// Where a field's predicate comes from.
#[derive(Clone)]
pub enum FieldSource {
    /// Dotted accessor path in the store.
    Path(String),
    /// Custom predicate logic.
    Custom(Arc<dyn CustomPredicateBuilder>),
}

impl fmt::Debug for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            FieldSource::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Value-normalizing function applied to every operand value.
pub type Converter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Describes an attribute that can be filtered on.
#[derive(Clone)]
pub struct FilterableField {
    /// API-facing name, unique within a catalog.
    pub name: String,
    /// Accessor path or custom predicate builder.
    pub source: FieldSource,
    /// Optional operand converter; identity when absent.
    pub converter: Option<Converter>,
    /// Declared datatype.
    pub datatype: Datatype,
    /// Excluded from free-text search when set.
    pub advanced: bool,
}

impl fmt::Debug for FilterableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterableField")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("datatype", &self.datatype)
            .field("advanced", &self.advanced)
            .finish()
    }
}

impl FilterableField {
    /// Create a string field whose accessor path equals its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: FieldSource::Path(name.clone()),
            name,
            converter: None,
            datatype: Datatype::String,
            advanced: false,
        }
    }

    /// Create a field with the given datatype.
    pub fn typed(name: impl Into<String>, datatype: Datatype) -> Self {
        Self::new(name).with_datatype(datatype)
    }

    /// Set the datatype.
    pub fn with_datatype(mut self, datatype: Datatype) -> Self {
        self.datatype = datatype;
        self
    }

    /// Set the accessor path.
    pub fn with_source(mut self, path: impl Into<String>) -> Self {
        self.source = FieldSource::Path(path.into());
        self
    }

    /// Use a closure as custom predicate logic instead of an accessor path.
    pub fn with_custom_source<F>(self, builder: F) -> Self
    where
        F: Fn(&FilterableField, TargetOp, Operand) -> Result<Predicate> + Send + Sync + 'static,
    {
        self.with_predicate_builder(builder)
    }

    /// Use a [`CustomPredicateBuilder`] instead of an accessor path.
    pub fn with_predicate_builder(mut self, builder: impl CustomPredicateBuilder + 'static) -> Self {
        self.source = FieldSource::Custom(Arc::new(builder));
        self
    }

    /// Set the operand converter.
    pub fn with_converter<F>(mut self, converter: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Exclude from free-text search.
    pub fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }

    /// The accessor path, if this field is not custom.
    pub fn path(&self) -> Option<&str> {
        match &self.source {
            FieldSource::Path(path) => Some(path),
            FieldSource::Custom(_) => None,
        }
    }

    /// Apply the converter to a scalar, or element-wise to a list.
    pub fn convert(&self, operand: Operand) -> Operand {
        match &self.converter {
            Some(converter) => operand.map(|v| converter(v)),
            None => operand,
        }
    }

    /// Convert the operand and build the predicate for `field target operand`.
    pub fn build_predicate(&self, target: TargetOp, operand: Operand) -> Result<Predicate> {
        let operand = self.convert(operand);
        match &self.source {
            FieldSource::Custom(builder) => builder.build_predicate(self, target, operand),
            FieldSource::Path(path) => Ok(Predicate::lookup(path.clone(), target, operand)),
        }
    }

    /// Derive one field per primitive column of a table; relations are skipped.
    pub fn for_schema(table: &TableSchema) -> Vec<FilterableField> {
        table
            .columns
            .iter()
            .filter_map(|c| c.kind.datatype().map(|dt| Self::typed(c.name.clone(), dt)))
            .collect()
    }

    /// Autodetect fields from a DTO's readable output fields.
    ///
    /// Write-only fields and whole-object fields are skipped. The field is
    /// named after its accessor.
    pub fn for_dto(dto: &DtoSchema) -> Vec<FilterableField> {
        dto.fields
            .iter()
            .filter(|f| f.is_detectable())
            .map(|f| Self::typed(f.accessor(), f.kind.datatype()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnKind, DtoField, DtoFieldKind};

    #[test]
    fn test_defaults() {
        let field = FilterableField::new("name");
        assert_eq!(field.path(), Some("name"));
        assert_eq!(field.datatype, Datatype::String);
        assert!(!field.advanced);
        assert_eq!(field.convert(Operand::scalar("x")), Operand::scalar("x"));
    }

    #[test]
    fn test_build_predicate_uses_path() {
        let field = FilterableField::new("owner").with_source("owner.username");
        let p = field
            .build_predicate(TargetOp::IContains, Operand::scalar("bob"))
            .unwrap();
        assert_eq!(
            p,
            Predicate::lookup("owner.username", TargetOp::IContains, Operand::scalar("bob"))
        );
    }

    #[test]
    fn test_converter_is_applied_elementwise() {
        let field = FilterableField::new("code").with_converter(|v| v.to_uppercase());
        assert_eq!(
            field.convert(Operand::list(["ab", "cd"])),
            Operand::list(["AB", "CD"])
        );
        let p = field
            .build_predicate(TargetOp::In, Operand::list(["x"]))
            .unwrap();
        assert_eq!(p, Predicate::lookup("code", TargetOp::In, Operand::list(["X"])));
    }

    #[test]
    fn test_custom_source_receives_converted_operand() {
        let field = FilterableField::new("full_name")
            .with_converter(|v| v.trim().to_string())
            .with_custom_source(|_, op, operand: Operand| {
                Ok(Predicate::lookup("first_name", op, operand.clone())
                    | Predicate::lookup("last_name", op, operand))
            });
        assert_eq!(field.path(), None);

        let p = field
            .build_predicate(TargetOp::IContains, Operand::scalar("  smith "))
            .unwrap();
        assert_eq!(
            p.to_string(),
            "first_name icontains \"smith\" OR last_name icontains \"smith\""
        );
    }

    #[test]
    fn test_for_schema_skips_relations() {
        let table = TableSchema::new("posts", "id")
            .with_column("id", ColumnKind::AutoId)
            .with_column("title", ColumnKind::Text)
            .with_column("author", ColumnKind::Relation)
            .with_column("published", ColumnKind::DateTime);
        let fields = FilterableField::for_schema(&table);
        let summary: Vec<(&str, Datatype)> =
            fields.iter().map(|f| (f.name.as_str(), f.datatype)).collect();
        assert_eq!(
            summary,
            vec![
                ("id", Datatype::Integer),
                ("title", Datatype::String),
                ("published", Datatype::Datetime),
            ]
        );
    }

    #[test]
    fn test_for_dto_uses_accessor_and_skips_hidden() {
        let dto = DtoSchema::new("users")
            .with_field(DtoField::new("id", DtoFieldKind::Integer))
            .with_field(DtoField::new("team", DtoFieldKind::String).with_source("team.name"))
            .with_field(DtoField::new("password", DtoFieldKind::String).write_only())
            .with_field(DtoField::new("links", DtoFieldKind::Other).with_source("*"))
            .with_field(DtoField::new("rating", DtoFieldKind::Decimal));
        let fields = FilterableField::for_dto(&dto);
        let summary: Vec<(&str, Datatype)> =
            fields.iter().map(|f| (f.name.as_str(), f.datatype)).collect();
        assert_eq!(
            summary,
            vec![
                ("id", Datatype::Integer),
                ("team.name", Datatype::String),
                ("rating", Datatype::Float),
            ]
        );
    }
}
