//! JSON datasets: a table schema plus rows.
//!
//! ```json
//! {
//!   "schema": {
//!     "name": "people",
//!     "primary_key": "id",
//!     "columns": [{"name": "id", "kind": "auto_id"}, {"name": "name", "kind": "text"}]
//!   },
//!   "rows": [{"id": 1, "name": "Ann"}]
//! }
//! ```
//!
//! Missing cells are NULL.

use std::io::Read;

use restfilter_core::{DtoSchema, StoreError, TableSchema};
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use thiserror::Error;
use tracing::debug;

use crate::table::{MemoryTable, Row};
use crate::value::Value;

/// Errors raised while loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The document is not valid JSON or has the wrong shape.
    #[error("invalid dataset: {0}")]
    Json(#[from] serde_json::Error),

    /// A cell does not fit its column.
    #[error("row {row}: {source}")]
    Cell {
        /// Zero-based row position.
        row: usize,
        /// The coercion failure.
        source: StoreError,
    },

    /// A row names a column the schema does not have.
    #[error("row {row}: unknown column '{column}'")]
    UnknownColumn {
        /// Zero-based row position.
        row: usize,
        /// The unexpected key.
        column: String,
    },

    /// The schema itself is inconsistent.
    #[error("invalid schema: {0}")]
    Schema(StoreError),
}

/// A schema with untyped JSON rows.
#[derive(Debug, Clone, Deserialize)]
pub struct Dataset {
    /// The table schema.
    pub schema: TableSchema,
    /// Rows keyed by column name.
    #[serde(default)]
    pub rows: Vec<Map<String, Json>>,
}

impl Dataset {
    /// Parse a dataset from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a dataset from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// A DTO mirroring the table, with catalogs derived from its columns.
    pub fn dto(&self) -> DtoSchema {
        DtoSchema::from_table(&self.schema)
    }

    /// Type every cell and build the table.
    pub fn into_table(self) -> Result<MemoryTable, DatasetError> {
        let schema = self.schema;
        let mut rows: Vec<Row> = Vec::with_capacity(self.rows.len());
        for (i, object) in self.rows.iter().enumerate() {
            if let Some(unknown) = object.keys().find(|k| schema.column(k).is_none()) {
                return Err(DatasetError::UnknownColumn {
                    row: i,
                    column: unknown.clone(),
                });
            }
            let row = schema
                .columns
                .iter()
                .map(|col| match object.get(&col.name) {
                    Some(json) => Value::from_json(json, col.kind, &col.name),
                    None => Ok(Value::Null),
                })
                .collect::<Result<Row, _>>()
                .map_err(|source| DatasetError::Cell { row: i, source })?;
            rows.push(row);
        }
        debug!(table = %schema.name, rows = rows.len(), "loaded dataset");
        MemoryTable::new(schema, rows).map_err(DatasetError::Schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restfilter_core::DataSource;

    const PEOPLE: &str = r#"{
        "schema": {
            "name": "people",
            "primary_key": "id",
            "columns": [
                {"name": "id", "kind": "auto_id"},
                {"name": "name", "kind": "text"},
                {"name": "born", "kind": "date"}
            ]
        },
        "rows": [
            {"id": 1, "name": "Ann", "born": "1990-05-01"},
            {"id": 2, "name": "Bob"}
        ]
    }"#;

    #[test]
    fn test_load() {
        let dataset = Dataset::from_json(PEOPLE).unwrap();
        assert_eq!(dataset.dto().name, "people");
        let table = dataset.into_table().unwrap();
        assert_eq!(table.count(), 2);
        assert_eq!(table.primary_key(), "id");
        assert_eq!(table.rows()[1][2], Value::Null);
    }

    #[test]
    fn test_bad_cell() {
        let json = PEOPLE.replace("1990-05-01", "May 1st");
        let err = Dataset::from_json(&json).unwrap().into_table().unwrap_err();
        assert!(matches!(err, DatasetError::Cell { row: 0, .. }));
        assert!(err.to_string().starts_with("row 0: value 'May 1st'"));
    }

    #[test]
    fn test_unknown_column() {
        let json = PEOPLE.replace("\"name\": \"Bob\"", "\"nick\": \"Bob\"");
        let err = Dataset::from_json(&json).unwrap().into_table().unwrap_err();
        assert_eq!(err.to_string(), "row 1: unknown column 'nick'");
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            Dataset::from_json("{\"rows\": []}"),
            Err(DatasetError::Json(_))
        ));
    }
}
