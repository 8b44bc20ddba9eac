//! Output formatters for filtered rows and descriptions.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use restfilter_core::FilterDescription;
use serde::Serialize;
use serde_json::Value;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// What `--explain` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explain {
    /// The combined expression-filter predicate.
    pub filter: String,
    /// The free-text predicate, if any.
    pub search: String,
    /// Sort terms applied, tiebreaker included.
    pub ordering: Vec<String>,
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format rendered rows; `columns` gives the column order.
    fn format_rows(&self, columns: &[String], rows: &[Value]) -> String;

    /// Format backend descriptions.
    fn format_descriptions(&self, descriptions: &[FilterDescription]) -> String;

    /// Format an explanation of the compiled query.
    fn format_explain(&self, explain: &Explain) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_rows(&self, columns: &[String], rows: &[Value]) -> String {
        if rows.is_empty() {
            return "No results".to_string();
        }

        let mut table = Table::new();
        table.set_header(columns.iter().map(Cell::new).collect::<Vec<_>>());
        for row in rows {
            let cells: Vec<Cell> = columns
                .iter()
                .map(|col| Cell::new(format_value(row.get(col).unwrap_or(&Value::Null))))
                .collect();
            table.add_row(cells);
        }
        format!("{}\n{} row(s)", table, rows.len())
    }

    fn format_descriptions(&self, descriptions: &[FilterDescription]) -> String {
        descriptions
            .iter()
            .map(describe_as_tables)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn format_explain(&self, explain: &Explain) -> String {
        format!(
            "filter:   {}\nsearch:   {}\nordering: {}",
            explain.filter,
            explain.search,
            explain.ordering.join(", ")
        )
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_rows(&self, _columns: &[String], rows: &[Value]) -> String {
        serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_descriptions(&self, descriptions: &[FilterDescription]) -> String {
        serde_json::to_string_pretty(descriptions).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_explain(&self, explain: &Explain) -> String {
        serde_json::to_string_pretty(explain).unwrap_or_else(|_| "{}".to_string())
    }
}

fn describe_as_tables(description: &FilterDescription) -> String {
    match description {
        FilterDescription::Expression(desc) => {
            let mut fields = Table::new();
            fields.set_header(vec!["Field", "Type"]);
            for field in &desc.fields {
                fields.add_row(vec![field.name.clone(), field.datatype.to_string()]);
            }

            let mut operators = Table::new();
            operators.set_header(vec!["Operator", "Meaning", "Expects"]);
            for op in &desc.operators {
                operators.add_row(vec![op.name, op.description, op.expects.as_str()]);
            }

            let mut out = format!("Filters\n{}\n{}", fields, operators);
            if !desc.active_filters.is_empty() {
                let mut active = Table::new();
                active.set_header(vec!["Active", "Expression"]);
                for filter in &desc.active_filters {
                    active.add_row(vec![filter.field.as_str(), filter.expression.as_str()]);
                }
                out.push_str(&format!("\n{}", active));
            }
            out
        }
        FilterDescription::Search(desc) => {
            let names: Vec<&str> = desc.fields.iter().map(|f| f.name.as_str()).collect();
            format!(
                "Search ({}): {}\nterms: {}",
                desc.search_param,
                names.join(", "),
                if desc.terms.is_empty() { "-" } else { desc.terms.as_str() }
            )
        }
        FilterDescription::Ordering(desc) => {
            let names: Vec<&str> = desc.fields.iter().map(|f| f.name.as_str()).collect();
            let mut out = format!("Ordering ({}): {}", desc.ordering_param, names.join(", "));
            if let Some(default) = &desc.default_ordering {
                out.push_str(&format!("\ndefault: {}", default.join(",")));
            }
            if let Some(current) = &desc.ordering {
                out.push_str(&format!("\ncurrent: {}", current.join(",")));
            }
            out
        }
    }
}

/// Format a JSON cell as a display string.
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
