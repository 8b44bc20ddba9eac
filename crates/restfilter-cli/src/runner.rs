//! Loads a dataset, runs the filter pipeline and renders the result.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use restfilter_core::{
    DataSource, FilterConfig, FilterPipeline, ListRequest, OrderingFilter, Projection,
    QueryParams, SearchOutcome, ServingContext,
};
use restfilter_memory::{Dataset, MemoryTable};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{Args, Command};
use crate::error::CliError;
use crate::formatter::{create_formatter, Explain};

/// Run one command and return its rendered output.
pub fn run(args: &Args) -> Result<String, CliError> {
    let config = FilterConfig::from(args);
    let dataset = load_dataset(&args.data)?;
    let dto = dataset.dto();
    let table = dataset.into_table()?;
    info!(table = %dto.name, rows = table.total(), "dataset loaded");

    let mut pipeline = FilterPipeline::new(config.clone());
    if !args.ordering_fields.is_empty() {
        pipeline = pipeline.with_ordering(
            OrderingFilter::new(config.clone()).with_ordering_fields(args.ordering_fields.clone()),
        );
    }
    let formatter = create_formatter(args.format);

    match &args.command {
        Command::Query { query, explain } => {
            let request = build_request(query, dto, args);
            let mut output = Vec::new();
            if *explain {
                output.push(formatter.format_explain(&explain_query(&pipeline, &table, &request)?));
            }

            let filtered = pipeline.filter_source(table, &request)?;
            let rows = filtered.to_json();
            debug!(matched = rows.len(), "query executed");

            let (columns, rows) = match Projection::from_params(request.query_params(), &config) {
                Some(projection) if !projection.is_empty() => {
                    let rows: Vec<Value> = rows.iter().map(|row| projection.pluck(row)).collect();
                    (plucked_columns(&projection, &rows), rows)
                }
                _ => {
                    let columns = filtered
                        .schema()
                        .columns
                        .iter()
                        .map(|c| c.name.clone())
                        .collect();
                    (columns, rows)
                }
            };
            output.push(formatter.format_rows(&columns, &rows));
            Ok(output.join("\n\n"))
        }
        Command::Describe { query } => {
            let request = build_request(query, dto, args);
            let descriptions = pipeline.describe(&request)?;
            Ok(formatter.format_descriptions(&descriptions))
        }
    }
}

fn load_dataset(path: &Path) -> Result<Dataset, CliError> {
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Dataset::from_reader(BufReader::new(file))?)
}

fn build_request(query: &str, dto: restfilter_core::DtoSchema, args: &Args) -> ListRequest {
    let request = ListRequest::new(QueryParams::parse(query), dto);
    if args.default_ordering.is_empty() {
        request
    } else {
        request.with_default_ordering(args.default_ordering.clone())
    }
}

fn explain_query(
    pipeline: &FilterPipeline,
    table: &MemoryTable,
    request: &ListRequest,
) -> Result<Explain, CliError> {
    let filter = pipeline.expression().compile(request)?.predicate().to_string();
    let search = match pipeline.search().compile(request)? {
        SearchOutcome::PassThrough => "TRUE".to_string(),
        SearchOutcome::Nothing => "FALSE".to_string(),
        SearchOutcome::Match(predicate) => predicate.to_string(),
    };
    let ordering = pipeline
        .ordering()
        .effective_ordering(request, table.primary_key())?
        .iter()
        .map(ToString::to_string)
        .collect();
    Ok(Explain {
        filter,
        search,
        ordering,
    })
}

/// Column order for plucked rows.
///
/// Requested paths come first, in request order. Keys produced by wildcard
/// expansion follow in the row map's own (sorted) key order.
fn plucked_columns(projection: &Projection, rows: &[Value]) -> Vec<String> {
    let present = |name: &String| {
        rows.iter()
            .any(|row| row.as_object().is_some_and(|map| map.contains_key(name)))
    };
    let mut columns: Vec<String> = projection
        .fields()
        .iter()
        .filter(|f| present(f))
        .cloned()
        .collect();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }
    columns
}
