//! Integration tests for the command line runner.

use std::io::Write;

use clap::Parser;
use restfilter_cli::{run, Args, CliError};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

const DATASET: &str = r#"{
    "schema": {
        "name": "people",
        "primary_key": "id",
        "columns": [
            {"name": "id", "kind": "auto_id"},
            {"name": "name", "kind": "text"},
            {"name": "age", "kind": "integer"},
            {"name": "city", "kind": "char"}
        ]
    },
    "rows": [
        {"id": 1, "name": "Ann Smith", "age": 34, "city": "Oslo"},
        {"id": 2, "name": "Bob Jones", "age": 17, "city": "Bergen"},
        {"id": 3, "name": "Cy Smith", "age": 52, "city": "Oslo"}
    ]
}"#;

fn dataset() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(DATASET.as_bytes()).unwrap();
    file
}

fn run_with(file: &NamedTempFile, extra: &[&str]) -> Result<String, CliError> {
    let path = file.path().to_str().unwrap().to_string();
    let mut argv = vec!["restfilter".to_string(), "--data".to_string(), path];
    argv.extend(extra.iter().map(|s| s.to_string()));
    run(&Args::parse_from(argv))
}

fn json_output(file: &NamedTempFile, extra: &[&str]) -> Value {
    let mut argv = vec!["--format", "json"];
    argv.extend_from_slice(extra);
    serde_json::from_str(&run_with(file, &argv).unwrap()).unwrap()
}

#[test]
fn test_query_json() {
    let file = dataset();
    let out = json_output(&file, &["query", "name=like:smith&ordering=-age"]);
    assert_eq!(
        out,
        json!([
            {"id": 3, "name": "Cy Smith", "age": 52, "city": "Oslo"},
            {"id": 1, "name": "Ann Smith", "age": 34, "city": "Oslo"}
        ])
    );
}

#[test]
fn test_query_with_projection() {
    let file = dataset();
    let out = json_output(&file, &["query", "q=oslo&fields=name"]);
    assert_eq!(out, json!([{"name": "Ann Smith"}, {"name": "Cy Smith"}]));
}

#[test]
fn test_default_ordering_and_table_output() {
    let file = dataset();
    let out = run_with(&file, &["--default-ordering", "-age", "query", "age=ge:18"]).unwrap();
    let cy = out.find("Cy Smith").unwrap();
    let ann = out.find("Ann Smith").unwrap();
    assert!(cy < ann);
    assert!(!out.contains("Bob Jones"));
    assert!(out.ends_with("2 row(s)"));
}

#[test]
fn test_explain() {
    let file = dataset();
    let out = run_with(&file, &["query", "age=between:(18,40)", "--explain"]).unwrap();
    assert!(out.starts_with("filter:   age range [\"18\", \"40\"]\nsearch:   TRUE\nordering: id"));
    assert!(out.contains("Ann Smith"));
}

#[test]
fn test_describe() {
    let file = dataset();
    let out = json_output(&file, &["describe", "age=gt:3"]);
    assert_eq!(out[0]["kind"], "expression");
    assert_eq!(out[0]["active_filters"], json!([{"field": "age", "expression": "gt:3"}]));
    assert_eq!(out[1]["fields"].as_array().map(Vec::len), Some(4));
    assert_eq!(out[2]["ordering_param"], "ordering");

    let text = run_with(&file, &["describe"]).unwrap();
    assert!(text.contains("Filters"));
    assert!(text.contains("between"));
    assert!(text.contains("Ordering (ordering): id, name, age, city"));
}

#[test]
fn test_restricted_ordering() {
    let file = dataset();
    let err = run_with(&file, &["--orderable", "age", "query", "ordering=name"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(
        err.to_string(),
        "Unknown ordering field: 'name' (choices are age)"
    );
}

#[test]
fn test_rejected_query() {
    let file = dataset();
    let err = run_with(&file, &["query", "age=gt:old"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(
        err.to_string(),
        "age: the given operator or value are inappropriate for this field"
    );
}

#[test]
fn test_missing_dataset() {
    let args = Args::parse_from(["restfilter", "--data", "/nonexistent/people.json", "query"]);
    let err = run(&args).unwrap_err();
    assert!(matches!(err, CliError::Io { .. }));
    assert_eq!(err.exit_code(), 1);
}
