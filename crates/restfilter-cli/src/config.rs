//! Command-line configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use restfilter_core::config::{DEFAULT_FIELDS_PARAM, DEFAULT_ORDERING_PARAM, DEFAULT_SEARCH_PARAM};
use restfilter_core::FilterConfig;

use crate::formatter::OutputFormat;

/// restfilter command line arguments.
#[derive(Debug, Parser)]
#[command(name = "restfilter")]
#[command(version, about = "Apply REST-style filter query strings to a JSON dataset")]
pub struct Args {
    /// JSON dataset: a table schema plus rows.
    #[arg(short, long)]
    pub data: PathBuf,

    /// Name of the ordering parameter.
    #[arg(long, default_value = DEFAULT_ORDERING_PARAM)]
    pub ordering_param: String,

    /// Name of the free-text search parameter.
    #[arg(long, default_value = DEFAULT_SEARCH_PARAM)]
    pub search_param: String,

    /// Name of the field-projection parameter.
    #[arg(long, default_value = DEFAULT_FIELDS_PARAM)]
    pub fields_param: String,

    /// Additional parameter names never treated as filters.
    #[arg(long = "ignore", value_name = "PARAM")]
    pub ignored_params: Vec<String>,

    /// Ordering used when the query gives none, e.g. `-age,name`.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub default_ordering: Vec<String>,

    /// Restrict ordering to these keys.
    #[arg(long = "orderable", value_delimiter = ',')]
    pub ordering_fields: Vec<String>,

    /// Output format.
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do with the dataset.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Filter the dataset and print the matching rows.
    Query {
        /// Raw query string, e.g. `age=ge:18&q=smith&ordering=-age`.
        #[arg(default_value = "")]
        query: String,

        /// Print the compiled predicates and the effective ordering first.
        #[arg(long)]
        explain: bool,
    },

    /// Describe the available filters and orderings.
    Describe {
        /// Raw query string; its filters are reported as active.
        #[arg(default_value = "")]
        query: String,
    },
}

impl From<&Args> for FilterConfig {
    fn from(args: &Args) -> Self {
        args.ignored_params.iter().fold(
            FilterConfig::with_params(
                args.ordering_param.clone(),
                args.search_param.clone(),
                args.fields_param.clone(),
            ),
            |config, name| config.with_ignored_param(name.clone()),
        )
    }
}
