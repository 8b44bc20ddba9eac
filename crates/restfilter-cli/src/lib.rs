//! restfilter CLI - run REST-style filter query strings against a JSON dataset.

pub mod config;
pub mod error;
pub mod formatter;
pub mod runner;

pub use config::{Args, Command};
pub use error::CliError;
pub use formatter::{create_formatter, Explain, Formatter, OutputFormat};
pub use runner::run;
