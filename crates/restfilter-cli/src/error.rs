//! Error handling for the command line.

use std::path::PathBuf;

use restfilter_core::FilterError;
use restfilter_memory::DatasetError;
use thiserror::Error;

/// Command-line error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The dataset file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// The dataset path.
        path: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// The dataset is malformed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// The query was rejected.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Output could not be rendered.
    #[error("cannot render output: {0}")]
    Render(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code: 2 for rejected queries, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Filter(err) if err.is_validation() => 2,
            _ => 1,
        }
    }
}
