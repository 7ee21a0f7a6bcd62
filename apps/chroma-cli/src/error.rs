//! # CLI Error Type
//!
//! Everything a command can fail with, flattened for a one-line report on
//! stderr.

use chroma_core::ValidationError;
use chroma_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Could not determine the application data directory; pass --db")]
    NoDataDirectory,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
