//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required column is absent from a source table
    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn {
        /// Table that was validated
        table: String,
        /// Column that was expected
        column: String,
    },

    /// Two raw columns collapse to the same lowercase name
    #[error("Table '{table}' has duplicate column '{column}' after lowercasing")]
    DuplicateColumn {
        /// Table that was normalized
        table: String,
        /// Colliding lowercase name
        column: String,
    },

    /// File extension is not a supported table format
    #[error("Unsupported table format: {0}")]
    UnsupportedFormat(String),

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(String),
}
