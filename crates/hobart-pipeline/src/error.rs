//! Pipeline error types.

use thiserror::Error;

/// Errors from the partition/merge/clean stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// A join multiplied applicant rows; every downstream score would be
    /// corrupted, so the run aborts.
    #[error("merge produced {rows} rows for {applicants} distinct applicants")]
    RowFanOut {
        /// Row count after the join chain
        rows: usize,
        /// Distinct applicant-ID count
        applicants: usize,
    },

    /// Two sources produced the same column name
    #[error("duplicate feature column '{column}' across merge inputs")]
    DuplicateColumn {
        /// Offending column
        column: String,
    },

    /// A stage expected a column that is not there
    #[error("required column '{column}' is missing")]
    MissingColumn {
        /// Expected column
        column: String,
    },
}

/// Convenience alias for pipeline results.
pub type Result<T> = std::result::Result<T, PipelineError>;
