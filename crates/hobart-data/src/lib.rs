#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod ingest;

pub use cache::BureauBalanceCache;
pub use error::{DataError, Result};
pub use ingest::{
    BUREAU_LOAN_COL, ID_COL, LOAN_COL, SourceBundle, normalize_columns, read_table, unique_ids,
    validate_required,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
