#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod application;
pub mod bureau;
pub mod card;
pub mod installment;
pub mod pos;
pub mod previous;
pub mod registry;

pub use application::{ApplicationConfig, ApplicationDeriver};
pub use bureau::{BureauConfig, BureauDeriver};
pub use card::{CardConfig, CardDeriver};
pub use installment::InstallmentDeriver;
pub use pos::PosDeriver;
pub use previous::PreviousDeriver;
pub use registry::{DeriverInfo, available_derivers, deriver_info, deriver_map};

use polars::prelude::*;
use std::collections::HashSet;
use thiserror::Error;

/// Target applicant-ID set a deriver restricts its source to.
pub type IdSet = HashSet<i64>;

/// Errors produced by feature derivation.
#[derive(Debug, Error)]
pub enum DeriveError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// Required column is absent from the source table
    #[error("Deriver '{deriver}' requires column '{column}' in its source table")]
    MissingColumn {
        /// Deriver that was running
        deriver: String,
        /// Column that was expected
        column: String,
    },
}

/// A per-source feature deriver.
///
/// Derivers are pure: the same source frame and ID set always produce the
/// same derived table, and the source is never mutated. Every deriver
/// filters to the target applicant set first, then computes row-level
/// ratios and flags, then aggregates to applicant grain.
pub trait SourceDeriver {
    /// Unique deriver name.
    fn name(&self) -> &str;

    /// Columns the source table must provide.
    fn required_columns(&self) -> &[&str];

    /// Derive the applicant-grain feature table from the raw source.
    fn derive(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError>;
}

/// Membership filter on the applicant-ID column.
pub(crate) fn applicant_filter(ids: &IdSet) -> Expr {
    let mut sorted: Vec<i64> = ids.iter().copied().collect();
    sorted.sort_unstable();
    col("sk_id_curr").is_in(lit(Series::new("sk_id_curr".into(), sorted)))
}

/// Fail with [`DeriveError::MissingColumn`] unless every required column is
/// present in the source schema.
pub(crate) fn ensure_columns(
    source: &LazyFrame,
    deriver: &str,
    required: &[&str],
) -> Result<(), DeriveError> {
    let schema = source
        .clone()
        .collect_schema()
        .map_err(DeriveError::Polars)?;
    for column in required {
        if !schema.contains(column) {
            return Err(DeriveError::MissingColumn {
                deriver: deriver.to_string(),
                column: (*column).to_string(),
            });
        }
    }
    Ok(())
}

/// Null-safe ratio: `num / denom` where `denom > 0`, null otherwise.
pub(crate) fn safe_ratio(num: Expr, denom: Expr) -> Expr {
    when(denom.clone().gt(lit(0.0)))
        .then(num / denom)
        .otherwise(lit(NULL))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::IdSet;

    pub(crate) fn ids(values: &[i64]) -> IdSet {
        values.iter().copied().collect()
    }
}
