//! POS-cash deriver.
//!
//! A single severe-delinquency indicator: did any POS loan of the applicant
//! ever report a material days-past-due event.

use crate::{DeriveError, IdSet, SourceDeriver, applicant_filter, ensure_columns};
use polars::prelude::*;

/// Derives the POS default flag.
#[derive(Debug, Default)]
pub struct PosDeriver;

impl PosDeriver {
    /// Per-loan flag: 1 when any month of the loan reported a
    /// definition-level days-past-due.
    pub fn per_loan(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError> {
        ensure_columns(&source, "pos", self.required_columns())?;

        let has_def = col("sk_dpd_def")
            .gt(lit(0.0))
            .cast(DataType::Int32)
            .alias("has_def");

        Ok(source
            .filter(applicant_filter(ids))
            .with_columns([has_def])
            .group_by([col("sk_id_curr"), col("sk_id_prev")])
            .agg([col("has_def").max().alias("has_def")]))
    }
}

impl SourceDeriver for PosDeriver {
    fn name(&self) -> &str {
        "pos"
    }

    fn required_columns(&self) -> &[&str] {
        &["sk_id_curr", "sk_id_prev", "sk_dpd_def"]
    }

    fn derive(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError> {
        let per_applicant = self
            .per_loan(source, ids)?
            .group_by([col("sk_id_curr")])
            .agg([col("has_def").max().alias("pos_def_flag")]);
        Ok(per_applicant)
    }
}
