//! Applicant feature merge.
//!
//! Left-joins the per-source aggregate tables onto the applicant base in a
//! fixed order. Applicants absent from a source keep nulls for that
//! source's columns. Row fan-out and duplicate columns are hard failures.

use crate::error::{PipelineError, Result};
use crate::ID_COL;
use log::debug;
use polars::prelude::*;
use std::collections::HashSet;

/// Per-source aggregate frames entering the merge. Every frame carries
/// `sk_id_curr` plus its feature columns, one row per applicant.
#[derive(Debug, Clone, Default)]
pub struct MergeInputs {
    /// POS delinquency aggregates
    pub pos: Option<DataFrame>,
    /// Card utilization aggregates
    pub card: Option<DataFrame>,
    /// Installment delay aggregates
    pub installment: Option<DataFrame>,
    /// Prior-application aggregates
    pub previous: Option<DataFrame>,
    /// Bureau aggregates
    pub bureau: Option<DataFrame>,
}

impl MergeInputs {
    fn tables(&self) -> impl Iterator<Item = (&'static str, &DataFrame)> {
        [
            ("pos", self.pos.as_ref()),
            ("card", self.card.as_ref()),
            ("installment", self.installment.as_ref()),
            ("previous", self.previous.as_ref()),
            ("bureau", self.bureau.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, df)| df.map(|df| (name, df)))
    }
}

/// Merges per-source aggregates into exactly one row per applicant.
#[derive(Debug, Default)]
pub struct ApplicantFeatureMerger;

impl ApplicantFeatureMerger {
    /// Join `inputs` onto `base` and enforce the row and column invariants.
    ///
    /// `base` is the applicant-level application frame, one row per
    /// applicant. Returns the merged frame in base order.
    pub fn merge(&self, base: DataFrame, inputs: &MergeInputs) -> Result<DataFrame> {
        let base_schema = base.schema();
        if !base_schema.contains(ID_COL) {
            return Err(PipelineError::MissingColumn {
                column: ID_COL.to_string(),
            });
        }

        // Column uniqueness must hold across all inputs before any join;
        // polars would silently suffix collisions otherwise.
        let mut seen: HashSet<String> = base_schema
            .iter_names()
            .map(|name| name.to_string())
            .collect();
        for (name, table) in inputs.tables() {
            if !table.schema().contains(ID_COL) {
                return Err(PipelineError::MissingColumn {
                    column: ID_COL.to_string(),
                });
            }
            for column in table.schema().iter_names() {
                if column.as_str() == ID_COL {
                    continue;
                }
                if !seen.insert(column.to_string()) {
                    return Err(PipelineError::DuplicateColumn {
                        column: column.to_string(),
                    });
                }
            }
            debug!("merging {} columns from '{name}'", table.width() - 1);
        }

        let mut merged = base.lazy();
        for (_, table) in inputs.tables() {
            merged = merged.join(
                table.clone().lazy(),
                [col(ID_COL)],
                [col(ID_COL)],
                JoinArgs::new(JoinType::Left),
            );
        }
        let merged = merged.collect()?;

        let applicants = merged.column(ID_COL)?.n_unique()?;
        if merged.height() != applicants {
            return Err(PipelineError::RowFanOut {
                rows: merged.height(),
                applicants,
            });
        }

        Ok(merged)
    }
}
