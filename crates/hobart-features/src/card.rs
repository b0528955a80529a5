//! Revolving-card deriver.
//!
//! Computes monthly utilization per card loan and aggregates it to
//! applicant grain. Utilization distinguishes "no reported limit" (sentinel
//! -1) from "0% used", and only statement months strictly before loan
//! origination survive (point-in-time filter).

use crate::{DeriveError, IdSet, SourceDeriver, applicant_filter, ensure_columns};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for the card deriver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardConfig {
    /// Upper clip on utilization for active accounts (default: 2.0).
    pub utilization_clip_max: f64,
    /// Statement months at or after this relative month are discarded
    /// (default: 0, i.e. strictly before origination).
    pub cutoff_month: i64,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            utilization_clip_max: 2.0,
            cutoff_month: 0,
        }
    }
}

/// Derives utilization and over-limit features from card statements.
#[derive(Debug, Default)]
pub struct CardDeriver {
    config: CardConfig,
}

impl CardDeriver {
    /// Deriver with custom configuration.
    pub const fn with_config(config: CardConfig) -> Self {
        Self { config }
    }

    /// Row-level monthly utilization, before point-in-time filtering.
    ///
    /// Adds `utilization` (clipped, -1 sentinel for months with no
    /// reported limit), `over_limit_flag`, and `active_utilization`
    /// (null where the sentinel applies).
    pub fn monthly(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError> {
        ensure_columns(&source, "card", self.required_columns())?;

        // Zero reported limit means "no limit on file", not a free card.
        let credit_limit = when(col("amt_credit_limit_actual").gt(lit(0.0)))
            .then(col("amt_credit_limit_actual"))
            .otherwise(lit(NULL));

        // Negative balance is an overpayment; it cannot produce negative
        // utilization.
        let balance_clean = when(col("amt_balance").lt(lit(0.0)))
            .then(lit(0.0))
            .otherwise(col("amt_balance"));

        // -1 marks "no limit reported" so it never collides with 0% used.
        let utilization = (balance_clean / credit_limit)
            .fill_null(lit(-1.0))
            .alias("utilization");

        // Extreme values are clipped for active accounts only; the -1
        // sentinel must survive untouched.
        let clipped = when(
            col("utilization")
                .gt_eq(lit(0.0))
                .and(col("utilization").gt(lit(self.config.utilization_clip_max))),
        )
        .then(lit(self.config.utilization_clip_max))
        .otherwise(col("utilization"))
        .alias("utilization");

        let over_limit = col("utilization")
            .gt(lit(1.0))
            .and(col("utilization").gt_eq(lit(0.0)))
            .cast(DataType::Int32)
            .alias("over_limit_flag");

        let active_utilization = when(col("utilization").gt_eq(lit(0.0)))
            .then(col("utilization"))
            .otherwise(lit(NULL))
            .alias("active_utilization");

        Ok(source
            .filter(applicant_filter(ids))
            .with_columns([utilization])
            .with_columns([clipped])
            .with_columns([over_limit, active_utilization]))
    }

    /// Per-loan utilization aggregates, point-in-time filtered.
    ///
    /// One row per (applicant, loan): mean/max utilization over active
    /// months and the count of over-limit months.
    pub fn per_loan(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError> {
        let per_loan = self
            .monthly(source, ids)?
            // Point-in-time guard: no statement on or after origination.
            .filter(col("months_balance").lt(lit(self.config.cutoff_month)))
            .group_by([col("sk_id_curr"), col("sk_id_prev")])
            .agg([
                col("active_utilization")
                    .mean()
                    .alias("cc_utilization_mean"),
                col("active_utilization").max().alias("cc_utilization_max"),
                col("over_limit_flag").sum().alias("cc_cnt_over_limit"),
            ]);

        Ok(per_loan)
    }
}

impl SourceDeriver for CardDeriver {
    fn name(&self) -> &str {
        "card"
    }

    fn required_columns(&self) -> &[&str] {
        &[
            "sk_id_curr",
            "sk_id_prev",
            "months_balance",
            "amt_balance",
            "amt_credit_limit_actual",
        ]
    }

    fn derive(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError> {
        let per_applicant = self
            .per_loan(source, ids)?
            .group_by([col("sk_id_curr")])
            .agg([
                col("cc_utilization_mean").mean().alias("cc_util_mean"),
                col("cc_utilization_max").max().alias("cc_util_max"),
                col("cc_cnt_over_limit").sum().alias("cc_over_limit"),
            ]);
        Ok(per_applicant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ids;
    use approx::assert_relative_eq;

    fn statements() -> DataFrame {
        df!(
            "sk_id_curr" => [1i64, 1, 1, 1, 2, 2],
            "sk_id_prev" => [10i64, 10, 10, 10, 20, 20],
            "months_balance" => [-3i64, -2, -1, 0, -2, -1],
            "amt_balance" => [50.0, 150.0, 300.0, 500.0, 40.0, 80.0],
            "amt_credit_limit_actual" => [100.0, 100.0, 100.0, 100.0, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn zero_limit_yields_sentinel_not_zero() {
        let deriver = CardDeriver::default();
        let monthly = deriver
            .monthly(statements().lazy(), &ids(&[2]))
            .unwrap()
            .collect()
            .unwrap();

        // Every statement of applicant 2 reports limit 0: the raw ratio
        // must never leak through as 0 or NaN.
        let utilization = monthly.column("utilization").unwrap().f64().unwrap();
        assert_eq!(utilization.len(), 2);
        for value in utilization.into_no_null_iter() {
            assert_relative_eq!(value, -1.0, epsilon = 1e-12);
        }

        let out = deriver
            .per_loan(statements().lazy(), &ids(&[2]))
            .unwrap()
            .collect()
            .unwrap();
        // The active-only mean is null and no month counts as over-limit.
        assert!(
            out.column("cc_utilization_mean")
                .unwrap()
                .f64()
                .unwrap()
                .get(0)
                .is_none()
        );
        assert_eq!(
            out.column("cc_cnt_over_limit").unwrap().i32().unwrap().get(0),
            Some(0)
        );
    }

    #[test]
    fn point_in_time_filter_drops_origination_month() {
        let deriver = CardDeriver::default();
        let out = deriver
            .per_loan(statements().lazy(), &ids(&[1]))
            .unwrap()
            .collect()
            .unwrap();

        // months -3/-2/-1 survive: utilization 0.5, 1.5, 2.0 (clipped from
        // 3.0). The month-0 row (util 5.0) must not contribute.
        let mean = out
            .column("cc_utilization_mean")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert_relative_eq!(mean, (0.5 + 1.5 + 2.0) / 3.0, epsilon = 1e-12);

        let max = out
            .column("cc_utilization_max")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert_relative_eq!(max, 2.0, epsilon = 1e-12);

        // Over-limit months before origination: -2 (1.5) and -1 (2.0).
        assert_eq!(
            out.column("cc_cnt_over_limit").unwrap().i32().unwrap().get(0),
            Some(2)
        );
    }

    #[test]
    fn applicant_rollup_produces_one_row_per_applicant() {
        let deriver = CardDeriver::default();
        let out = deriver
            .derive(statements().lazy(), &ids(&[1, 2]))
            .unwrap()
            .collect()
            .unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let df = df!(
            "sk_id_curr" => [1i64],
            "months_balance" => [-1i64],
        )
        .unwrap();
        let err = CardDeriver::default()
            .derive(df.lazy(), &ids(&[1]))
            .err()
            .unwrap();
        assert!(matches!(err, DeriveError::MissingColumn { .. }));
    }
}
