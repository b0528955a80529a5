//! Installment-schedule deriver.
//!
//! Payment delay per installment, collapsed to the worst outcome when an
//! installment was paid in several parts, then aggregated to delay rate and
//! mean delay magnitude per loan and per applicant.

use crate::{DeriveError, IdSet, SourceDeriver, applicant_filter, ensure_columns, safe_ratio};
use polars::prelude::*;

/// Derives payment-delay features from installment schedules.
#[derive(Debug, Default)]
pub struct InstallmentDeriver;

impl InstallmentDeriver {
    /// Per-loan delay aggregates.
    ///
    /// One row per (applicant, loan): share of delayed installments and the
    /// mean delay in days among the delayed ones.
    pub fn per_loan(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError> {
        ensure_columns(&source, "installment", self.required_columns())?;

        let delay = (col("days_entry_payment") - col("days_instalment")).alias("payment_delay");
        let is_delayed = col("payment_delay")
            .gt(lit(0.0))
            .cast(DataType::Int32)
            .alias("is_delayed");
        // Delay magnitude only exists for delayed installments; on-time
        // rows must not drag the mean toward zero.
        let delay_value = when(col("payment_delay").gt(lit(0.0)))
            .then(col("payment_delay"))
            .otherwise(lit(NULL))
            .alias("delay_days");

        let per_installment = source
            .filter(applicant_filter(ids))
            .with_columns([delay])
            .with_columns([is_delayed, delay_value])
            // Partial payments: several rows per installment number. The
            // installment counts as delayed if any part was, with the
            // worst delay.
            .group_by([
                col("sk_id_curr"),
                col("sk_id_prev"),
                col("num_instalment_number"),
            ])
            .agg([
                col("is_delayed").max().alias("is_delayed"),
                col("delay_days").max().alias("delay_days"),
            ]);

        let per_loan = per_installment
            .group_by([col("sk_id_curr"), col("sk_id_prev")])
            .agg([
                col("is_delayed").sum().alias("delay_cnt"),
                col("is_delayed").count().alias("total_cnt"),
                col("delay_days").mean().alias("delay_days_mean"),
            ])
            .with_columns([safe_ratio(
                col("delay_cnt").cast(DataType::Float64),
                col("total_cnt").cast(DataType::Float64),
            )
            .alias("delay_rate")])
            .select([
                col("sk_id_curr"),
                col("sk_id_prev"),
                col("delay_rate"),
                col("delay_days_mean"),
            ]);

        Ok(per_loan)
    }
}

impl SourceDeriver for InstallmentDeriver {
    fn name(&self) -> &str {
        "installment"
    }

    fn required_columns(&self) -> &[&str] {
        &[
            "sk_id_curr",
            "sk_id_prev",
            "num_instalment_number",
            "days_instalment",
            "days_entry_payment",
        ]
    }

    fn derive(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError> {
        let per_applicant = self
            .per_loan(source, ids)?
            .group_by([col("sk_id_curr")])
            .agg([
                col("delay_rate").mean().alias("inst_delay_rate"),
                col("delay_days_mean").mean().alias("inst_delay_days_mean"),
            ]);
        Ok(per_applicant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ids;
    use approx::assert_relative_eq;

    fn schedule() -> DataFrame {
        df!(
            // Installment 1 of loan 10 was paid in two parts: one on time,
            // one 4 days late. It must count once, as delayed by 4.
            "sk_id_curr" => [1i64, 1, 1, 1],
            "sk_id_prev" => [10i64, 10, 10, 10],
            "num_instalment_number" => [1i64, 1, 2, 3],
            "days_instalment" => [-30.0, -30.0, -20.0, -10.0],
            "days_entry_payment" => [-30.0, -26.0, -22.0, -10.0],
        )
        .unwrap()
    }

    #[test]
    fn partial_payments_collapse_to_worst_delay() {
        let out = InstallmentDeriver
            .per_loan(schedule().lazy(), &ids(&[1]))
            .unwrap()
            .collect()
            .unwrap();

        assert_eq!(out.height(), 1);
        // Three distinct installments, one delayed.
        let rate = out.column("delay_rate").unwrap().f64().unwrap().get(0).unwrap();
        assert_relative_eq!(rate, 1.0 / 3.0, epsilon = 1e-12);
        // Mean delay among delayed installments only: 4 days.
        let mean = out
            .column("delay_days_mean")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert_relative_eq!(mean, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn applicant_rollup_averages_across_loans() {
        let df = df!(
            "sk_id_curr" => [1i64, 1],
            "sk_id_prev" => [10i64, 11],
            "num_instalment_number" => [1i64, 1],
            "days_instalment" => [-30.0, -30.0],
            "days_entry_payment" => [-28.0, -30.0],
        )
        .unwrap();
        let out = InstallmentDeriver
            .derive(df.lazy(), &ids(&[1]))
            .unwrap()
            .collect()
            .unwrap();

        assert_eq!(out.height(), 1);
        // Loan 10 fully delayed, loan 11 fully on time.
        let rate = out
            .column("inst_delay_rate")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert_relative_eq!(rate, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn missing_column_is_fatal() {
        let df = df!("sk_id_curr" => [1i64]).unwrap();
        let err = InstallmentDeriver.derive(df.lazy(), &ids(&[1])).err().unwrap();
        assert!(matches!(err, DeriveError::MissingColumn { .. }));
    }
}
