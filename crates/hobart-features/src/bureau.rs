//! Bureau deriver.
//!
//! Joins external bureau loans with their monthly balance history and
//! produces applicant-level counts, a corrected total debt, and recency
//! fields. The balance history is cleaned first: one worst status per
//! month, and reporting noise after a loan closes is dropped.

use crate::{DeriveError, IdSet, SourceDeriver, applicant_filter, ensure_columns};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for the bureau deriver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BureauConfig {
    /// Closed loans whose factual end date is older than this many days
    /// (negative, relative to application) are excluded (default: -3000).
    pub stale_closed_days: f64,
}

impl Default for BureauConfig {
    fn default() -> Self {
        Self {
            stale_closed_days: -3000.0,
        }
    }
}

/// Columns the monthly balance table must provide.
const BALANCE_COLUMNS: [&str; 3] = ["sk_id_bureau", "months_balance", "status"];

/// Derives bureau features. Holds the monthly balance table; the raw bureau
/// table arrives through [`SourceDeriver::derive`].
#[derive(Debug)]
pub struct BureauDeriver {
    balance: DataFrame,
    config: BureauConfig,
}

impl BureauDeriver {
    /// Deriver over the given monthly balance table.
    pub fn new(balance: DataFrame) -> Self {
        Self {
            balance,
            config: BureauConfig::default(),
        }
    }

    /// Deriver with custom configuration.
    pub const fn with_config(balance: DataFrame, config: BureauConfig) -> Self {
        Self { balance, config }
    }

    /// Cleaned balance history aggregated per bureau loan.
    ///
    /// Months are first collapsed to their worst delinquency status. Months
    /// after the first closure marker that still carry a numeric status and
    /// no closure marker of their own are reporting noise and are dropped.
    /// A post-closure month carrying both a numeric status and a closure
    /// re-assertion is kept, so `cnt_months` includes such months even
    /// though a strict worst-status ranking would discard them.
    /// Output: `sk_id_bureau`, `cnt_months`.
    pub fn balance_months(&self, bureau: LazyFrame) -> Result<LazyFrame, DeriveError> {
        let balance = self.balance.clone().lazy();
        ensure_columns(&balance, "bureau_balance", &BALANCE_COLUMNS)?;

        // DPD buckets 1..5 order by severity; X (unknown), C (closed) and
        // 0 (current) all rank below them.
        let severity = when(col("status").eq(lit("5")))
            .then(lit(5))
            .when(col("status").eq(lit("4")))
            .then(lit(4))
            .when(col("status").eq(lit("3")))
            .then(lit(3))
            .when(col("status").eq(lit("2")))
            .then(lit(2))
            .when(col("status").eq(lit("1")))
            .then(lit(1))
            .otherwise(lit(0))
            .cast(DataType::Int32)
            .alias("severity");

        let numeric_statuses = Series::new("status".into(), ["0", "1", "2", "3", "4", "5"]);
        let is_numeric = col("status")
            .is_in(lit(numeric_statuses))
            .alias("is_numeric");
        let is_closed = col("status").eq(lit("C")).alias("is_closed");

        let monthly = balance
            // Only loans of the target applicants matter.
            .join(
                bureau.select([col("sk_id_bureau")]),
                [col("sk_id_bureau")],
                [col("sk_id_bureau")],
                JoinArgs::new(JoinType::Semi),
            )
            .with_columns([severity, is_numeric, is_closed])
            .group_by([col("sk_id_bureau"), col("months_balance")])
            .agg([
                col("severity").max().alias("severity"),
                col("is_numeric").any(true).alias("has_numeric"),
                col("is_closed").any(true).alias("has_closure"),
            ]);

        let first_closure = monthly
            .clone()
            .filter(col("has_closure"))
            .group_by([col("sk_id_bureau")])
            .agg([col("months_balance").min().alias("first_closure_month")]);

        let cleaned = monthly
            .join(
                first_closure,
                [col("sk_id_bureau")],
                [col("sk_id_bureau")],
                JoinArgs::new(JoinType::Left),
            )
            .filter(
                // Post-closure months drop only when they are pure numeric
                // noise; months that re-assert the closure survive.
                col("first_closure_month")
                    .is_not_null()
                    .and(col("months_balance").gt(col("first_closure_month")))
                    .and(col("has_numeric"))
                    .and(col("has_closure").not())
                    .not(),
            );

        Ok(cleaned
            .group_by([col("sk_id_bureau")])
            .agg([col("months_balance").count().alias("cnt_months")]))
    }
}

impl SourceDeriver for BureauDeriver {
    fn name(&self) -> &str {
        "bureau"
    }

    fn required_columns(&self) -> &[&str] {
        &[
            "sk_id_curr",
            "sk_id_bureau",
            "credit_active",
            "amt_credit_sum",
            "amt_credit_sum_debt",
            "days_credit_enddate",
            "days_enddate_fact",
            "days_credit_update",
        ]
    }

    fn derive(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError> {
        ensure_columns(&source, "bureau", self.required_columns())?;

        let filtered = source.filter(applicant_filter(ids));
        let months = self.balance_months(filtered.clone())?;

        // Reported debt above the loan amount is a data defect; flag it,
        // and cap the value used for totals at the loan amount.
        let over_limit = col("amt_credit_sum_debt")
            .gt(col("amt_credit_sum"))
            .fill_null(lit(false))
            .cast(DataType::Int32)
            .alias("over_limit_debt_flag");

        let debt_nonneg = when(col("amt_credit_sum_debt").lt(lit(0.0)))
            .then(lit(0.0))
            .otherwise(col("amt_credit_sum_debt"));
        let debt_for_ratio = when(
            debt_nonneg
                .clone()
                .gt(col("amt_credit_sum"))
                .and(col("amt_credit_sum").gt(lit(0.0))),
        )
        .then(col("amt_credit_sum"))
        .otherwise(debt_nonneg)
        .alias("debt_for_ratio");

        // Loans closed long before the application carry no signal.
        let stale_closed = col("credit_active")
            .eq(lit("Closed"))
            .and(col("days_enddate_fact").lt(lit(self.config.stale_closed_days)))
            .fill_null(lit(false));

        let enddate_diff =
            (col("days_enddate_fact") - col("days_credit_enddate")).alias("enddate_diff");

        let enriched = filtered
            .with_columns([over_limit, debt_for_ratio, enddate_diff])
            .filter(stale_closed.not())
            .join(
                months,
                [col("sk_id_bureau")],
                [col("sk_id_bureau")],
                JoinArgs::new(JoinType::Left),
            );

        let per_applicant = enriched.group_by([col("sk_id_curr")]).agg([
            col("credit_active")
                .eq(lit("Active"))
                .cast(DataType::Int32)
                .sum()
                .alias("bu_cnt_active"),
            col("credit_active")
                .eq(lit("Closed"))
                .cast(DataType::Int32)
                .sum()
                .alias("bu_cnt_closed"),
            (col("credit_active")
                .eq(lit("Active"))
                .cast(DataType::Float64)
                .sum()
                / col("sk_id_bureau").count().cast(DataType::Float64))
            .alias("bu_ratio_active_loans"),
            col("debt_for_ratio").sum().alias("bu_total_debt_for_ratio"),
            col("over_limit_debt_flag")
                .max()
                .alias("bu_any_over_limit_debt"),
            col("cnt_months").sum().alias("bu_total_balance_months"),
            col("enddate_diff").mean().alias("bu_enddate_diff_avg"),
            col("days_credit_update")
                .max()
                .alias("bu_days_credit_update_max"),
        ]);

        Ok(per_applicant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ids;
    use approx::assert_relative_eq;

    fn balance() -> DataFrame {
        df!(
            // Loan 100: closes at month -3, then numeric noise at -2 and a
            // month -1 that re-asserts the closure alongside a numeric
            // status.
            "sk_id_bureau" => [100i64, 100, 100, 100, 100, 200, 200],
            "months_balance" => [-4i64, -3, -2, -1, -1, -2, -1],
            "status" => ["1", "C", "0", "C", "0", "0", "0"],
        )
        .unwrap()
    }

    fn bureau() -> DataFrame {
        df!(
            "sk_id_curr" => [1i64, 1, 2],
            "sk_id_bureau" => [100i64, 200, 300],
            "credit_active" => ["Closed", "Active", "Active"],
            "amt_credit_sum" => [100_000.0, 50_000.0, 80_000.0],
            "amt_credit_sum_debt" => [0.0, 150_000.0, -500.0],
            "days_credit_enddate" => [-400.0, 200.0, 300.0],
            "days_enddate_fact" => [Some(-350.0), None, None],
            "days_credit_update" => [-30.0, -5.0, -10.0],
        )
        .unwrap()
    }

    #[test]
    fn post_closure_numeric_noise_is_dropped() {
        let deriver = BureauDeriver::new(balance());
        let out = deriver
            .balance_months(bureau().lazy().filter(applicant_filter(&ids(&[1]))))
            .unwrap()
            .collect()
            .unwrap()
            .sort(["sk_id_bureau"], Default::default())
            .unwrap();

        let months = out.column("cnt_months").unwrap().u32().unwrap();
        // Loan 100: months -4, -3, -1 survive; -2 is pure numeric noise
        // after the closure at -3, while -1 re-asserts the closure next to
        // a numeric status and is kept. Loan 200: both months survive.
        assert_eq!(months.get(0), Some(3));
        assert_eq!(months.get(1), Some(2));
    }

    #[test]
    fn debt_is_capped_and_flagged() {
        let deriver = BureauDeriver::new(balance());
        let out = deriver
            .derive(bureau().lazy(), &ids(&[1]))
            .unwrap()
            .collect()
            .unwrap();

        assert_eq!(out.height(), 1);
        // Loan 200 reports 150k debt on a 50k loan: flagged, capped to 50k.
        let total = out
            .column("bu_total_debt_for_ratio")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert_relative_eq!(total, 50_000.0, epsilon = 1e-9);
        assert_eq!(
            out.column("bu_any_over_limit_debt")
                .unwrap()
                .i32()
                .unwrap()
                .get(0),
            Some(1)
        );
    }

    #[test]
    fn negative_debt_contributes_zero() {
        let deriver = BureauDeriver::new(balance());
        let out = deriver
            .derive(bureau().lazy(), &ids(&[2]))
            .unwrap()
            .collect()
            .unwrap();
        let total = out
            .column("bu_total_debt_for_ratio")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert_relative_eq!(total, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn stale_closed_loans_are_excluded() {
        let bureau = df!(
            "sk_id_curr" => [1i64, 1],
            "sk_id_bureau" => [100i64, 200],
            "credit_active" => ["Closed", "Active"],
            "amt_credit_sum" => [100_000.0, 50_000.0],
            "amt_credit_sum_debt" => [0.0, 10_000.0],
            "days_credit_enddate" => [-4100.0, 200.0],
            "days_enddate_fact" => [Some(-4000.0), None],
            "days_credit_update" => [-3900.0, -5.0],
        )
        .unwrap();
        let out = BureauDeriver::new(balance())
            .derive(bureau.lazy(), &ids(&[1]))
            .unwrap()
            .collect()
            .unwrap();

        let active = out.column("bu_cnt_active").unwrap().i32().unwrap();
        let closed = out.column("bu_cnt_closed").unwrap().i32().unwrap();
        assert_eq!(active.get(0), Some(1));
        assert_eq!(closed.get(0), Some(0));
        let ratio = out
            .column("bu_ratio_active_loans")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert_relative_eq!(ratio, 1.0, epsilon = 1e-12);
    }
}
