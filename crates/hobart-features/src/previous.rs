//! Prior-application deriver.
//!
//! Ratios and contract-status flags per historical application, aggregated
//! per loan and then per applicant. Status and client-type counts are
//! converted to rates against the applicant's total application count, and
//! the application weekday distribution contributes a weekend share and a
//! weekday-variety count.

use crate::{DeriveError, IdSet, SourceDeriver, applicant_filter, ensure_columns, safe_ratio};
use polars::prelude::*;

/// Derives prior-application features.
#[derive(Debug, Default)]
pub struct PreviousDeriver;

impl PreviousDeriver {
    /// Per-loan aggregates over the applicant's historical applications.
    pub fn per_loan(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError> {
        ensure_columns(&source, "previous", self.required_columns())?;

        // >1.0 means more was approved than requested (over-approval).
        let approval_ratio =
            safe_ratio(col("amt_credit"), col("amt_application")).alias("approval_ratio");
        let credit_to_goods =
            safe_ratio(col("amt_credit"), col("amt_goods_price")).alias("credit_to_goods_ratio");
        let loan_duration =
            (col("days_last_due") - col("days_first_due")).alias("loan_duration");

        let is_approved = col("name_contract_status")
            .eq(lit("Approved"))
            .cast(DataType::Int32)
            .alias("is_approved");
        let is_new = col("name_client_type")
            .eq(lit("New"))
            .cast(DataType::Int32)
            .alias("is_new");
        let is_repeater = col("name_client_type")
            .eq(lit("Repeater"))
            .cast(DataType::Int32)
            .alias("is_repeater");

        let per_loan = source
            .filter(applicant_filter(ids))
            .with_columns([
                approval_ratio,
                credit_to_goods,
                loan_duration,
                is_approved,
                is_new,
                is_repeater,
            ])
            .group_by([col("sk_id_curr"), col("sk_id_prev")])
            .agg([
                col("amt_annuity").mean().alias("pre_annuity_mean"),
                col("amt_credit").mean().alias("pre_credit_mean"),
                col("amt_credit").max().alias("pre_credit_max"),
                col("amt_credit").min().alias("pre_credit_min"),
                col("credit_to_goods_ratio")
                    .mean()
                    .alias("pre_credit_to_goods_mean"),
                col("approval_ratio").mean().alias("pre_approval_ratio"),
                col("days_decision").mean().alias("pre_days_decision_mean"),
                col("loan_duration").mean().alias("pre_loan_duration_mean"),
                col("loan_duration").max().alias("pre_loan_duration_max"),
                col("is_approved").max().alias("is_approved"),
                col("is_new").max().alias("is_new"),
                col("is_repeater").max().alias("is_repeater"),
            ]);

        Ok(per_loan)
    }

    /// Applicant-level weekday profile from the raw application rows.
    fn weekday_profile(&self, source: LazyFrame, ids: &IdSet) -> LazyFrame {
        let is_weekend = col("weekday_appr_process_start")
            .eq(lit("SATURDAY"))
            .or(col("weekday_appr_process_start").eq(lit("SUNDAY")))
            .cast(DataType::Int32)
            .alias("is_weekend");

        source
            .filter(applicant_filter(ids))
            .with_columns([is_weekend])
            .group_by([col("sk_id_curr")])
            .agg([
                col("is_weekend").mean().alias("pre_weekend_app_ratio"),
                col("weekday_appr_process_start")
                    .n_unique()
                    .cast(DataType::Int32)
                    .alias("pre_weekday_variety"),
            ])
    }
}

impl SourceDeriver for PreviousDeriver {
    fn name(&self) -> &str {
        "previous"
    }

    fn required_columns(&self) -> &[&str] {
        &[
            "sk_id_curr",
            "sk_id_prev",
            "amt_annuity",
            "amt_credit",
            "amt_application",
            "amt_goods_price",
            "days_decision",
            "days_first_due",
            "days_last_due",
            "name_contract_status",
            "name_client_type",
            "weekday_appr_process_start",
        ]
    }

    fn derive(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError> {
        let per_applicant = self
            .per_loan(source.clone(), ids)?
            .group_by([col("sk_id_curr")])
            .agg([
                col("pre_annuity_mean").mean().alias("pre_annuity_mean"),
                col("pre_credit_mean").mean().alias("pre_credit_mean"),
                col("pre_credit_max").max().alias("pre_credit_max"),
                col("pre_credit_min").min().alias("pre_credit_min"),
                col("pre_credit_to_goods_mean")
                    .mean()
                    .alias("pre_credit_to_goods_mean"),
                col("pre_approval_ratio").mean().alias("pre_approval_ratio"),
                col("pre_days_decision_mean")
                    .mean()
                    .alias("pre_days_decision_mean"),
                col("pre_loan_duration_mean")
                    .mean()
                    .alias("pre_loan_duration_mean"),
                col("pre_loan_duration_max")
                    .max()
                    .alias("pre_loan_duration_max"),
                // Absolute counts would confound "risky history" with
                // "long history"; divide by the application count.
                (col("is_approved").sum().cast(DataType::Float64)
                    / col("sk_id_prev").count().cast(DataType::Float64))
                .alias("pre_approved_cnt"),
                (col("is_new").sum().cast(DataType::Float64)
                    / col("sk_id_prev").count().cast(DataType::Float64))
                .alias("pre_new_cnt"),
                (col("is_repeater").sum().cast(DataType::Float64)
                    / col("sk_id_prev").count().cast(DataType::Float64))
                .alias("pre_repeat_cnt"),
                col("sk_id_prev")
                    .count()
                    .cast(DataType::Int32)
                    .alias("pre_application_count"),
            ]);

        let with_weekdays = per_applicant.join(
            self.weekday_profile(source, ids),
            [col("sk_id_curr")],
            [col("sk_id_curr")],
            JoinArgs::new(JoinType::Left),
        );

        Ok(with_weekdays)
    }
}
