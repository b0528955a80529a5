//! Application deriver.
//!
//! Applicant-level fields from the application table itself: sentinel
//! scrubbing, age and employment ratios, log-amount transforms, external
//! score blends, and document counts. The table is already one row per
//! applicant, so no aggregation happens here.

use crate::{DeriveError, IdSet, SourceDeriver, applicant_filter, ensure_columns, safe_ratio};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for the application deriver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Placeholder value in `days_*` columns meaning "not applicable"
    /// (default: 365243).
    pub days_sentinel: i64,
    /// Upper clip on the social-circle default count (default: 5).
    pub social_circle_clip: f64,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            days_sentinel: 365_243,
            social_circle_clip: 5.0,
        }
    }
}

/// Raw categorical fields passed through after sentinel scrubbing.
const CATEGORICAL_PASSTHROUGH: [&str; 8] = [
    "own_car_age",
    "code_gender",
    "name_family_status",
    "region_rating_client_w_city",
    "organization_type",
    "name_income_type",
    "occupation_type",
    "name_education_type",
];

/// Raw numeric fields kept next to their derived forms.
const NUMERIC_PASSTHROUGH: [&str; 10] = [
    "days_birth",
    "days_id_publish",
    "days_employed",
    "days_last_phone_change",
    "amt_credit",
    "amt_annuity",
    "amt_goods_price",
    "ext_source_1",
    "ext_source_2",
    "ext_source_3",
];

/// Derives applicant-level features from the application table.
#[derive(Debug, Default)]
pub struct ApplicationDeriver {
    config: ApplicationConfig,
}

impl ApplicationDeriver {
    /// Deriver with custom configuration.
    pub const fn with_config(config: ApplicationConfig) -> Self {
        Self { config }
    }

    fn log1p_amount(name: &str) -> Expr {
        when(col(name).lt(lit(0.0)))
            .then(lit(0.0))
            .otherwise(col(name))
            .log1p()
            .alias(format!("app_{name}_log"))
    }
}

impl SourceDeriver for ApplicationDeriver {
    fn name(&self) -> &str {
        "application"
    }

    fn required_columns(&self) -> &[&str] {
        &[
            "sk_id_curr",
            "days_birth",
            "days_employed",
            "amt_credit",
            "amt_annuity",
            "amt_goods_price",
            "amt_income_total",
            "ext_source_1",
            "ext_source_2",
            "ext_source_3",
            "def_30_cnt_social_circle",
        ]
    }

    fn derive(&self, source: LazyFrame, ids: &IdSet) -> Result<LazyFrame, DeriveError> {
        ensure_columns(&source, "application", self.required_columns())?;
        let schema = source.clone().collect_schema()?;

        // 365243 in any days_ column means "not applicable", most commonly
        // days_employed for pensioners.
        let scrub_days: Vec<Expr> = schema
            .iter()
            .filter(|(name, _)| name.starts_with("days_"))
            .map(|(name, _)| {
                when(col(name.as_str()).eq(lit(self.config.days_sentinel)))
                    .then(lit(NULL))
                    .otherwise(col(name.as_str()))
                    .alias(name.as_str())
            })
            .collect();

        // XNA / XAP are this vendor's "no answer" markers.
        let sentinel_values = Series::new("sentinels".into(), ["XNA", "xna", "XAP", "xap"]);
        let scrub_categoricals: Vec<Expr> = schema
            .iter()
            .filter(|(_, dtype)| matches!(dtype, DataType::String))
            .map(|(name, _)| {
                when(col(name.as_str()).is_in(lit(sentinel_values.clone())))
                    .then(lit(NULL))
                    .otherwise(col(name.as_str()))
                    .alias(name.as_str())
            })
            .collect();

        let age = ((col("days_birth").cast(DataType::Float64) * lit(-1.0)) / lit(365.0))
            .round(1)
            .alias("app_age_years");
        let years_employed = ((col("days_employed").cast(DataType::Float64) * lit(-1.0))
            / lit(365.0))
        .alias("app_years_employed");
        let stability = safe_ratio(col("app_years_employed"), col("app_age_years"))
            .alias("app_employment_stability_ratio");

        let doc_count = schema
            .iter()
            .filter(|(name, _)| name.starts_with("flag_document_"))
            .map(|(name, _)| col(name.as_str()).cast(DataType::Int32))
            .reduce(|acc, expr| acc + expr)
            .unwrap_or_else(|| lit(0i32))
            .alias("app_n_documents");

        let annuity_income =
            safe_ratio(col("amt_annuity"), col("amt_income_total")).alias("app_annuity_income_ratio");
        let payment_rate = safe_ratio(col("amt_annuity"), col("amt_credit")).alias("app_payment_rate");

        let ext_min = min_horizontal([
            col("ext_source_1"),
            col("ext_source_2"),
            col("ext_source_3"),
        ])?
        .alias("app_ext_source_min");
        let ext_weighted = (lit(0.5) * col("ext_source_1")
            + lit(0.3) * col("ext_source_2")
            + lit(0.2) * col("ext_source_3"))
        .alias("app_ext_source_weighted");

        let social_clipped = when(
            col("def_30_cnt_social_circle").gt(lit(self.config.social_circle_clip)),
        )
        .then(lit(self.config.social_circle_clip))
        .otherwise(col("def_30_cnt_social_circle"))
        .alias("app_def_30_cnt_social_circle_clipped");

        let mut keep: Vec<Expr> = vec![col("sk_id_curr")];
        for name in NUMERIC_PASSTHROUGH {
            if schema.contains(name) {
                keep.push(col(name));
            }
        }
        keep.extend([
            col("app_age_years"),
            col("app_years_employed"),
            col("app_employment_stability_ratio"),
            col("app_amt_credit_log"),
            col("app_amt_annuity_log"),
            col("app_amt_goods_price_log"),
            col("app_annuity_income_ratio"),
            col("app_payment_rate"),
            col("app_ext_source_min"),
            col("app_ext_source_weighted"),
            col("app_n_documents"),
            col("app_def_30_cnt_social_circle_clipped"),
        ]);
        if schema.contains("flag_document_3") {
            keep.push(col("flag_document_3"));
        }
        for name in CATEGORICAL_PASSTHROUGH {
            if schema.contains(name) {
                keep.push(col(name));
            }
        }

        let derived = source
            .filter(applicant_filter(ids))
            .with_columns(scrub_days)
            .with_columns(scrub_categoricals)
            .with_columns([age, years_employed])
            .with_columns([
                stability,
                Self::log1p_amount("amt_credit"),
                Self::log1p_amount("amt_annuity"),
                Self::log1p_amount("amt_goods_price"),
                annuity_income,
                payment_rate,
                ext_min,
                ext_weighted,
                doc_count,
                social_clipped,
            ])
            .select(keep);

        Ok(derived)
    }
}
