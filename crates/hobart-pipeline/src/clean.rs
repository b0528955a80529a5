//! Feature cleaning.
//!
//! Deterministic, order-dependent transform of the merged feature matrix
//! into its model-ready form: named flag/count/days imputation, quantile
//! clipping of every unlisted numeric column (with median fill for the
//! floats), integer downcasting, and rare-category collapse for text
//! columns. The applicant-ID column is held aside and reattached unchanged.
//!
//! Clip bounds can be fitted from the batch being cleaned (parity with the
//! original batch process) or supplied from training time via
//! [`FeatureCleaner::with_bounds`]; a serving system must use the latter or
//! the bounds leak information from the scoring batch.

use crate::error::{PipelineError, Result};
use crate::ID_COL;
use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Placeholder for missing categorical values.
const MISSING_CATEGORY: &str = "MISSING";
/// Collapse target for rare or over-cardinal categories.
const OTHER_CATEGORY: &str = "OTHER";

/// Named column lists and thresholds for the cleaner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerConfig {
    /// Boolean flags: missing means "never observed", imputed 0, Int8.
    pub flag_columns: Vec<String>,
    /// Count-like columns: missing imputed 0, Int16.
    pub count_columns: Vec<String>,
    /// Days-semantic columns: missing imputed with the column median, Int16.
    pub days_columns: Vec<String>,
    /// Lower/upper empirical quantiles for numeric clipping
    /// (default: 0.001 / 0.999).
    pub clip_quantiles: (f64, f64),
    /// Categories below this frequency collapse to OTHER (default: 0.01).
    pub min_category_ratio: f64,
    /// Hard cap on distinct categories per column (default: 30).
    pub max_cardinality: usize,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            flag_columns: vec![
                "pos_def_flag".to_string(),
                "bu_any_over_limit_debt".to_string(),
            ],
            count_columns: vec![
                "app_n_documents".to_string(),
                "app_def_30_cnt_social_circle_clipped".to_string(),
                "pre_application_count".to_string(),
                "bu_cnt_active".to_string(),
                "bu_cnt_closed".to_string(),
                "cc_over_limit".to_string(),
            ],
            days_columns: vec![
                "days_birth".to_string(),
                "days_id_publish".to_string(),
                "days_employed".to_string(),
                "days_last_phone_change".to_string(),
                "own_car_age".to_string(),
                "pre_weekday_variety".to_string(),
                "pre_loan_duration_max".to_string(),
                "bu_days_credit_update_max".to_string(),
                "bu_total_balance_months".to_string(),
            ],
            clip_quantiles: (0.001, 0.999),
            min_category_ratio: 0.01,
            max_cardinality: 30,
        }
    }
}

/// Per-column clip bounds, fitted once and persistable as policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipBounds {
    bounds: BTreeMap<String, (f64, f64)>,
}

impl ClipBounds {
    /// Fit `[lower_q, upper_q]` empirical quantiles per column.
    pub fn fit(df: &DataFrame, columns: &[String], quantiles: (f64, f64)) -> Result<Self> {
        let mut bounds = BTreeMap::new();
        for name in columns {
            let column = df
                .column(name)
                .map_err(|_| PipelineError::MissingColumn {
                    column: name.clone(),
                })?;
            let ca = column
                .as_materialized_series()
                .cast(&DataType::Float64)?
                .f64()?
                .clone();
            let lower = ca.quantile(quantiles.0, QuantileMethod::Linear)?;
            let upper = ca.quantile(quantiles.1, QuantileMethod::Linear)?;
            if let (Some(lower), Some(upper)) = (lower, upper) {
                bounds.insert(name.clone(), (lower, upper));
            }
        }
        Ok(Self { bounds })
    }

    /// Bounds for one column, if fitted.
    pub fn get(&self, column: &str) -> Option<(f64, f64)> {
        self.bounds.get(column).copied()
    }

    /// Number of fitted columns.
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// True when nothing was fitted.
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

/// Cleaned matrix plus the separated applicant-ID column, in input order.
#[derive(Debug, Clone)]
pub struct CleanedMatrix {
    /// Model-ready feature columns
    pub features: DataFrame,
    /// Applicant IDs, parallel to the feature rows
    pub ids: Column,
}

/// Applies the six cleaning steps to a merged feature matrix.
#[derive(Debug, Default)]
pub struct FeatureCleaner {
    config: CleanerConfig,
    bounds: Option<ClipBounds>,
}

impl FeatureCleaner {
    /// Cleaner that fits clip bounds from each batch it cleans.
    pub fn new(config: CleanerConfig) -> Self {
        Self {
            config,
            bounds: None,
        }
    }

    /// Cleaner with clip bounds fixed at training time.
    pub fn with_bounds(config: CleanerConfig, bounds: ClipBounds) -> Self {
        Self {
            config,
            bounds: Some(bounds),
        }
    }

    /// Columns treated by the generic numeric step.
    fn clip_columns(&self, df: &DataFrame) -> Vec<String> {
        let named: HashSet<&str> = self
            .config
            .flag_columns
            .iter()
            .chain(&self.config.count_columns)
            .chain(&self.config.days_columns)
            .map(String::as_str)
            .collect();
        df.get_columns()
            .iter()
            .filter(|c| c.name() != ID_COL)
            .filter(|c| c.dtype().is_float() || c.dtype().is_integer())
            .filter(|c| !named.contains(c.name().as_str()))
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Clean `df`, returning the matrix and the separated ID column.
    pub fn clean(&self, df: &DataFrame) -> Result<CleanedMatrix> {
        let ids = df
            .column(ID_COL)
            .map_err(|_| PipelineError::MissingColumn {
                column: ID_COL.to_string(),
            })?
            .clone();

        let bounds = match &self.bounds {
            Some(bounds) => bounds.clone(),
            None => {
                debug!("fitting clip bounds from the scoring batch");
                ClipBounds::fit(df, &self.clip_columns(df), self.config.clip_quantiles)?
            }
        };

        let mut columns = Vec::with_capacity(df.width() - 1);
        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == ID_COL {
                continue;
            }
            let cleaned = if self.config.flag_columns.iter().any(|c| c == name) {
                self.zero_fill(column, &DataType::Int8)?
            } else if self.config.count_columns.iter().any(|c| c == name) {
                self.zero_fill(column, &DataType::Int16)?
            } else if self.config.days_columns.iter().any(|c| c == name) {
                self.median_fill(column)?.cast(&DataType::Int16)?
            } else if column.dtype().is_float() {
                let filled = self.median_fill(column)?;
                self.clip(&filled, bounds.get(name))?
                    .cast(&DataType::Float32)?
            } else if column.dtype().is_integer() {
                let clipped = Self::clip_integer(column, bounds.get(name))?;
                Self::downcast_integer(&clipped)?
            } else if column.dtype() == &DataType::String {
                self.collapse_categories(column)?
            } else {
                column.clone()
            };
            columns.push(cleaned);
        }

        Ok(CleanedMatrix {
            features: DataFrame::new(columns)?,
            ids,
        })
    }

    fn zero_fill(&self, column: &Column, dtype: &DataType) -> Result<Column> {
        Ok(column
            .as_materialized_series()
            .fill_null(FillNullStrategy::Zero)?
            .cast(dtype)?
            .into_column())
    }

    fn median_fill(&self, column: &Column) -> Result<Column> {
        let ca = column
            .as_materialized_series()
            .cast(&DataType::Float64)?
            .f64()?
            .clone();
        let filled = match ca.median() {
            Some(median) => ca.apply(|v| v.or(Some(median))),
            // All-null column: nothing to impute from.
            None => ca,
        };
        Ok(filled.into_column())
    }

    fn clip(&self, column: &Column, bounds: Option<(f64, f64)>) -> Result<Column> {
        let Some((lower, upper)) = bounds else {
            return Ok(column.clone());
        };
        let ca = column.as_materialized_series().f64()?.clone();
        Ok(ca.apply(|v| v.map(|x| x.clamp(lower, upper))).into_column())
    }

    /// Quantile clipping for integer passthrough columns. Values round back
    /// to whole numbers after clamping so 0/1 flags survive intact; nulls
    /// pass through unfilled.
    fn clip_integer(column: &Column, bounds: Option<(f64, f64)>) -> Result<Column> {
        let Some((lower, upper)) = bounds else {
            return Ok(column.clone());
        };
        let ca = column
            .as_materialized_series()
            .cast(&DataType::Float64)?
            .f64()?
            .clone();
        Ok(ca
            .apply(|v| v.map(|x| x.clamp(lower, upper).round()))
            .into_series()
            .cast(&DataType::Int64)?
            .into_column())
    }

    fn downcast_integer(column: &Column) -> Result<Column> {
        let wide = column.as_materialized_series().cast(&DataType::Int64)?;
        let ca = wide.i64()?;
        let (Some(min), Some(max)) = (ca.min(), ca.max()) else {
            return Ok(column.clone());
        };
        let dtype = if min >= i64::from(i8::MIN) && max <= i64::from(i8::MAX) {
            DataType::Int8
        } else if min >= i64::from(i16::MIN) && max <= i64::from(i16::MAX) {
            DataType::Int16
        } else if min >= i64::from(i32::MIN) && max <= i64::from(i32::MAX) {
            DataType::Int32
        } else {
            DataType::Int64
        };
        Ok(wide.cast(&dtype)?.into_column())
    }

    fn collapse_categories(&self, column: &Column) -> Result<Column> {
        let series = column.as_materialized_series();
        let ca = series.str()?;
        let total = ca.len() as f64;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for value in ca {
            *counts.entry(value.unwrap_or(MISSING_CATEGORY)).or_insert(0) += 1;
        }

        let rare: HashSet<&str> = counts
            .iter()
            .filter(|&(_, &count)| (count as f64 / total) < self.config.min_category_ratio)
            .map(|(value, _)| *value)
            .collect();

        let mut collapsed: HashMap<&str, usize> = HashMap::new();
        for (value, count) in &counts {
            let key = if rare.contains(value) {
                OTHER_CATEGORY
            } else {
                value
            };
            *collapsed.entry(key).or_insert(0) += count;
        }

        let keep: HashSet<&str> = if collapsed.len() > self.config.max_cardinality {
            let mut ranked: Vec<(&str, usize)> = collapsed.into_iter().collect();
            // Ties break alphabetically so the cap is deterministic.
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
            ranked
                .into_iter()
                .take(self.config.max_cardinality)
                .map(|(value, _)| value)
                .collect()
        } else {
            collapsed.into_keys().collect()
        };

        let values: Vec<&str> = ca
            .into_iter()
            .map(|value| {
                let value = value.unwrap_or(MISSING_CATEGORY);
                let value = if rare.contains(value) {
                    OTHER_CATEGORY
                } else {
                    value
                };
                if keep.contains(value) {
                    value
                } else {
                    OTHER_CATEGORY
                }
            })
            .collect();

        Ok(Column::new(column.name().clone(), values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cleaner() -> FeatureCleaner {
        FeatureCleaner::new(CleanerConfig::default())
    }

    #[test]
    fn flags_and_counts_impute_zero() {
        let df = df!(
            "sk_id_curr" => [1i64, 2, 3],
            "pos_def_flag" => [Some(1i64), None, Some(0)],
            "bu_cnt_active" => [Some(2i64), None, Some(5)],
        )
        .unwrap();
        let cleaned = cleaner().clean(&df).unwrap();

        let flag = cleaned.features.column("pos_def_flag").unwrap();
        assert_eq!(flag.dtype(), &DataType::Int8);
        assert_eq!(flag.i8().unwrap().get(1), Some(0));

        let count = cleaned.features.column("bu_cnt_active").unwrap();
        assert_eq!(count.dtype(), &DataType::Int16);
        assert_eq!(count.i16().unwrap().get(1), Some(0));
    }

    #[test]
    fn days_impute_median() {
        let df = df!(
            "sk_id_curr" => [1i64, 2, 3],
            "days_employed" => [Some(-1000.0), None, Some(-3000.0)],
        )
        .unwrap();
        let cleaned = cleaner().clean(&df).unwrap();
        let days = cleaned.features.column("days_employed").unwrap();
        assert_eq!(days.dtype(), &DataType::Int16);
        // Median of {-1000, -3000} = -2000.
        assert_eq!(days.i16().unwrap().get(1), Some(-2000));
    }

    #[test]
    fn numeric_fill_and_clip_to_batch_quantiles() {
        let mut values: Vec<Option<f64>> = (0..=1000).map(|v| Some(f64::from(v))).collect();
        values[500] = None;
        let ids: Vec<i64> = (0..=1000).collect();
        let df = DataFrame::new(vec![
            Column::new("sk_id_curr".into(), ids),
            Column::new("inst_delay_rate".into(), values),
        ])
        .unwrap();

        let cleaned = cleaner().clean(&df).unwrap();
        let out = cleaned.features.column("inst_delay_rate").unwrap();
        assert_eq!(out.dtype(), &DataType::Float32);
        let out = out.f32().unwrap();
        // Extremes pull in to the 0.1% / 99.9% quantiles.
        assert!(out.get(0).unwrap() >= 0.9);
        assert!(out.get(1000).unwrap() <= 999.1);
        // The hole imputes to the column median.
        assert!(out.get(500).is_some());
    }

    #[test]
    fn persisted_bounds_override_batch_fit() {
        let df = df!(
            "sk_id_curr" => [1i64, 2, 3],
            "inst_delay_rate" => [0.0, 0.5, 10.0],
        )
        .unwrap();
        let mut bounds = BTreeMap::new();
        bounds.insert("inst_delay_rate".to_string(), (0.1, 1.0));
        let cleaner =
            FeatureCleaner::with_bounds(CleanerConfig::default(), ClipBounds { bounds });

        let cleaned = cleaner.clean(&df).unwrap();
        let out = cleaned.features.column("inst_delay_rate").unwrap();
        let out = out.f32().unwrap();
        assert_relative_eq!(out.get(0).unwrap(), 0.1, epsilon = 1e-6);
        assert_relative_eq!(out.get(2).unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn integer_passthrough_clips_to_batch_quantiles() {
        let df = df!(
            "sk_id_curr" => [1i64, 2, 3],
            "flag_document_3" => [0i64, 1, 0],
            "obs_60_cnt_social_circle" => [1i64, 2, 100_000],
        )
        .unwrap();
        let cleaned = cleaner().clean(&df).unwrap();

        // 0/1 columns survive rounding intact.
        let flag = cleaned.features.column("flag_document_3").unwrap();
        assert_eq!(flag.dtype(), &DataType::Int8);
        assert_eq!(flag.i8().unwrap().get(1), Some(1));
        assert_eq!(flag.i8().unwrap().get(0), Some(0));

        // The stray wide value pulls in to the upper batch quantile.
        let wide = cleaned
            .features
            .column("obs_60_cnt_social_circle")
            .unwrap()
            .cast(&DataType::Int64)
            .unwrap();
        assert!(wide.i64().unwrap().max().unwrap() < 100_000);
    }

    #[test]
    fn integers_downcast_to_observed_width() {
        let df = df!(
            "sk_id_curr" => [1i64, 2],
            "small" => [1i64, 100],
            "wide" => [1i64, 100_000],
        )
        .unwrap();
        let cleaned = cleaner().clean(&df).unwrap();
        assert_eq!(
            cleaned.features.column("small").unwrap().dtype(),
            &DataType::Int8
        );
        assert_eq!(
            cleaned.features.column("wide").unwrap().dtype(),
            &DataType::Int32
        );
    }

    #[test]
    fn categories_collapse_missing_and_rare() {
        let mut values: Vec<Option<&str>> = Vec::new();
        values.extend(std::iter::repeat_n(Some("A"), 190));
        values.extend(std::iter::repeat_n(None, 5));
        values.extend(std::iter::repeat_n(Some("B"), 4));
        values.push(Some("C"));
        let ids: Vec<i64> = (0..200).collect();
        let df = DataFrame::new(vec![
            Column::new("sk_id_curr".into(), ids),
            Column::new("occupation_type".into(), values),
        ])
        .unwrap();

        let cleaned = cleaner().clean(&df).unwrap();
        let out = cleaned.features.column("occupation_type").unwrap();
        let out = out.str().unwrap();
        assert_eq!(out.get(0), Some("A"));
        // Nulls become MISSING and survive at 2.5%.
        assert_eq!(out.get(190), Some("MISSING"));
        // B survives at 2%; C is below 1% and collapses.
        assert_eq!(out.get(195), Some("B"));
        assert_eq!(out.get(199), Some("OTHER"));
    }

    #[test]
    fn cardinality_cap_keeps_most_frequent() {
        let config = CleanerConfig {
            max_cardinality: 2,
            min_category_ratio: 0.0,
            ..Default::default()
        };
        let values = ["A", "A", "A", "B", "B", "C", "D"];
        let ids: Vec<i64> = (0..7).collect();
        let df = DataFrame::new(vec![
            Column::new("sk_id_curr".into(), ids),
            Column::new("organization_type".into(), values.to_vec()),
        ])
        .unwrap();

        let cleaned = FeatureCleaner::new(config).clean(&df).unwrap();
        let out = cleaned.features.column("organization_type").unwrap();
        let out = out.str().unwrap();
        assert_eq!(out.get(0), Some("A"));
        assert_eq!(out.get(3), Some("B"));
        assert_eq!(out.get(5), Some("OTHER"));
        assert_eq!(out.get(6), Some("OTHER"));
    }

    #[test]
    fn ids_are_separated_in_order() {
        let df = df!(
            "sk_id_curr" => [3i64, 1, 2],
            "inst_delay_rate" => [0.1, 0.2, 0.3],
        )
        .unwrap();
        let cleaned = cleaner().clean(&df).unwrap();
        assert!(cleaned.features.column("sk_id_curr").is_err());
        let ids = cleaned.ids.i64().unwrap();
        assert_eq!(ids.get(0), Some(3));
        assert_eq!(ids.get(1), Some(1));
        assert_eq!(ids.get(2), Some(2));
    }

    #[test]
    fn clip_bounds_round_trip_through_serde() {
        let df = df!(
            "sk_id_curr" => [1i64, 2, 3, 4],
            "x" => [1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let bounds =
            ClipBounds::fit(&df, &["x".to_string()], (0.001, 0.999)).unwrap();
        let json = serde_json::to_string(&bounds).unwrap();
        let back: ClipBounds = serde_json::from_str(&json).unwrap();
        assert_eq!(bounds, back);
    }
}
