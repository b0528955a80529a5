//! Attribution aggregation.
//!
//! Takes the signed per-feature attribution values for one applicant,
//! keeps the top K by absolute magnitude (signs preserved), maps each
//! feature through the semantic catalog, and expresses every item and
//! super-group as a percentage of the retained absolute mass.

use crate::error::{DecisionError, Result};
use hobart::{FeatureCatalog, SuperGroup};
use log::warn;
use serde::{Deserialize, Serialize};

/// One retained attribution item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionItem {
    /// Raw model feature name
    pub feature: String,
    /// Reviewer-facing label from the catalog
    pub label: String,
    /// Semantic super-group
    pub group: SuperGroup,
    /// Signed attribution value; positive increases predicted risk
    pub value: f64,
    /// The applicant's raw value for this feature, when known
    pub raw_value: Option<f64>,
    /// |value| as a percentage of the top-K absolute mass
    pub pct_of_top_k: f64,
}

/// Aggregated explanation for one applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionBundle {
    /// Top-K items, largest absolute value first
    pub items: Vec<AttributionItem>,
    /// Super-group shares of the top-K absolute mass, largest first
    pub group_pct: Vec<(SuperGroup, f64)>,
}

impl AttributionBundle {
    /// Share of one super-group, 0 when absent from the top K.
    pub fn group_share(&self, group: SuperGroup) -> f64 {
        self.group_pct
            .iter()
            .find(|(g, _)| *g == group)
            .map_or(0.0, |(_, pct)| *pct)
    }
}

/// Aggregates raw attribution lists into [`AttributionBundle`]s.
#[derive(Debug, Clone)]
pub struct AttributionAggregator {
    catalog: FeatureCatalog,
    top_k: usize,
}

impl Default for AttributionAggregator {
    fn default() -> Self {
        Self::new(FeatureCatalog::builtin(), 10)
    }
}

impl AttributionAggregator {
    /// Aggregator over the given catalog, keeping `top_k` items.
    pub fn new(catalog: FeatureCatalog, top_k: usize) -> Self {
        Self { catalog, top_k }
    }

    /// Aggregate one applicant's attribution lists.
    ///
    /// `features`, `values`, and `raw_values` are parallel; a length
    /// mismatch is fatal for this explanation (the caller's decision
    /// record is not affected).
    pub fn aggregate(
        &self,
        features: &[String],
        values: &[f64],
        raw_values: &[Option<f64>],
    ) -> Result<AttributionBundle> {
        if features.len() != values.len() {
            return Err(DecisionError::AttributionMismatch {
                names: features.len(),
                values: values.len(),
            });
        }
        if features.len() != raw_values.len() {
            return Err(DecisionError::AttributionMismatch {
                names: features.len(),
                values: raw_values.len(),
            });
        }

        let mut ranked: Vec<usize> = (0..features.len()).collect();
        // Ranking is always by |value|; ties break on feature name so the
        // explanation is stable across runs.
        ranked.sort_by(|&a, &b| {
            values[b]
                .abs()
                .partial_cmp(&values[a].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| features[a].cmp(&features[b]))
        });
        ranked.truncate(self.top_k);

        let denominator: f64 = ranked.iter().map(|&i| values[i].abs()).sum();

        let mut items = Vec::with_capacity(ranked.len());
        for &i in &ranked {
            let feature = features[i].as_str();
            if !self.catalog.is_mapped(feature) {
                warn!("attribution feature '{feature}' is not in the catalog, using Docs-Ops");
            }
            let pct = if denominator > 0.0 {
                values[i].abs() / denominator * 100.0
            } else {
                0.0
            };
            items.push(AttributionItem {
                feature: feature.to_string(),
                label: self.catalog.label(feature).to_string(),
                group: self.catalog.group(feature),
                value: values[i],
                raw_value: raw_values[i],
                pct_of_top_k: pct,
            });
        }

        let mut group_pct: Vec<(SuperGroup, f64)> = SuperGroup::all()
            .into_iter()
            .map(|group| {
                let share: f64 = items
                    .iter()
                    .filter(|item| item.group == group)
                    .map(|item| item.pct_of_top_k)
                    .sum();
                (group, share)
            })
            .filter(|(_, share)| *share > 0.0)
            .collect();
        group_pct.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(AttributionBundle { items, group_pct })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn aggregator() -> AttributionAggregator {
        AttributionAggregator::new(FeatureCatalog::builtin(), 10)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ranks_by_absolute_value_with_signs_preserved() {
        let features = names(&["ext_source_2", "app_annuity_income_ratio", "days_employed"]);
        let values = [-0.6, 0.3, 0.1];
        let raw = [Some(0.41), Some(0.35), Some(-1200.0)];
        let bundle = aggregator().aggregate(&features, &values, &raw).unwrap();

        assert_eq!(bundle.items[0].feature, "ext_source_2");
        assert_relative_eq!(bundle.items[0].value, -0.6, epsilon = 1e-12);
        assert_relative_eq!(bundle.items[0].pct_of_top_k, 60.0, epsilon = 1e-9);
        assert_relative_eq!(bundle.items[1].pct_of_top_k, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn item_percentages_sum_to_one_hundred() {
        let features = names(&[
            "ext_source_1",
            "ext_source_2",
            "bu_total_debt_for_ratio",
            "app_payment_rate",
            "days_employed",
        ]);
        let values = [0.4, -0.25, 0.2, -0.1, 0.05];
        let raw = vec![None; 5];
        let bundle = aggregator().aggregate(&features, &values, &raw).unwrap();

        let total: f64 = bundle.items.iter().map(|i| i.pct_of_top_k).sum();
        assert_relative_eq!(total, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn group_share_is_sum_of_member_items() {
        let features = names(&["ext_source_1", "ext_source_2", "app_payment_rate"]);
        let values = [0.5, 0.3, 0.2];
        let raw = vec![None; 3];
        let bundle = aggregator().aggregate(&features, &values, &raw).unwrap();

        assert_relative_eq!(
            bundle.group_share(SuperGroup::CreditHistory),
            80.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            bundle.group_share(SuperGroup::DebtCapacity),
            20.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(bundle.group_share(SuperGroup::Employment), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn unmapped_feature_falls_back_to_docs_ops() {
        let features = names(&["mystery_feature_v2"]);
        let values = [1.0];
        let bundle = aggregator().aggregate(&features, &values, &[None]).unwrap();
        assert_eq!(bundle.items[0].group, SuperGroup::DocsOps);
        assert_eq!(bundle.items[0].label, "mystery_feature_v2");
    }

    #[test]
    fn only_top_k_items_survive() {
        let features: Vec<String> = (0..15).map(|i| format!("feature_{i}")).collect();
        let values: Vec<f64> = (0..15).map(|i| f64::from(i) + 1.0).collect();
        let raw = vec![None; 15];
        let bundle = aggregator().aggregate(&features, &values, &raw).unwrap();
        assert_eq!(bundle.items.len(), 10);
        // The smallest five magnitudes fell off.
        assert!(bundle.items.iter().all(|i| i.value >= 6.0));
    }

    #[test]
    fn length_mismatch_is_fatal_for_the_explanation() {
        let features = names(&["ext_source_1", "ext_source_2"]);
        let err = aggregator()
            .aggregate(&features, &[0.5], &[None])
            .unwrap_err();
        assert!(matches!(
            err,
            DecisionError::AttributionMismatch { names: 2, values: 1 }
        ));
    }

    #[test]
    fn zero_mass_yields_zero_percentages() {
        let features = names(&["ext_source_1"]);
        let bundle = aggregator().aggregate(&features, &[0.0], &[None]).unwrap();
        assert_relative_eq!(bundle.items[0].pct_of_top_k, 0.0, epsilon = 1e-12);
        assert!(bundle.group_pct.is_empty());
    }
}
