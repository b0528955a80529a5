//! Semantic feature catalog.
//!
//! Maps raw model feature names to reviewer-facing labels and semantic
//! super-groups. Attribution aggregation and risk-type classification both
//! operate on super-groups rather than raw feature names.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Semantic super-groups for feature attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuperGroup {
    /// Credit and repayment history (bureau, delinquency, card, installment).
    CreditHistory,
    /// Debt burden, income headroom, and requested amounts.
    DebtCapacity,
    /// Employment and occupational stability.
    Employment,
    /// Demographics, household, and education.
    Demographics,
    /// Housing, assets, and region.
    HousingAssets,
    /// Documentation, contactability, and application operations.
    /// Also the fallback for unmapped features.
    DocsOps,
}

impl SuperGroup {
    /// All super-groups.
    pub const fn all() -> [Self; 6] {
        [
            Self::CreditHistory,
            Self::DebtCapacity,
            Self::Employment,
            Self::Demographics,
            Self::HousingAssets,
            Self::DocsOps,
        ]
    }

    /// Human-readable group name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreditHistory => "Credit & Repayment History",
            Self::DebtCapacity => "Debt, Income & Capacity",
            Self::Employment => "Employment Stability",
            Self::Demographics => "Demographics & Household",
            Self::HousingAssets => "Housing, Assets & Region",
            Self::DocsOps => "Documentation & Operations",
        }
    }
}

impl fmt::Display for SuperGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Catalog entry for a single model feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureInfo {
    /// Raw feature name as it appears in the model matrix.
    pub feature: &'static str,
    /// Reviewer-facing label.
    pub label: &'static str,
    /// Semantic super-group.
    pub group: SuperGroup,
}

/// Built-in feature table covering the columns the pipeline produces.
pub fn builtin_catalog() -> Vec<FeatureInfo> {
    use SuperGroup::*;

    macro_rules! entry {
        ($feature:expr, $label:expr, $group:expr) => {
            FeatureInfo {
                feature: $feature,
                label: $label,
                group: $group,
            }
        };
    }

    vec![
        // External scores and bureau history
        entry!("ext_source_1", "External score 1", CreditHistory),
        entry!("ext_source_2", "External score 2", CreditHistory),
        entry!("ext_source_3", "External score 3", CreditHistory),
        entry!("app_ext_source_min", "Weakest external score", CreditHistory),
        entry!("app_ext_source_weighted", "Blended external score", CreditHistory),
        entry!("bu_cnt_active", "Active external loans", CreditHistory),
        entry!("bu_cnt_closed", "Closed external loans", CreditHistory),
        entry!("bu_ratio_active_loans", "Share of active external loans", CreditHistory),
        entry!("bu_total_debt_for_ratio", "Outstanding external debt", DebtCapacity),
        entry!("bu_any_over_limit_debt", "Debt above reported credit line", CreditHistory),
        entry!("bu_total_balance_months", "Bureau history length", CreditHistory),
        entry!("bu_enddate_diff_avg", "Actual vs scheduled loan close gap", CreditHistory),
        entry!("bu_days_credit_update_max", "Bureau record freshness", CreditHistory),
        // Card / revolving
        entry!("cc_util_mean", "Average card utilization", CreditHistory),
        entry!("cc_util_max", "Peak card utilization", CreditHistory),
        entry!("cc_over_limit", "Months over card limit", CreditHistory),
        // Installments
        entry!("inst_delay_rate", "Share of delayed installments", CreditHistory),
        entry!("inst_delay_days_mean", "Average payment delay", CreditHistory),
        // Point-of-sale loans
        entry!("pos_def_flag", "Severe delinquency on POS loan", CreditHistory),
        // Previous applications
        entry!("pre_application_count", "Prior application count", CreditHistory),
        entry!("pre_approved_cnt", "Prior approval rate", CreditHistory),
        entry!("pre_new_cnt", "Prior new-customer rate", CreditHistory),
        entry!("pre_repeat_cnt", "Prior repeat-customer rate", CreditHistory),
        entry!("pre_approval_ratio", "Approved vs requested amount", CreditHistory),
        entry!("pre_credit_to_goods_mean", "Financed share of goods price", DebtCapacity),
        entry!("pre_credit_mean", "Average prior credit amount", DebtCapacity),
        entry!("pre_credit_max", "Largest prior credit amount", DebtCapacity),
        entry!("pre_credit_min", "Smallest prior credit amount", DebtCapacity),
        entry!("pre_annuity_mean", "Average prior annuity", DebtCapacity),
        entry!("pre_loan_duration_mean", "Average prior loan duration", CreditHistory),
        entry!("pre_loan_duration_max", "Longest prior loan duration", CreditHistory),
        entry!("pre_days_decision_mean", "Recency of prior decisions", CreditHistory),
        entry!("pre_weekend_app_ratio", "Weekend application share", DocsOps),
        entry!("pre_weekday_variety", "Application weekday variety", DocsOps),
        // Application amounts and burden
        entry!("amt_credit", "Requested credit amount", DebtCapacity),
        entry!("amt_annuity", "Annuity amount", DebtCapacity),
        entry!("amt_goods_price", "Goods price", DebtCapacity),
        entry!("app_amt_credit_log", "Requested credit (log)", DebtCapacity),
        entry!("app_amt_annuity_log", "Annuity (log)", DebtCapacity),
        entry!("app_amt_goods_price_log", "Goods price (log)", DebtCapacity),
        entry!("app_annuity_income_ratio", "Annuity to income", DebtCapacity),
        entry!("app_payment_rate", "Annuity to credit", DebtCapacity),
        // Employment
        entry!("days_employed", "Employment tenure", Employment),
        entry!("app_years_employed", "Years employed", Employment),
        entry!("app_employment_stability_ratio", "Tenure relative to age", Employment),
        entry!("name_income_type", "Income type", Employment),
        entry!("occupation_type", "Occupation", Employment),
        entry!("organization_type", "Employer industry", Employment),
        // Demographics
        entry!("days_birth", "Age", Demographics),
        entry!("app_age_years", "Age in years", Demographics),
        entry!("code_gender", "Gender", Demographics),
        entry!("name_family_status", "Family status", Demographics),
        entry!("name_education_type", "Education", Demographics),
        entry!("app_def_30_cnt_social_circle_clipped", "Defaults in social circle", Demographics),
        // Housing, assets, region
        entry!("own_car_age", "Car age", HousingAssets),
        entry!("region_rating_client_w_city", "Region rating", HousingAssets),
        // Documentation and operations
        entry!("app_n_documents", "Documents provided", DocsOps),
        entry!("flag_document_3", "Key document provided", DocsOps),
        entry!("days_id_publish", "ID document age", DocsOps),
        entry!("days_last_phone_change", "Phone number stability", DocsOps),
    ]
}

/// Lookup table from feature name to catalog entry.
///
/// Unknown features resolve to the Docs-Ops super-group so that a stale or
/// renamed model column degrades the explanation rather than failing it.
#[derive(Debug, Clone)]
pub struct FeatureCatalog {
    entries: HashMap<&'static str, FeatureInfo>,
}

impl FeatureCatalog {
    /// Build the catalog from a list of entries. Later duplicates win.
    pub fn new(entries: Vec<FeatureInfo>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.feature, e)).collect(),
        }
    }

    /// Catalog with the built-in feature table.
    pub fn builtin() -> Self {
        Self::new(builtin_catalog())
    }

    /// Look up a feature by its raw name.
    pub fn get(&self, feature: &str) -> Option<&FeatureInfo> {
        self.entries.get(feature)
    }

    /// Label for a feature, falling back to the raw name.
    pub fn label<'a>(&'a self, feature: &'a str) -> &'a str {
        self.get(feature).map_or(feature, |e| e.label)
    }

    /// Super-group for a feature, falling back to Docs-Ops.
    pub fn group(&self, feature: &str) -> SuperGroup {
        self.get(feature).map_or(SuperGroup::DocsOps, |e| e.group)
    }

    /// Whether a feature has an explicit catalog entry.
    pub fn is_mapped(&self, feature: &str) -> bool {
        self.entries.contains_key(feature)
    }

    /// Number of catalogued features.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FeatureCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
