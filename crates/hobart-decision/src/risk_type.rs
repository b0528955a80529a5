//! Risk-type classification for Review-band applicants.
//!
//! An ordered list of (predicate, archetype) rules over the aggregated
//! attribution: super-group percentage dominance plus keyword hits on the
//! raw feature names as a safety net for imperfect catalog mappings. First
//! matching rule wins; Mixed is the fallback. Each archetype carries
//! reviewer guidance.

use crate::attribution::AttributionBundle;
use derive_more::Display;
use hobart::SuperGroup;
use serde::{Deserialize, Serialize};

/// Feature-name keywords counting toward documentation uncertainty.
const DOCS_KEYWORDS: [&str; 6] = [
    "flag_document",
    "document",
    "phone",
    "email",
    "contact",
    "process_start",
];
/// Keywords counting toward spending-side imbalance.
const SPENDING_KEYWORDS: [&str; 5] = [
    "cc_util",
    "revolving",
    "credit_to_goods",
    "goods_price",
    "over_limit",
];
/// Keywords counting toward repayment-capacity strain.
const CAPACITY_KEYWORDS: [&str; 5] = ["annuity", "payment_rate", "income", "debt", "ratio"];
/// Keywords counting toward employment instability.
const EMPLOYMENT_KEYWORDS: [&str; 5] = [
    "days_employed",
    "years_employed",
    "occupation",
    "organization",
    "employment",
];

/// The five risk archetypes.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskType {
    /// Risk concentrated in delinquency, multi-debt, and credit history
    #[display("structural-credit")]
    StructuralCredit,
    /// Risk that verification of documents and contact data can resolve
    #[display("docs-uncertainty")]
    DocsUncertainty,
    /// Spending or repayment-burden imbalance without a broken history
    #[display("spending-imbalance")]
    SpendingImbalance,
    /// Employment tenure or life-cycle volatility
    #[display("employment-lifecycle")]
    EmploymentLifecycle,
    /// No single axis dominates; needs manual decomposition
    #[display("mixed")]
    Mixed,
}

impl RiskType {
    /// Reviewer-facing display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StructuralCredit => "Structural credit / repayment risk",
            Self::DocsUncertainty => "Documentation / information uncertainty",
            Self::SpendingImbalance => "Spending vs. income imbalance",
            Self::EmploymentLifecycle => "Employment / life-cycle risk",
            Self::Mixed => "Mixed (needs decomposition)",
        }
    }

    /// One-line description.
    pub const fn description(&self) -> &'static str {
        match self {
            Self::StructuralCredit => {
                "Risk signals concentrate in delinquency, multi-debt, and credit history"
            }
            Self::DocsUncertainty => {
                "Inconsistent or missing applicant information that verification can resolve"
            }
            Self::SpendingImbalance => {
                "Spending or repayment burden stands out while credit history itself is intact"
            }
            Self::EmploymentLifecycle => {
                "Income stability shaken by tenure changes or life events, usually verifiable"
            }
            Self::Mixed => "Several risk axes contribute at once; no single driver dominates",
        }
    }

    /// Checklist questions for the second-stage reviewer.
    pub const fn checklist(&self) -> &'static [&'static str] {
        match self {
            Self::StructuralCredit => &[
                "Is there a repeating delinquency pattern within the last 6-12 months?",
                "Are concurrent debt obligations excessive?",
                "Are there over-limit or rapidly growing debt signals?",
            ],
            Self::DocsUncertainty => &[
                "Do employer, income, contact, and residence details check out?",
                "Were there repeated delays or document requests in recent applications?",
                "Can one or two key documents resolve the uncertainty?",
            ],
            Self::SpendingImbalance => &[
                "Was there a one-off event behind the recent spending spike?",
                "Is the monthly repayment burden sustainable against income?",
                "Is the loan purpose clear with a realistic repayment plan?",
            ],
            Self::EmploymentLifecycle => &[
                "Did a recent job change shake income stability?",
                "Can the current income stream be verified?",
                "Is there a temporary household or residence event?",
            ],
            Self::Mixed => &[
                "Does the risk converge on one or two axes, or spread across many?",
                "Which factors are verifiable versus structural?",
            ],
        }
    }

    /// Suggested reviewer actions.
    pub const fn actions(&self) -> &'static [&'static str] {
        match self {
            Self::StructuralCredit => &[
                "Conservative review or uphold the rejection",
                "Advise re-application after debt consolidation where feasible",
            ],
            Self::DocsUncertainty => &[
                "Resolve with one or two key documents, avoid over-collection",
                "Verification call plus internal QC checklist",
                "Convert to approval (or conditional approval) once verified",
            ],
            Self::SpendingImbalance => &[
                "Conditional approval with an adjusted limit or term",
                "Short-term monitoring over the first one to three months",
            ],
            Self::EmploymentLifecycle => &[
                "Approve or conditionally approve after income verification",
                "Adjust repayment start or installment structure",
            ],
            Self::Mixed => &[
                "Re-frame the second-stage questions around the top one or two axes",
                "Inspect the top attribution items before deciding",
            ],
        }
    }
}

/// Thresholds for the dominance rules, in percent of top-K mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRuleThresholds {
    /// Credit-history dominance for the structural-credit rule.
    pub credit_pct: f64,
    /// Docs-Ops dominance for the documentation rule.
    pub docs_pct: f64,
    /// Debt-capacity dominance for the imbalance rule.
    pub capacity_pct: f64,
    /// Employment dominance for the life-cycle rule.
    pub employment_pct: f64,
}

impl Default for RiskRuleThresholds {
    fn default() -> Self {
        Self {
            credit_pct: 45.0,
            docs_pct: 30.0,
            capacity_pct: 35.0,
            employment_pct: 25.0,
        }
    }
}

/// Everything the rules saw, returned alongside the label for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSignals {
    /// Credit-history share of top-K mass
    pub credit_pct: f64,
    /// Docs-Ops share
    pub docs_pct: f64,
    /// Debt-capacity share
    pub capacity_pct: f64,
    /// Employment share
    pub employment_pct: f64,
    /// Risk-increasing (positive) items in the credit group
    pub positive_credit_items: usize,
    /// Documentation keyword hits among top-K feature names
    pub docs_keyword_hits: usize,
    /// Spending keyword hits
    pub spending_keyword_hits: usize,
    /// Capacity keyword hits
    pub capacity_keyword_hits: usize,
    /// Employment keyword hits
    pub employment_keyword_hits: usize,
}

impl RiskSignals {
    fn keyword_hits(bundle: &AttributionBundle, keywords: &[&str]) -> usize {
        bundle
            .items
            .iter()
            .filter(|item| {
                let name = item.feature.to_lowercase();
                keywords.iter().any(|kw| name.contains(kw))
            })
            .count()
    }

    /// Extract rule inputs from an aggregated bundle.
    pub fn from_bundle(bundle: &AttributionBundle) -> Self {
        Self {
            credit_pct: bundle.group_share(SuperGroup::CreditHistory),
            docs_pct: bundle.group_share(SuperGroup::DocsOps),
            capacity_pct: bundle.group_share(SuperGroup::DebtCapacity),
            employment_pct: bundle.group_share(SuperGroup::Employment),
            positive_credit_items: bundle
                .items
                .iter()
                .filter(|item| item.group == SuperGroup::CreditHistory && item.value > 0.0)
                .count(),
            docs_keyword_hits: Self::keyword_hits(bundle, &DOCS_KEYWORDS),
            spending_keyword_hits: Self::keyword_hits(bundle, &SPENDING_KEYWORDS),
            capacity_keyword_hits: Self::keyword_hits(bundle, &CAPACITY_KEYWORDS),
            employment_keyword_hits: Self::keyword_hits(bundle, &EMPLOYMENT_KEYWORDS),
        }
    }
}

/// First-match-wins rule list over attribution signals.
#[derive(Debug, Clone, Default)]
pub struct RiskTypeClassifier {
    thresholds: RiskRuleThresholds,
}

impl RiskTypeClassifier {
    /// Classifier with custom thresholds.
    pub const fn new(thresholds: RiskRuleThresholds) -> Self {
        Self { thresholds }
    }

    /// The ordered rules. Order is semantic: structural credit outranks
    /// documentation, which outranks capacity, which outranks employment.
    fn rules(&self) -> Vec<(RiskType, Box<dyn Fn(&RiskSignals) -> bool + '_>)> {
        let t = &self.thresholds;
        vec![
            (
                RiskType::StructuralCredit,
                Box::new(|s: &RiskSignals| {
                    s.credit_pct >= t.credit_pct && s.positive_credit_items >= 2
                }),
            ),
            (
                RiskType::DocsUncertainty,
                Box::new(|s: &RiskSignals| s.docs_pct >= t.docs_pct || s.docs_keyword_hits >= 2),
            ),
            (
                RiskType::SpendingImbalance,
                Box::new(|s: &RiskSignals| {
                    s.capacity_pct >= t.capacity_pct
                        || s.spending_keyword_hits >= 2
                        || s.capacity_keyword_hits >= 3
                }),
            ),
            (
                RiskType::EmploymentLifecycle,
                Box::new(|s: &RiskSignals| {
                    s.employment_pct >= t.employment_pct || s.employment_keyword_hits >= 2
                }),
            ),
        ]
    }

    /// Classify one applicant's aggregated attribution.
    ///
    /// Returns the archetype and the signals the rules evaluated, for the
    /// audit trail. Meaningful for Review-band applicants; callers may run
    /// it for others but the label carries no decision weight there.
    pub fn classify(&self, bundle: &AttributionBundle) -> (RiskType, RiskSignals) {
        let signals = RiskSignals::from_bundle(bundle);
        let label = self
            .rules()
            .into_iter()
            .find(|(_, rule)| rule(&signals))
            .map_or(RiskType::Mixed, |(label, _)| label);
        (label, signals)
    }
}
