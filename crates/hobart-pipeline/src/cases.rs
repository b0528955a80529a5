//! Case partitioning.
//!
//! Splits the applicant set into eight disjoint buckets by which optional
//! sources (prior applications, card statements, installment schedules)
//! carry usable history for each applicant. Presence is judged after the
//! derivers' point-in-time filtering; applicants absent from a source get
//! nulls in the merge, never zeros.

use derive_more::Display;
use std::collections::{HashMap, HashSet};

/// The eight membership combinations over the three optional sources.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseLabel {
    /// Prior applications, card statements, and installments all present
    #[display("prior+card+installment")]
    PriorCardInstallment,
    /// Prior applications and card statements
    #[display("prior+card")]
    PriorCard,
    /// Prior applications and installments
    #[display("prior+installment")]
    PriorInstallment,
    /// Card statements and installments
    #[display("card+installment")]
    CardInstallment,
    /// Prior applications only
    #[display("prior-only")]
    PriorOnly,
    /// Card statements only
    #[display("card-only")]
    CardOnly,
    /// Installments only
    #[display("installment-only")]
    InstallmentOnly,
    /// No optional source has data
    #[display("application-only")]
    ApplicationOnly,
}

impl CaseLabel {
    /// All labels, in routing order.
    pub const ALL: [CaseLabel; 8] = [
        CaseLabel::PriorCardInstallment,
        CaseLabel::PriorCard,
        CaseLabel::PriorInstallment,
        CaseLabel::CardInstallment,
        CaseLabel::PriorOnly,
        CaseLabel::CardOnly,
        CaseLabel::InstallmentOnly,
        CaseLabel::ApplicationOnly,
    ];

    /// Label for one applicant's source membership.
    pub const fn from_presence(prior: bool, card: bool, installment: bool) -> Self {
        match (prior, card, installment) {
            (true, true, true) => CaseLabel::PriorCardInstallment,
            (true, true, false) => CaseLabel::PriorCard,
            (true, false, true) => CaseLabel::PriorInstallment,
            (false, true, true) => CaseLabel::CardInstallment,
            (true, false, false) => CaseLabel::PriorOnly,
            (false, true, false) => CaseLabel::CardOnly,
            (false, false, true) => CaseLabel::InstallmentOnly,
            (false, false, false) => CaseLabel::ApplicationOnly,
        }
    }
}

/// Applicant IDs present in each optional source.
#[derive(Debug, Clone, Default)]
pub struct SourcePresence {
    /// IDs with prior-application rows
    pub prior: HashSet<i64>,
    /// IDs with card-statement rows
    pub card: HashSet<i64>,
    /// IDs with installment rows
    pub installment: HashSet<i64>,
}

/// A disjoint, exhaustive partition of the applicant set.
#[derive(Debug, Clone)]
pub struct CasePartition {
    buckets: HashMap<CaseLabel, HashSet<i64>>,
}

impl CasePartition {
    /// Partition `applicants` by source membership.
    ///
    /// Each applicant lands in exactly one bucket, so disjointness and
    /// exhaustiveness hold by construction.
    pub fn compute(applicants: &HashSet<i64>, presence: &SourcePresence) -> Self {
        let mut buckets: HashMap<CaseLabel, HashSet<i64>> = CaseLabel::ALL
            .iter()
            .map(|label| (*label, HashSet::new()))
            .collect();
        for &id in applicants {
            let label = CaseLabel::from_presence(
                presence.prior.contains(&id),
                presence.card.contains(&id),
                presence.installment.contains(&id),
            );
            if let Some(bucket) = buckets.get_mut(&label) {
                bucket.insert(id);
            }
        }
        Self { buckets }
    }

    /// IDs in one bucket.
    pub fn bucket(&self, label: CaseLabel) -> &HashSet<i64> {
        // compute() seeds every label.
        static EMPTY: std::sync::LazyLock<HashSet<i64>> = std::sync::LazyLock::new(HashSet::new);
        self.buckets.get(&label).unwrap_or(&EMPTY)
    }

    /// The bucket an applicant landed in.
    pub fn label_of(&self, id: i64) -> Option<CaseLabel> {
        CaseLabel::ALL
            .iter()
            .copied()
            .find(|label| self.bucket(*label).contains(&id))
    }

    /// Bucket sizes, for logging.
    pub fn counts(&self) -> HashMap<CaseLabel, usize> {
        CaseLabel::ALL
            .iter()
            .map(|label| (*label, self.bucket(*label).len()))
            .collect()
    }

    /// Total applicants across all buckets.
    pub fn total(&self) -> usize {
        self.buckets.values().map(HashSet::len).sum()
    }
}
