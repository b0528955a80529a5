//! Score transform and banding.
//!
//! `score = offset + (pdo / ln 2) * ln((1 - pd) / pd)`, PD clamped before
//! the transform and the score clamped after. Pure and idempotent: the same
//! PD and policy always produce bit-identical output.

use crate::error::{DecisionError, Result};
use chrono::{DateTime, Utc};
use derive_more::Display;
use hobart::{Grade, GradePolicy, ScorePolicy};
use serde::{Deserialize, Serialize};

/// Decision band from the dual score cutoff.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    /// Score at or above the upper cutoff
    Approve,
    /// Score between the cutoffs, needs a human look
    Review,
    /// Score below the lower cutoff
    Reject,
}

impl Band {
    /// The cutoff this band is measured against: the upper cutoff for
    /// Approve, the lower one otherwise.
    pub const fn cutoff(self, policy: &ScorePolicy) -> f64 {
        match self {
            Band::Approve => policy.t_high,
            Band::Review | Band::Reject => policy.t_low,
        }
    }
}

/// Map a clipped PD to a bounded score.
///
/// Fails on PD outside [0, 1]; the floor/ceil clamp exists to keep the
/// log-odds finite, not to repair invalid input.
pub fn pd_to_score(pd: f64, policy: &ScorePolicy) -> Result<f64> {
    if !(0.0..=1.0).contains(&pd) {
        return Err(DecisionError::InvalidPd { pd });
    }
    let clipped = pd.clamp(policy.pd_floor, policy.pd_ceil);
    let odds = (1.0 - clipped) / clipped;
    let score = policy.offset + policy.factor() * odds.ln();
    let score = score.clamp(policy.score_min, policy.score_max);
    if !score.is_finite() {
        return Err(DecisionError::NonFiniteScore { pd });
    }
    Ok(score)
}

/// Band for a score: both cutoffs are inclusive on the upper side.
pub fn band_for_score(score: f64, policy: &ScorePolicy) -> Band {
    if score < policy.t_low {
        Band::Reject
    } else if score < policy.t_high {
        Band::Review
    } else {
        Band::Approve
    }
}

/// One applicant's scored decision. Immutable: a re-score produces a new
/// record, never an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Applicant ID
    pub applicant_id: i64,
    /// Calibrated probability of default
    pub pd: f64,
    /// Bounded log-odds score
    pub score: f64,
    /// Decision band
    pub band: Band,
    /// PD letter grade
    pub grade: Grade,
    /// Cutoff the band was measured against
    pub cutoff: f64,
    /// Score minus the band's own cutoff
    pub margin: f64,
    /// When the record was produced
    pub scored_at: DateTime<Utc>,
}

/// Produces decision records from PDs under one policy.
#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    policy: ScorePolicy,
    grades: GradePolicy,
}

impl ScoreEngine {
    /// Engine with explicit policies.
    pub const fn new(policy: ScorePolicy, grades: GradePolicy) -> Self {
        Self { policy, grades }
    }

    /// The score policy in force.
    pub const fn policy(&self) -> &ScorePolicy {
        &self.policy
    }

    /// Score one applicant.
    pub fn decide(&self, applicant_id: i64, pd: f64) -> Result<DecisionRecord> {
        let score = pd_to_score(pd, &self.policy)?;
        let band = band_for_score(score, &self.policy);
        let cutoff = band.cutoff(&self.policy);
        Ok(DecisionRecord {
            applicant_id,
            pd,
            score,
            band,
            grade: self.grades.grade(pd),
            cutoff,
            margin: score - cutoff,
            scored_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn worked_example() {
        let engine = ScoreEngine::default();
        let record = engine.decide(42, 0.08).unwrap();

        // odds = 0.92 / 0.08 = 11.5, factor = 50 / ln 2 ≈ 72.13.
        assert_relative_eq!(record.score, 776.1, epsilon = 0.1);
        assert_eq!(record.band, Band::Approve);
        assert_relative_eq!(record.margin, 56.1, epsilon = 0.1);
        assert_relative_eq!(record.cutoff, 720.0, epsilon = 1e-12);
        assert_eq!(record.grade, hobart::Grade::C);
    }

    #[rstest]
    #[case(674.999, Band::Reject)]
    #[case(675.0, Band::Review)]
    #[case(719.999, Band::Review)]
    #[case(720.0, Band::Approve)]
    fn band_boundaries_are_inclusive_upward(#[case] score: f64, #[case] expected: Band) {
        assert_eq!(band_for_score(score, &ScorePolicy::default()), expected);
    }

    #[test]
    fn score_is_strictly_decreasing_in_pd() {
        let policy = ScorePolicy::default();
        let pds = [0.001, 0.02, 0.08, 0.2, 0.5, 0.9];
        let scores: Vec<f64> = pds
            .iter()
            .map(|pd| pd_to_score(*pd, &policy).unwrap())
            .collect();
        for pair in scores.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn deterministic_to_the_bit() {
        let policy = ScorePolicy::default();
        let a = pd_to_score(0.137, &policy).unwrap();
        let b = pd_to_score(0.137, &policy).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.0)]
    fn degenerate_pds_clip_instead_of_failing(#[case] pd: f64) {
        let score = pd_to_score(pd, &ScorePolicy::default()).unwrap();
        assert!(score.is_finite());
    }

    #[rstest]
    #[case(-0.01)]
    #[case(1.01)]
    #[case(f64::NAN)]
    fn out_of_range_pd_is_fatal(#[case] pd: f64) {
        let err = pd_to_score(pd, &ScorePolicy::default()).unwrap_err();
        assert!(matches!(err, DecisionError::InvalidPd { .. }));
    }

    #[test]
    fn clipping_is_idempotent() {
        let policy = ScorePolicy::default();
        // pd at the floor already; scoring the floor value again changes
        // nothing.
        let once = pd_to_score(policy.pd_floor, &policy).unwrap();
        let twice = pd_to_score(policy.pd_floor, &policy).unwrap();
        assert_eq!(once.to_bits(), twice.to_bits());
        assert_relative_eq!(once, policy.score_max, epsilon = 1e-9);
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = ScoreEngine::default().decide(7, 0.12).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: DecisionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
