//! Score and grade policy configuration.
//!
//! Single source of truth for the points-to-double-odds scaling, the dual
//! decision cutoffs, and the absolute PD grade cuts. Every downstream crate
//! takes these values by argument; nothing reads ambient configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Score policy: log-odds scaling plus decision cutoffs.
///
/// `score = offset + factor * ln((1 - pd) / pd)` with
/// `factor = pdo / ln(2)`, the standard points-to-double-odds scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePolicy {
    /// Score at even odds (pd = 0.5).
    pub offset: f64,
    /// Points to double the odds.
    pub pdo: f64,
    /// Lower clamp on the final score.
    pub score_min: f64,
    /// Upper clamp on the final score.
    pub score_max: f64,
    /// Reject below this score.
    pub t_low: f64,
    /// Approve at or above this score. Snapshots of the source policy
    /// disagree (707 vs 720); 720 is the documented default and operators
    /// override this field when their book says otherwise.
    pub t_high: f64,
    /// Lower clamp applied to PD before the log-odds transform.
    pub pd_floor: f64,
    /// Upper clamp applied to PD before the log-odds transform.
    pub pd_ceil: f64,
    /// Number of attribution items retained per applicant.
    pub top_k: usize,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            offset: 600.0,
            pdo: 50.0,
            score_min: 0.0,
            score_max: 1200.0,
            t_low: 675.0,
            t_high: 720.0,
            pd_floor: 1e-6,
            pd_ceil: 0.999_999,
            top_k: 10,
        }
    }
}

impl ScorePolicy {
    /// Scaling factor `pdo / ln(2)`.
    pub const fn factor(&self) -> f64 {
        self.pdo / std::f64::consts::LN_2
    }
}

/// PD letter grade on absolute cuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// PD at or below the A cut.
    A,
    /// PD at or below the B cut.
    B,
    /// PD at or below the C cut.
    C,
    /// PD at or below the D cut.
    D,
    /// Everything above the D cut.
    E,
}

impl Grade {
    /// All grades, best first.
    pub const fn all() -> [Self; 5] {
        [Self::A, Self::B, Self::C, Self::D, Self::E]
    }

    /// Single-letter representation.
    pub const fn letter(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// Absolute PD cuts per grade. Grades use absolute thresholds, never
/// per-batch quantiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradePolicy {
    /// Upper PD bound (inclusive) per grade, best first.
    pub cuts: [(Grade, f64); 5],
}

impl Default for GradePolicy {
    fn default() -> Self {
        Self {
            cuts: [
                (Grade::A, 0.02),
                (Grade::B, 0.05),
                (Grade::C, 0.10),
                (Grade::D, 0.20),
                (Grade::E, 1.00),
            ],
        }
    }
}

impl GradePolicy {
    /// Map a PD in [0, 1] to its letter grade.
    pub fn grade(&self, pd: f64) -> Grade {
        for (grade, cut) in &self.cuts {
            if pd <= *cut {
                return *grade;
            }
        }
        Grade::E
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn factor_matches_points_to_double_odds() {
        let policy = ScorePolicy::default();
        assert_relative_eq!(policy.factor(), 50.0 / 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[rstest]
    #[case(0.01, Grade::A)]
    #[case(0.02, Grade::A)]
    #[case(0.03, Grade::B)]
    #[case(0.10, Grade::C)]
    #[case(0.15, Grade::D)]
    #[case(0.50, Grade::E)]
    fn grades_use_inclusive_cuts(#[case] pd: f64, #[case] expected: Grade) {
        assert_eq!(GradePolicy::default().grade(pd), expected);
    }

    #[test]
    fn policy_round_trips_through_json() {
        let policy = ScorePolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        let back: ScorePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, back);
    }
}
