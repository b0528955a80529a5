//! Decision error types.

use thiserror::Error;

/// Errors from scoring and attribution.
#[derive(Debug, Error)]
pub enum DecisionError {
    /// A PD outside [0, 1] means upstream calibration is broken; clipping
    /// is a guard against log-odds blowup, not a correction for this.
    #[error("PD {pd} is outside [0, 1]")]
    InvalidPd {
        /// Offending PD
        pd: f64,
    },

    /// Non-finite score after clipping
    #[error("score for PD {pd} is not finite")]
    NonFiniteScore {
        /// PD that produced the score
        pd: f64,
    },

    /// Parallel attribution lists disagree in length. Fatal for the
    /// explanation only; the decision record is unaffected.
    #[error("attribution length mismatch: {names} feature names vs {values} values")]
    AttributionMismatch {
        /// Feature-name count
        names: usize,
        /// Value count
        values: usize,
    },
}

/// Convenience alias for decision results.
pub type Result<T> = std::result::Result<T, DecisionError>;
