//! Population drift monitoring.
//!
//! The population stability index compares the current distribution of a
//! score or feature against a reference distribution. Bin edges come from
//! the reference quantiles, with the outer edges widened to infinity so no
//! observation falls outside the histogram.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// PSI at or above this level calls for a closer look.
pub const PSI_WATCH: f64 = 0.10;

/// PSI at or above this level indicates a shifted population.
pub const PSI_ALERT: f64 = 0.25;

/// Bin proportions are floored here so the log ratio stays finite.
const PROPORTION_FLOOR: f64 = 1e-6;

/// Errors from drift computation.
#[derive(Debug, Error)]
pub enum DriftError {
    /// A sample had no finite values.
    #[error("{side} sample has no finite values")]
    EmptySample {
        /// Which sample was empty.
        side: &'static str,
    },

    /// Zero bins were requested.
    #[error("PSI needs at least one bin")]
    NoBins,
}

/// Three-level verdict on a PSI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stability {
    /// Distribution matches the reference.
    Stable,

    /// Noticeable movement, monitor the next batches.
    Watch,

    /// Population has shifted, recalibration is due.
    Alert,
}

impl Stability {
    /// Verdict for a PSI value. Both thresholds are inclusive.
    pub const fn from_psi(psi: f64) -> Self {
        if psi >= PSI_ALERT {
            Self::Alert
        } else if psi >= PSI_WATCH {
            Self::Watch
        } else {
            Self::Stable
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stable => "stable",
            Self::Watch => "watch",
            Self::Alert => "alert",
        };
        f.write_str(name)
    }
}

/// Population stability index between a reference and a current sample.
///
/// Bin edges are the reference quantiles at `i / bins`; the first and last
/// edges are replaced with ±infinity. Non-finite values in either sample
/// are ignored.
///
/// # Errors
///
/// Fails when `bins` is zero or either sample has no finite values.
pub fn population_stability_index(
    expected: &[f64],
    actual: &[f64],
    bins: usize,
) -> Result<f64, DriftError> {
    if bins == 0 {
        return Err(DriftError::NoBins);
    }
    let expected: Vec<f64> = expected.iter().copied().filter(|v| v.is_finite()).collect();
    let actual: Vec<f64> = actual.iter().copied().filter(|v| v.is_finite()).collect();
    if expected.is_empty() {
        return Err(DriftError::EmptySample { side: "expected" });
    }
    if actual.is_empty() {
        return Err(DriftError::EmptySample { side: "actual" });
    }

    let edges = quantile_edges(&expected, bins);
    let e_hist = proportions(&expected, &edges, bins);
    let a_hist = proportions(&actual, &edges, bins);

    let psi = e_hist
        .iter()
        .zip(&a_hist)
        .map(|(e, a)| (a - e) * (a / e).ln())
        .sum();
    Ok(psi)
}

/// Interior bin edges from the reference quantiles. The outer ±infinity
/// edges are implicit, so `bins - 1` values come back.
fn quantile_edges(sample: &[f64], bins: usize) -> Vec<f64> {
    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    (1..bins)
        .map(|i| {
            // Linear interpolation between order statistics.
            let pos = (i as f64 / bins as f64) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let frac = pos - lo as f64;
            if lo + 1 < n {
                sorted[lo] * (1.0 - frac) + sorted[lo + 1] * frac
            } else {
                sorted[lo]
            }
        })
        .collect()
}

/// Bin proportions over the interior edges, floored at `PROPORTION_FLOOR`.
fn proportions(sample: &[f64], edges: &[f64], bins: usize) -> Vec<f64> {
    let mut counts = vec![0usize; bins];
    for &value in sample {
        // Values on an edge fall into the bin to its right.
        let bin = edges.partition_point(|&edge| edge <= value);
        counts[bin] += 1;
    }
    let total = sample.len().max(1) as f64;
    counts
        .into_iter()
        .map(|c| (c as f64 / total).clamp(PROPORTION_FLOOR, 1.0))
        .collect()
}
