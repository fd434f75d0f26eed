//! Percentile confidence intervals over bootstrap samples.

use serde::{Deserialize, Serialize};

use crate::error::{CogdistError, Result};
use crate::matrix::Matrix;

/// Two-sided percentile interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Fail unless `alpha` lies strictly between 0 and 1.
pub fn check_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(CogdistError::InvalidAlpha(alpha));
    }
    Ok(())
}

/// Percentile interval at level `1 - alpha`.
///
/// Sorts the samples and picks the order statistics at
/// `floor(alpha / 2 * N)` and `floor((1 - alpha / 2) * N)`, no
/// interpolation. The upper index is clamped to `N - 1`. NaN samples sort
/// last whatever their sign bit.
pub fn confidence_interval(samples: &[f64], alpha: f64) -> Result<ConfidenceInterval> {
    check_alpha(alpha)?;
    if samples.is_empty() {
        return Err(CogdistError::EmptySamples);
    }

    let mut sorted = samples.to_vec();
    // total_cmp alone puts negative NaN before -inf.
    sorted.sort_by(|a, b| a.is_nan().cmp(&b.is_nan()).then(a.total_cmp(b)));

    let n = sorted.len();
    let lower_idx = ((alpha / 2.0 * n as f64).floor() as usize).min(n - 1);
    let upper_idx = (((1.0 - alpha / 2.0) * n as f64).floor() as usize).min(n - 1);

    Ok(ConfidenceInterval {
        lower: sorted[lower_idx],
        upper: sorted[upper_idx],
    })
}

/// One interval per column of `samples` (rows are replicates).
pub fn column_intervals(samples: &Matrix, alpha: f64) -> Result<Vec<ConfidenceInterval>> {
    (0..samples.cols())
        .map(|col| confidence_interval(&samples.column(col), alpha))
        .collect()
}

/// Whether two intervals share more than an endpoint. Touching intervals do
/// not overlap.
pub fn intervals_overlap(a: &ConfidenceInterval, b: &ConfidenceInterval) -> bool {
    !(a.upper <= b.lower || b.upper <= a.lower)
}
