//! Observation-level bootstrap resampling of count vectors.
//!
//! A count vector tallies papers per category. One replicate is drawn by
//! sampling `total` papers uniformly with replacement from the observed
//! papers and tallying them back per category. Categories with more papers
//! are proportionally more likely to be drawn; categories with no papers can
//! never be drawn.

use std::ops::Deref;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CogdistError, Result};

/// Non-negative paper counts per category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountVector(Vec<u64>);

impl CountVector {
    pub fn new(counts: Vec<u64>) -> Self {
        CountVector(counts)
    }

    /// Build from signed input, rejecting negative entries.
    pub fn from_signed(counts: &[i64]) -> Result<Self> {
        counts
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                u64::try_from(value).map_err(|_| CogdistError::NegativeCount { index, value })
            })
            .collect::<Result<Vec<u64>>>()
            .map(CountVector)
    }

    /// Portfolio size (number of papers).
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    /// Counts as `f64` weights.
    pub fn to_weights(&self) -> Vec<f64> {
        self.0.iter().map(|&c| c as f64).collect()
    }
}

impl Deref for CountVector {
    type Target = [u64];

    fn deref(&self) -> &[u64] {
        &self.0
    }
}

impl From<Vec<u64>> for CountVector {
    fn from(counts: Vec<u64>) -> Self {
        CountVector(counts)
    }
}

/// Draw one bootstrap replicate of `counts`.
///
/// The replicate has the same length and the same total as the input, and
/// every zero position of the input stays zero.
///
/// Fails with [`CogdistError::EmptyCounts`] for a zero-length vector and
/// [`CogdistError::ZeroTotal`] when every count is zero, rather than return
/// an all-zero replicate.
pub fn bootstrap_sample(counts: &CountVector, rng: &mut impl Rng) -> Result<CountVector> {
    if counts.is_empty() {
        return Err(CogdistError::EmptyCounts);
    }
    let total = counts.total();
    if total == 0 {
        return Err(CogdistError::ZeroTotal);
    }

    // Cumulative boundaries: paper p belongs to the first category whose
    // cumulative count exceeds p. Equivalent to expanding one token per paper.
    let mut cumulative = Vec::with_capacity(counts.len());
    let mut running = 0u64;
    for &c in counts.iter() {
        running += c;
        cumulative.push(running);
    }

    let mut tally = vec![0u64; counts.len()];
    for _ in 0..total {
        let paper = rng.gen_range(0..total);
        let category = cumulative.partition_point(|&bound| bound <= paper);
        tally[category] += 1;
    }
    Ok(CountVector(tally))
}
