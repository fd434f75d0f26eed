//! Statistic plug-in protocol for the bootstrap driver.
//!
//! A statistic receives the fixed space (coordinate or similarity matrix),
//! one or two resampled count vectors and a bag of named options, and
//! returns either a scalar or a vector. The driver calls it once per
//! replicate, so the output kind and length must not vary between calls.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::distance::{barycenter, euclidean_distance, sa_vector, weighted_cosine};
use crate::error::{CogdistError, Result};
use crate::matrix::Matrix;
use crate::resample::CountVector;

/// Output of one statistic evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl StatValue {
    /// Number of dimensions: 1 for a scalar.
    pub fn dims(&self) -> usize {
        match self {
            StatValue::Scalar(_) => 1,
            StatValue::Vector(v) => v.len(),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            StatValue::Scalar(x) => std::slice::from_ref(x),
            StatValue::Vector(v) => v,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Scalar(x) => write!(f, "{:.6}", x),
            StatValue::Vector(v) => {
                let parts: Vec<String> = v.iter().map(|x| format!("{:.6}", x)).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// Value of a named statistic option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    /// Parse a command-line style value: `true`/`false`, integer, float, else text.
    pub fn parse(raw: &str) -> Self {
        if let Ok(b) = raw.parse::<bool>() {
            OptionValue::Bool(b)
        } else if let Ok(i) = raw.parse::<i64>() {
            OptionValue::Int(i)
        } else if let Ok(x) = raw.parse::<f64>() {
            OptionValue::Float(x)
        } else {
            OptionValue::Text(raw.to_string())
        }
    }
}

/// Named options passed through to a statistic.
///
/// Ordered, so two bags with the same entries serialize identically and
/// produce the same cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatOptions(BTreeMap<String, OptionValue>);

impl StatOptions {
    pub fn new() -> Self {
        StatOptions::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: OptionValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Boolean option, `default` when absent.
    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.0.get(name) {
            None => Ok(default),
            Some(OptionValue::Bool(b)) => Ok(*b),
            Some(other) => Err(CogdistError::InvalidOption {
                name: name.to_string(),
                reason: format!("expected a boolean, got {:?}", other),
            }),
        }
    }
}

/// A derived quantity computed from counts over a fixed space.
///
/// `name` identifies the statistic in cache keys: two statistics with the
/// same name are assumed to compute the same function.
pub trait Statistic: Send + Sync {
    fn name(&self) -> &str;

    fn compute(
        &self,
        space: &Matrix,
        counts: &CountVector,
        counts2: Option<&CountVector>,
        options: &StatOptions,
    ) -> Result<StatValue>;
}

fn second<'a>(name: &str, counts2: Option<&'a CountVector>) -> Result<&'a CountVector> {
    counts2.ok_or_else(|| CogdistError::MissingPortfolio(name.to_string()))
}

// ---------------------------------------------------------------------------
// Built-in statistics
// ---------------------------------------------------------------------------

/// Barycenter of one portfolio in coordinate space. Vector of length n.
#[derive(Debug, Clone, Copy, Default)]
pub struct Barycenter;

impl Statistic for Barycenter {
    fn name(&self) -> &str {
        "barycenter"
    }

    fn compute(
        &self,
        coords: &Matrix,
        counts: &CountVector,
        _counts2: Option<&CountVector>,
        _options: &StatOptions,
    ) -> Result<StatValue> {
        barycenter(counts, coords).map(StatValue::Vector)
    }
}

/// Similarity-adapted vector of one portfolio. Vector of length m.
///
/// Option `normalize` (bool, default `true`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityAdaptedVector;

impl Statistic for SimilarityAdaptedVector {
    fn name(&self) -> &str {
        "sa_vector"
    }

    fn compute(
        &self,
        sim: &Matrix,
        counts: &CountVector,
        _counts2: Option<&CountVector>,
        options: &StatOptions,
    ) -> Result<StatValue> {
        let normalize = options.bool_or("normalize", true)?;
        sa_vector(counts, sim, normalize).map(StatValue::Vector)
    }
}

/// Euclidean distance between the barycenters of two portfolios.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarycenterDistance;

impl Statistic for BarycenterDistance {
    fn name(&self) -> &str {
        "barycenter_distance"
    }

    fn compute(
        &self,
        coords: &Matrix,
        counts: &CountVector,
        counts2: Option<&CountVector>,
        _options: &StatOptions,
    ) -> Result<StatValue> {
        let other = second(self.name(), counts2)?;
        let a = barycenter(counts, coords)?;
        let b = barycenter(other, coords)?;
        euclidean_distance(&a, &b).map(StatValue::Scalar)
    }
}

/// Weighted cosine similarity between two publication vectors under a
/// similarity matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedCosineSimilarity;

impl Statistic for WeightedCosineSimilarity {
    fn name(&self) -> &str {
        "weighted_cosine"
    }

    fn compute(
        &self,
        sim: &Matrix,
        counts: &CountVector,
        counts2: Option<&CountVector>,
        _options: &StatOptions,
    ) -> Result<StatValue> {
        let other = second(self.name(), counts2)?;
        weighted_cosine(&counts.to_weights(), &other.to_weights(), sim).map(StatValue::Scalar)
    }
}

/// Euclidean distance between the similarity-adapted vectors of two
/// portfolios. Option `normalize` as for [`SimilarityAdaptedVector`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SaVectorDistance;

impl Statistic for SaVectorDistance {
    fn name(&self) -> &str {
        "sa_vector_distance"
    }

    fn compute(
        &self,
        sim: &Matrix,
        counts: &CountVector,
        counts2: Option<&CountVector>,
        options: &StatOptions,
    ) -> Result<StatValue> {
        let other = second(self.name(), counts2)?;
        let normalize = options.bool_or("normalize", true)?;
        let a = sa_vector(counts, sim, normalize)?;
        let b = sa_vector(other, sim, normalize)?;
        euclidean_distance(&a, &b).map(StatValue::Scalar)
    }
}

/// Names accepted by [`builtin`].
pub const BUILTIN_NAMES: &[&str] = &[
    "barycenter",
    "sa_vector",
    "barycenter_distance",
    "weighted_cosine",
    "sa_vector_distance",
];

/// Look up a built-in statistic by name.
pub fn builtin(name: &str) -> Result<Box<dyn Statistic>> {
    match name {
        "barycenter" => Ok(Box::new(Barycenter)),
        "sa_vector" => Ok(Box::new(SimilarityAdaptedVector)),
        "barycenter_distance" => Ok(Box::new(BarycenterDistance)),
        "weighted_cosine" => Ok(Box::new(WeightedCosineSimilarity)),
        "sa_vector_distance" => Ok(Box::new(SaVectorDistance)),
        _ => Err(CogdistError::UnknownStatistic(name.to_string())),
    }
}

/// Whether a built-in statistic operates on a similarity matrix rather
/// than on coordinates.
pub fn uses_similarity_space(name: &str) -> bool {
    matches!(name, "sa_vector" | "weighted_cosine" | "sa_vector_distance")
}

// ---------------------------------------------------------------------------
// Closure adapter
// ---------------------------------------------------------------------------

/// A closure registered under a name.
pub struct FnStatistic<F> {
    name: String,
    f: F,
}

impl<F> Statistic for FnStatistic<F>
where
    F: Fn(&Matrix, &CountVector, Option<&CountVector>, &StatOptions) -> Result<StatValue>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(
        &self,
        space: &Matrix,
        counts: &CountVector,
        counts2: Option<&CountVector>,
        options: &StatOptions,
    ) -> Result<StatValue> {
        (self.f)(space, counts, counts2, options)
    }
}

/// Wrap a closure as a [`Statistic`].
pub fn statistic_fn<F>(name: impl Into<String>, f: F) -> FnStatistic<F>
where
    F: Fn(&Matrix, &CountVector, Option<&CountVector>, &StatOptions) -> Result<StatValue>
        + Send
        + Sync,
{
    FnStatistic {
        name: name.into(),
        f,
    }
}
