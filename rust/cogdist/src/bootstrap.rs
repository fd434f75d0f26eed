//! Bootstrap driver: repeated resampling through a statistic, memoized.
//!
//! One *replication* resamples the count vector(s) once and evaluates the
//! statistic on the replicate. [`bootstrap_samples`] repeats that
//! `num_samples` times and stores the outputs in generation order.
//!
//! # Stale realizations
//!
//! Runs are memoized by [`CacheKey`], which covers the statistic name and
//! every argument but not the seed. Calling [`bootstrap_samples`] twice with
//! the same arguments returns the *same* collection the first call stored,
//! not a fresh bootstrap. Pass [`NoCache`](crate::cache::NoCache) or clear
//! the cache to draw a new realization.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, SampleCache};
use crate::error::{CogdistError, Result};
use crate::interval::{column_intervals, confidence_interval, ConfidenceInterval};
use crate::matrix::Matrix;
use crate::resample::{bootstrap_sample, CountVector};
use crate::statistic::{StatOptions, StatValue, Statistic};

/// Replicates handled by one parallel work item, each item with its own RNG.
const PARALLEL_CHUNK: usize = 64;

/// Outputs of all replicates of one bootstrap run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SampleCollection {
    /// One value per replicate.
    Scalars(Vec<f64>),
    /// One row per replicate, one column per dimension.
    Vectors(Matrix),
}

impl SampleCollection {
    /// Number of replicates.
    pub fn len(&self) -> usize {
        match self {
            SampleCollection::Scalars(v) => v.len(),
            SampleCollection::Vectors(m) => m.rows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensions per replicate (1 for scalars).
    pub fn dims(&self) -> usize {
        match self {
            SampleCollection::Scalars(_) => 1,
            SampleCollection::Vectors(m) => m.cols(),
        }
    }

    /// Every value in generation order, row-major for vectors.
    pub fn as_flat(&self) -> &[f64] {
        match self {
            SampleCollection::Scalars(v) => v,
            SampleCollection::Vectors(m) => m.as_slice(),
        }
    }

    /// Percentile interval per dimension.
    pub fn intervals(&self, alpha: f64) -> Result<Vec<ConfidenceInterval>> {
        match self {
            SampleCollection::Scalars(v) => Ok(vec![confidence_interval(v, alpha)?]),
            SampleCollection::Vectors(m) => column_intervals(m, alpha),
        }
    }

    fn from_values(statistic: &str, values: Vec<StatValue>) -> Result<Self> {
        let inconsistent = |reason: String| CogdistError::InconsistentStatistic {
            statistic: statistic.to_string(),
            reason,
        };

        match values.first() {
            None => Err(CogdistError::EmptySamples),
            Some(StatValue::Scalar(_)) => values
                .into_iter()
                .enumerate()
                .map(|(i, v)| match v {
                    StatValue::Scalar(x) => Ok(x),
                    StatValue::Vector(_) => {
                        Err(inconsistent(format!("replicate {} returned a vector", i)))
                    }
                })
                .collect::<Result<Vec<f64>>>()
                .map(SampleCollection::Scalars),
            Some(StatValue::Vector(first)) => {
                let dims = first.len();
                let rows = values.len();
                let mut data = Vec::with_capacity(rows * dims);
                for (i, v) in values.into_iter().enumerate() {
                    match v {
                        StatValue::Vector(row) if row.len() == dims => data.extend(row),
                        StatValue::Vector(row) => {
                            return Err(inconsistent(format!(
                                "replicate {} has {} dimensions, expected {}",
                                i,
                                row.len(),
                                dims
                            )))
                        }
                        StatValue::Scalar(_) => {
                            return Err(inconsistent(format!("replicate {} returned a scalar", i)))
                        }
                    }
                }
                Matrix::new(rows, dims, data).map(SampleCollection::Vectors)
            }
        }
    }
}

/// The fixed inputs of a bootstrap run: space, portfolios and options.
#[derive(Debug, Clone)]
pub struct BootstrapInput<'a> {
    pub space: &'a Matrix,
    pub counts: &'a CountVector,
    pub counts2: Option<&'a CountVector>,
    pub options: StatOptions,
}

impl<'a> BootstrapInput<'a> {
    /// Single portfolio over `space`, no options.
    pub fn new(space: &'a Matrix, counts: &'a CountVector) -> Self {
        BootstrapInput {
            space,
            counts,
            counts2: None,
            options: StatOptions::new(),
        }
    }

    /// Add a second portfolio, resampled independently of the first.
    pub fn against(mut self, counts2: &'a CountVector) -> Self {
        self.counts2 = Some(counts2);
        self
    }

    pub fn with_options(mut self, options: StatOptions) -> Self {
        self.options = options;
        self
    }

    fn cache_key(&self, statistic: &str, num_samples: usize) -> Result<CacheKey> {
        CacheKey::new(
            statistic,
            self.space,
            self.counts,
            self.counts2,
            num_samples,
            &self.options,
        )
    }
}

/// Configuration for a bootstrap run.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Number of replicates (default: 1000).
    pub num_samples: usize,
    /// Base seed; drawn from entropy when `None`. Not part of the cache key.
    pub seed: Option<u64>,
    /// Spread replicates over the rayon pool.
    pub parallel: bool,
    /// Log progress every this many replicates (0 disables).
    pub progress_every: usize,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            num_samples: 1000,
            seed: None,
            parallel: false,
            progress_every: 100,
        }
    }
}

impl BootstrapConfig {
    pub fn with_samples(num_samples: usize) -> Self {
        BootstrapConfig {
            num_samples,
            ..Default::default()
        }
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Draw one replicate of each portfolio and evaluate `statistic` on it.
///
/// The statistic's output is returned unmodified.
pub fn bootstrap_replication<R: Rng>(
    statistic: &dyn Statistic,
    input: &BootstrapInput<'_>,
    rng: &mut R,
) -> Result<StatValue> {
    let replicate = bootstrap_sample(input.counts, rng)?;
    let replicate2 = match input.counts2 {
        Some(counts2) => Some(bootstrap_sample(counts2, rng)?),
        None => None,
    };
    statistic.compute(input.space, &replicate, replicate2.as_ref(), &input.options)
}

/// Run `num_samples` replications sequentially with the given RNG, without
/// consulting any cache.
pub fn draw_samples<R: Rng>(
    statistic: &dyn Statistic,
    input: &BootstrapInput<'_>,
    num_samples: usize,
    rng: &mut R,
) -> Result<SampleCollection> {
    if num_samples == 0 {
        return Err(CogdistError::InvalidSampleCount(num_samples));
    }
    let values = (0..num_samples)
        .map(|_| bootstrap_replication(statistic, input, rng))
        .collect::<Result<Vec<_>>>()?;
    SampleCollection::from_values(statistic.name(), values)
}

/// Memoized bootstrap run. See the module docs for the caching caveat.
pub fn bootstrap_samples(
    statistic: &dyn Statistic,
    input: &BootstrapInput<'_>,
    config: &BootstrapConfig,
    cache: &dyn SampleCache,
) -> Result<SampleCollection> {
    Bootstrapper::new(config.clone(), cache).run(statistic, input)
}

/// Evaluate `statistic` on the observed (not resampled) portfolios.
pub fn point_estimate(statistic: &dyn Statistic, input: &BootstrapInput<'_>) -> Result<StatValue> {
    statistic.compute(input.space, input.counts, input.counts2, &input.options)
}

type ProgressFn<'a> = Box<dyn Fn(usize, usize) + Send + Sync + 'a>;

/// Bootstrap driver bound to a configuration and a cache, with an optional
/// progress observer.
pub struct Bootstrapper<'a> {
    config: BootstrapConfig,
    cache: &'a dyn SampleCache,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(config: BootstrapConfig, cache: &'a dyn SampleCache) -> Self {
        Bootstrapper {
            config,
            cache,
            progress: None,
        }
    }

    /// Call `f(completed, total)` after every replicate. Under `parallel`
    /// the calls come from worker threads, in completion order.
    pub fn with_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Return the cached collection for these arguments, or draw, store and
    /// return a new one.
    pub fn run(
        &self,
        statistic: &dyn Statistic,
        input: &BootstrapInput<'_>,
    ) -> Result<SampleCollection> {
        let num_samples = self.config.num_samples;
        if num_samples == 0 {
            return Err(CogdistError::InvalidSampleCount(num_samples));
        }

        let key = input.cache_key(statistic.name(), num_samples)?;
        if let Some(samples) = self.cache.get(&key)? {
            log::debug!(
                "Cache hit for '{}' ({}): reusing stored realization of {} samples",
                statistic.name(),
                key,
                samples.len()
            );
            return Ok(samples);
        }

        let seed = self.config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        log::info!(
            "Drawing {} replicates of '{}' ({}, seed {}{})",
            num_samples,
            statistic.name(),
            key,
            seed,
            if self.config.parallel { ", parallel" } else { "" }
        );

        let start = Instant::now();
        let values = if self.config.parallel {
            self.draw_parallel(statistic, input, seed)?
        } else {
            self.draw_sequential(statistic, input, seed)?
        };
        let samples = SampleCollection::from_values(statistic.name(), values)?;
        log::info!(
            "Drew {} replicates of '{}' in {:.2?}",
            num_samples,
            statistic.name(),
            start.elapsed()
        );

        self.cache.put(&key, &samples)?;
        Ok(samples)
    }

    fn draw_sequential(
        &self,
        statistic: &dyn Statistic,
        input: &BootstrapInput<'_>,
        seed: u64,
    ) -> Result<Vec<StatValue>> {
        let total = self.config.num_samples;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values = Vec::with_capacity(total);
        for i in 0..total {
            values.push(bootstrap_replication(statistic, input, &mut rng)?);
            self.report(statistic.name(), i + 1, total);
        }
        Ok(values)
    }

    fn draw_parallel(
        &self,
        statistic: &dyn Statistic,
        input: &BootstrapInput<'_>,
        seed: u64,
    ) -> Result<Vec<StatValue>> {
        let total = self.config.num_samples;
        let num_chunks = (total + PARALLEL_CHUNK - 1) / PARALLEL_CHUNK;
        let completed = AtomicUsize::new(0);

        let chunks = (0..num_chunks)
            .into_par_iter()
            .map(|chunk| -> Result<Vec<StatValue>> {
                let mut rng = StdRng::seed_from_u64(chunk_seed(seed, chunk));
                let len = PARALLEL_CHUNK.min(total - chunk * PARALLEL_CHUNK);
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(bootstrap_replication(statistic, input, &mut rng)?);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    self.report(statistic.name(), done, total);
                }
                Ok(values)
            })
            .collect::<Result<Vec<Vec<StatValue>>>>()?;

        Ok(chunks.into_iter().flatten().collect())
    }

    fn report(&self, statistic: &str, done: usize, total: usize) {
        if let Some(progress) = &self.progress {
            progress(done, total);
        }
        let every = self.config.progress_every;
        if every > 0 && (done % every == 0 || done == total) {
            log::debug!("'{}': {}/{} replicates", statistic, done, total);
        }
    }
}

/// Independent stream seed for one parallel chunk.
fn chunk_seed(seed: u64, chunk: usize) -> u64 {
    seed ^ (chunk as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}
