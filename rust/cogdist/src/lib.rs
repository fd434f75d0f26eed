//! cogdist: cognitive distance between publication portfolios, with
//! bootstrap confidence intervals.
//!
//! A portfolio is a vector of paper counts per category. Categories live in
//! a fixed space: either coordinates (one row per category) or a pairwise
//! similarity matrix. Statistics such as the barycenter or the weighted
//! cosine similarity of two portfolios are computed over that space, and
//! their sampling uncertainty is estimated by resampling papers with
//! replacement.
//!
//! ```no_run
//! use cogdist::{
//!     bootstrap_samples, Barycenter, BootstrapConfig, BootstrapInput, CountVector, DiskCache,
//!     Matrix,
//! };
//!
//! let coords = Matrix::from_rows(vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]])?;
//! let counts = CountVector::new(vec![5, 0, 4]);
//! let input = BootstrapInput::new(&coords, &counts);
//! let samples = bootstrap_samples(
//!     &Barycenter,
//!     &input,
//!     &BootstrapConfig::default(),
//!     &DiskCache::default(),
//! )?;
//! let intervals = samples.intervals(0.05)?;
//! # Ok::<(), cogdist::CogdistError>(())
//! ```

pub mod bootstrap;
pub mod cache;
pub mod distance;
pub mod error;
pub mod input;
pub mod interval;
pub mod matrix;
pub mod report;
pub mod resample;
pub mod statistic;

pub use bootstrap::{
    bootstrap_replication, bootstrap_samples, draw_samples, point_estimate, BootstrapConfig,
    BootstrapInput, Bootstrapper, SampleCollection,
};
pub use cache::{CacheKey, DiskCache, MemoryCache, NoCache, SampleCache};
pub use distance::{
    as_square_matrix, barycenter, euclidean_distance, euclidean_distance_rows, sa_vector,
    weighted_cosine, CompareBy, Metric,
};
pub use error::{CogdistError, Result};
pub use interval::{
    check_alpha, column_intervals, confidence_interval, intervals_overlap, ConfidenceInterval,
};
pub use matrix::Matrix;
pub use resample::{bootstrap_sample, CountVector};
pub use statistic::{
    builtin, statistic_fn, Barycenter, BarycenterDistance, OptionValue, SaVectorDistance,
    SimilarityAdaptedVector, StatOptions, StatValue, Statistic, WeightedCosineSimilarity,
};
