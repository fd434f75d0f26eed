//! Error type shared by every module of the crate.

use std::path::PathBuf;

/// Errors raised while computing portfolio statistics, resampling,
/// caching or estimating intervals.
#[derive(Debug, thiserror::Error)]
pub enum CogdistError {
    #[error("{context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("matrix is not square ({rows} x {cols})")]
    NotSquare { rows: usize, cols: usize },

    #[error("matrix is not symmetric: entry ({row}, {col}) differs from ({col}, {row})")]
    NotSymmetric { row: usize, col: usize },

    #[error("negative count {value} at position {index}")]
    NegativeCount { index: usize, value: i64 },

    #[error("count vector is empty")]
    EmptyCounts,

    #[error("total mass is zero; nothing to weight or resample")]
    ZeroTotal,

    #[error("invalid significance level {0} (must be strictly between 0 and 1)")]
    InvalidAlpha(f64),

    #[error("invalid number of bootstrap samples {0} (must be at least 1)")]
    InvalidSampleCount(usize),

    #[error("sample collection is empty")]
    EmptySamples,

    #[error("statistic '{statistic}' returned inconsistent output: {reason}")]
    InconsistentStatistic { statistic: String, reason: String },

    #[error("statistic '{0}' compares two portfolios but only one was given")]
    MissingPortfolio(String),

    #[error("invalid option '{name}': {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("unknown distance metric '{0}'")]
    UnknownMetric(String),

    #[error("unknown statistic '{0}'")]
    UnknownStatistic(String),

    #[error("no portfolio named '{0}' in input")]
    UnknownPortfolio(String),

    #[error("input has no {0} matrix")]
    MissingSpace(&'static str),

    #[error("malformed interval table: {0}")]
    Table(String),

    #[error("cache entry {path} is unusable: {reason}")]
    Cache { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CogdistError>;
