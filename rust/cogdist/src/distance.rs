//! Portfolio statistics over a shared coordinate or similarity space.
//!
//! All functions are pure: given the same counts and space they return the
//! same values. Counts are taken as raw paper tallies per category; the
//! category order must match the row order of the space matrix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CogdistError, Result};
use crate::matrix::Matrix;

/// Fail unless `m` is square.
///
/// This is the only check applied before a similarity matrix is used by
/// [`sa_vector`] and [`weighted_cosine`]. See [`ensure_symmetric`] for the
/// stricter variant.
pub fn ensure_square(m: &Matrix) -> Result<()> {
    if !m.is_square() {
        return Err(CogdistError::NotSquare {
            rows: m.rows(),
            cols: m.cols(),
        });
    }
    Ok(())
}

/// Fail unless `m` is square and `|m[i][j] - m[j][i]| <= tolerance` everywhere.
pub fn ensure_symmetric(m: &Matrix, tolerance: f64) -> Result<()> {
    ensure_square(m)?;
    let n = m.rows();
    for i in 0..n {
        for j in (i + 1)..n {
            if (m.get(i, j) - m.get(j, i)).abs() > tolerance {
                return Err(CogdistError::NotSymmetric { row: i, col: j });
            }
        }
    }
    Ok(())
}

fn total_mass(counts: &[u64]) -> f64 {
    counts.iter().map(|&c| c as f64).sum()
}

/// Count-weighted centroid of a portfolio.
///
/// `coords` is m × n (m categories in n dimensions); `counts` has length m.
/// Returns the n coordinates of `Σ counts[i]·coords[i] / Σ counts`.
pub fn barycenter(counts: &[u64], coords: &Matrix) -> Result<Vec<f64>> {
    if counts.len() != coords.rows() {
        return Err(CogdistError::DimensionMismatch {
            context: "counts vs coordinate rows",
            expected: coords.rows(),
            found: counts.len(),
        });
    }
    let total = total_mass(counts);
    if total == 0.0 {
        return Err(CogdistError::ZeroTotal);
    }

    let mut center = vec![0.0; coords.cols()];
    for (row, &count) in coords.row_iter().zip(counts) {
        if count == 0 {
            continue;
        }
        let w = count as f64;
        for (acc, x) in center.iter_mut().zip(row) {
            *acc += w * x;
        }
    }
    for c in &mut center {
        *c /= total;
    }
    Ok(center)
}

/// Similarity-adapted vector: `v[i] = Σ_j sim[i][j]·counts[j]`.
///
/// With `normalize` the result is scaled to sum to 1.
pub fn sa_vector(counts: &[u64], sim_matrix: &Matrix, normalize: bool) -> Result<Vec<f64>> {
    ensure_square(sim_matrix)?;
    if counts.len() != sim_matrix.rows() {
        return Err(CogdistError::DimensionMismatch {
            context: "counts vs similarity matrix rows",
            expected: sim_matrix.rows(),
            found: counts.len(),
        });
    }

    let weights: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    let raw = sim_matrix.mul_vec(&weights)?;
    if !normalize {
        return Ok(raw);
    }

    let sum: f64 = raw.iter().sum();
    if sum == 0.0 {
        return Err(CogdistError::ZeroTotal);
    }
    Ok(raw.into_iter().map(|x| x / sum).collect())
}

/// Generalized cosine similarity under the inner product induced by `sim_matrix`:
/// `(u·S·v) / sqrt((u·S·u)(v·S·v))`.
pub fn weighted_cosine(u: &[f64], v: &[f64], sim_matrix: &Matrix) -> Result<f64> {
    ensure_square(sim_matrix)?;
    let m = sim_matrix.rows();
    for (context, len) in [("weighted cosine u", u.len()), ("weighted cosine v", v.len())] {
        if len != m {
            return Err(CogdistError::DimensionMismatch {
                context,
                expected: m,
                found: len,
            });
        }
    }

    let uv = sim_matrix.bilinear(u, v)?;
    let uu = sim_matrix.bilinear(u, u)?;
    let vv = sim_matrix.bilinear(v, v)?;
    Ok(uv / (uu * vv).sqrt())
}

/// L2 norm of `a - b`.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(CogdistError::DimensionMismatch {
            context: "euclidean distance operands",
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt())
}

/// Row-by-row Euclidean distance between two equally shaped matrices.
///
/// Returns one distance per row.
pub fn euclidean_distance_rows(a: &Matrix, b: &Matrix) -> Result<Vec<f64>> {
    if a.shape() != b.shape() {
        let (context, expected, found) = if a.rows() != b.rows() {
            ("euclidean distance row count", a.rows(), b.rows())
        } else {
            ("euclidean distance column count", a.cols(), b.cols())
        };
        return Err(CogdistError::DimensionMismatch {
            context,
            expected,
            found,
        });
    }
    a.row_iter()
        .zip(b.row_iter())
        .map(|(x, y)| euclidean_distance(x, y))
        .collect()
}

// ---------------------------------------------------------------------------
// Pairwise comparison matrices
// ---------------------------------------------------------------------------

/// Named distance metrics for [`as_square_matrix`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Metric {
    Euclidean,
    SqEuclidean,
    Cityblock,
    Chebyshev,
    Minkowski(f64),
    Cosine,
    Correlation,
    BrayCurtis,
    Canberra,
}

impl Metric {
    /// Distance between two equally long vectors.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let pairs = a.iter().zip(b);
        match *self {
            Metric::Euclidean => pairs.map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt(),
            Metric::SqEuclidean => pairs.map(|(x, y)| (x - y).powi(2)).sum(),
            Metric::Cityblock => pairs.map(|(x, y)| (x - y).abs()).sum(),
            Metric::Chebyshev => pairs.map(|(x, y)| (x - y).abs()).fold(0.0, f64::max),
            Metric::Minkowski(p) => pairs
                .map(|(x, y)| (x - y).abs().powf(p))
                .sum::<f64>()
                .powf(1.0 / p),
            Metric::Cosine => 1.0 - cosine_similarity(a, b),
            Metric::Correlation => {
                let ca = centered(a);
                let cb = centered(b);
                1.0 - cosine_similarity(&ca, &cb)
            }
            Metric::BrayCurtis => {
                let (num, den) = pairs.fold((0.0, 0.0), |(n, d), (x, y)| {
                    (n + (x - y).abs(), d + (x + y).abs())
                });
                num / den
            }
            Metric::Canberra => pairs
                .map(|(x, y)| {
                    let den = x.abs() + y.abs();
                    if den == 0.0 {
                        0.0
                    } else {
                        (x - y).abs() / den
                    }
                })
                .sum(),
        }
    }
}

impl FromStr for Metric {
    type Err = CogdistError;

    /// Accepts the names printed by `Display`. `minkowski` alone means p = 2;
    /// another exponent is written `minkowski(p=3)`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        if let Some(p) = lower
            .strip_prefix("minkowski(p=")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return match p.trim().parse::<f64>() {
                Ok(p) if p >= 1.0 => Ok(Metric::Minkowski(p)),
                _ => Err(CogdistError::InvalidOption {
                    name: "p".to_string(),
                    reason: format!("minkowski exponent must be a number >= 1, got '{}'", p),
                }),
            };
        }
        match lower.as_str() {
            "euclidean" => Ok(Metric::Euclidean),
            "sqeuclidean" => Ok(Metric::SqEuclidean),
            "cityblock" | "manhattan" => Ok(Metric::Cityblock),
            "chebyshev" => Ok(Metric::Chebyshev),
            "minkowski" => Ok(Metric::Minkowski(2.0)),
            "cosine" => Ok(Metric::Cosine),
            "correlation" => Ok(Metric::Correlation),
            "braycurtis" => Ok(Metric::BrayCurtis),
            "canberra" => Ok(Metric::Canberra),
            _ => Err(CogdistError::UnknownMetric(s.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Euclidean => write!(f, "euclidean"),
            Metric::SqEuclidean => write!(f, "sqeuclidean"),
            Metric::Cityblock => write!(f, "cityblock"),
            Metric::Chebyshev => write!(f, "chebyshev"),
            Metric::Minkowski(p) => write!(f, "minkowski(p={})", p),
            Metric::Cosine => write!(f, "cosine"),
            Metric::Correlation => write!(f, "correlation"),
            Metric::BrayCurtis => write!(f, "braycurtis"),
            Metric::Canberra => write!(f, "canberra"),
        }
    }
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    dot / (na * nb)
}

fn centered(v: &[f64]) -> Vec<f64> {
    let mean = v.iter().sum::<f64>() / v.len() as f64;
    v.iter().map(|x| x - mean).collect()
}

/// How rows are compared in [`as_square_matrix`].
pub enum CompareBy<'f> {
    /// Named distance metric; the diagonal is zero.
    Metric(Metric),
    /// Arbitrary distance or similarity. Evaluated on the diagonal too,
    /// since a similarity is not zero on self-comparison.
    Custom(&'f dyn Fn(&[f64], &[f64]) -> f64),
}

/// Pairwise comparison of every row of `m` against every other row.
///
/// The result is a symmetric `rows × rows` matrix: each unordered pair is
/// evaluated once and mirrored.
pub fn as_square_matrix(m: &Matrix, compare_by: CompareBy<'_>) -> Matrix {
    let n = m.rows();
    let mut out = Matrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let value = match &compare_by {
                CompareBy::Metric(_) if i == j => 0.0,
                CompareBy::Metric(metric) => metric.distance(m.row(i), m.row(j)),
                CompareBy::Custom(f) => f(m.row(i), m.row(j)),
            };
            out.set(i, j, value);
            out.set(j, i, value);
        }
    }
    out
}
