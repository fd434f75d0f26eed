//! JSON input document: a coordinate and/or similarity space plus named
//! portfolios.
//!
//! ```json
//! {
//!   "coords": [[0.0, 0.0], [1.0, 0.0]],
//!   "similarity": [[1.0, 0.2], [0.2, 1.0]],
//!   "portfolios": { "alice": [3, 1], "bob": [0, 4] }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::distance::{ensure_square, ensure_symmetric};
use crate::error::{CogdistError, Result};
use crate::matrix::Matrix;
use crate::resample::CountVector;
use crate::statistic::uses_similarity_space;

/// Largest absolute asymmetry tolerated in a loaded similarity matrix.
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioInput {
    #[serde(default)]
    pub coords: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub similarity: Option<Vec<Vec<f64>>>,
    pub portfolios: BTreeMap<String, Vec<i64>>,
}

impl PortfolioInput {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Coordinate matrix, m categories by n dimensions.
    pub fn coords(&self) -> Result<Matrix> {
        let rows = self
            .coords
            .clone()
            .ok_or(CogdistError::MissingSpace("coordinate"))?;
        Matrix::from_rows(rows)
    }

    /// Similarity matrix, checked square and symmetric.
    pub fn similarity(&self) -> Result<Matrix> {
        let rows = self
            .similarity
            .clone()
            .ok_or(CogdistError::MissingSpace("similarity"))?;
        let sim = Matrix::from_rows(rows)?;
        ensure_square(&sim)?;
        ensure_symmetric(&sim, SYMMETRY_TOLERANCE)?;
        Ok(sim)
    }

    /// The space a built-in statistic operates on.
    pub fn space_for(&self, statistic: &str) -> Result<Matrix> {
        if uses_similarity_space(statistic) {
            self.similarity()
        } else {
            self.coords()
        }
    }

    pub fn portfolio(&self, name: &str) -> Result<CountVector> {
        let counts = self
            .portfolios
            .get(name)
            .ok_or_else(|| CogdistError::UnknownPortfolio(name.to_string()))?;
        CountVector::from_signed(counts)
    }

    pub fn portfolio_names(&self) -> impl Iterator<Item = &str> {
        self.portfolios.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "coords": [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
        "similarity": [[1.0, 0.5, 0.0], [0.5, 1.0, 0.2], [0.0, 0.2, 1.0]],
        "portfolios": { "alice": [3, 0, 1], "bob": [0, -2, 4] }
    }"#;

    #[test]
    fn test_space_selection() {
        let input: PortfolioInput = serde_json::from_str(DOC).unwrap();
        assert_eq!(input.space_for("barycenter").unwrap().shape(), (3, 2));
        assert_eq!(input.space_for("sa_vector").unwrap().shape(), (3, 3));
        assert_eq!(input.space_for("weighted_cosine").unwrap().shape(), (3, 3));
    }

    #[test]
    fn test_missing_space() {
        let input: PortfolioInput =
            serde_json::from_str(r#"{"portfolios": {"a": [1]}}"#).unwrap();
        assert!(matches!(
            input.space_for("barycenter"),
            Err(CogdistError::MissingSpace("coordinate"))
        ));
        assert!(matches!(
            input.space_for("sa_vector"),
            Err(CogdistError::MissingSpace("similarity"))
        ));
    }

    #[test]
    fn test_asymmetric_similarity_rejected() {
        let mut input: PortfolioInput = serde_json::from_str(DOC).unwrap();
        input.similarity = Some(vec![vec![1.0, 0.3], vec![0.1, 1.0]]);
        assert!(matches!(
            input.similarity(),
            Err(CogdistError::NotSymmetric { .. })
        ));
        input.similarity = Some(vec![vec![1.0, 0.3, 0.0], vec![0.3, 1.0, 0.0]]);
        assert!(matches!(input.similarity(), Err(CogdistError::NotSquare { .. })));
    }

    #[test]
    fn test_portfolio_lookup() {
        let input: PortfolioInput = serde_json::from_str(DOC).unwrap();
        assert_eq!(input.portfolio("alice").unwrap().as_slice(), &[3, 0, 1]);
        assert!(matches!(
            input.portfolio("bob"),
            Err(CogdistError::NegativeCount { index: 1, value: -2 })
        ));
        assert!(matches!(
            input.portfolio("carol"),
            Err(CogdistError::UnknownPortfolio(_))
        ));
        assert_eq!(input.portfolio_names().collect::<Vec<_>>(), vec!["alice", "bob"]);
    }
}
