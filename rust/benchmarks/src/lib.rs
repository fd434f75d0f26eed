//! Random workloads shared by the criterion benches and the scaling binary.

use rand::rngs::StdRng;
use rand::Rng;

use cogdist::{CountVector, Matrix, Metric};

/// Coordinates drawn uniformly from [-1, 1) in every dimension.
pub fn random_coords(categories: usize, dims: usize, rng: &mut StdRng) -> Matrix {
    let mut coords = Matrix::zeros(categories, dims);
    for i in 0..categories {
        for j in 0..dims {
            coords.set(i, j, rng.gen_range(-1.0..1.0));
        }
    }
    coords
}

/// Similarity decaying with Euclidean distance, 1 on the diagonal.
pub fn kernel(a: &[f64], b: &[f64]) -> f64 {
    (-Metric::Euclidean.distance(a, b)).exp()
}

/// Portfolio of `papers` papers spread uniformly over the categories.
pub fn random_counts(categories: usize, papers: u64, rng: &mut StdRng) -> CountVector {
    let mut counts = vec![0u64; categories];
    for _ in 0..papers {
        counts[rng.gen_range(0..categories)] += 1;
    }
    CountVector::new(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_workload_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let coords = random_coords(7, 3, &mut rng);
        assert_eq!((coords.rows(), coords.cols()), (7, 3));
        assert!(coords.as_slice().iter().all(|x| (-1.0..1.0).contains(x)));

        let counts = random_counts(7, 40, &mut rng);
        assert_eq!(counts.len(), 7);
        assert_eq!(counts.total(), 40);

        let a = coords.row(0);
        assert_eq!(kernel(a, a), 1.0);
    }
}
