//! Scaling benchmarks for the bootstrap driver.
//!
//! Times barycenter and weighted-cosine bootstraps over growing portfolios
//! and category counts, sequential against parallel, and reports how the
//! 95% interval width shrinks as the portfolio grows.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use benchmarks::{kernel, random_coords, random_counts};
use cogdist::{
    as_square_matrix, bootstrap_samples, Barycenter, BootstrapConfig, BootstrapInput, CompareBy,
    NoCache, WeightedCosineSimilarity,
};

const NUM_SAMPLES: usize = 1000;

fn main() {
    println!("================================================================");
    println!("  SCALING BENCHMARKS: Bootstrap Intervals ({} samples)", NUM_SAMPLES);
    println!("================================================================\n");

    let mut rng = StdRng::seed_from_u64(12345);

    bench_portfolio_size(&mut rng);
    bench_category_count(&mut rng);
}

// ============================================================================
// Portfolio size: barycenter in 2-D
// ============================================================================

fn bench_portfolio_size(rng: &mut StdRng) {
    println!("  Barycenter, 250 categories, growing portfolio:\n");
    println!(
        "  {:>7} {:>12} {:>12} {:>8} {:>12}",
        "papers", "seq_ms", "par_ms", "speedup", "ci_width"
    );
    println!("  {}", "-".repeat(56));

    let coords = random_coords(250, 2, rng);
    for papers in [50u64, 200, 1_000, 5_000, 20_000] {
        let counts = random_counts(250, papers, rng);
        let input = BootstrapInput::new(&coords, &counts);

        let (seq_ms, samples) = timed(|| {
            let config = BootstrapConfig::with_samples(NUM_SAMPLES).seeded(1);
            bootstrap_samples(&Barycenter, &input, &config, &NoCache)
        });
        let (par_ms, _) = timed(|| {
            let config = BootstrapConfig::with_samples(NUM_SAMPLES).seeded(1).parallel(true);
            bootstrap_samples(&Barycenter, &input, &config, &NoCache)
        });

        let width = samples
            .and_then(|s| s.intervals(0.05))
            .map(|cis| cis.iter().map(|ci| ci.width()).sum::<f64>() / cis.len() as f64);

        match width {
            Ok(w) => println!(
                "  {:>7} {:>12.1} {:>12.1} {:>7.1}x {:>12.5}",
                papers,
                seq_ms,
                par_ms,
                seq_ms / par_ms.max(1e-9),
                w
            ),
            Err(e) => println!("  {:>7} FAILED: {}", papers, e),
        }
    }
    println!();
}

// ============================================================================
// Category count: weighted cosine over a similarity matrix
// ============================================================================

fn bench_category_count(rng: &mut StdRng) {
    println!("  Weighted cosine, 500 papers each, growing category count:\n");
    println!(
        "  {:>10} {:>12} {:>12} {:>8}",
        "categories", "seq_ms", "par_ms", "speedup"
    );
    println!("  {}", "-".repeat(46));

    for categories in [25usize, 50, 100, 200, 400] {
        let coords = random_coords(categories, 16, rng);
        let sim = as_square_matrix(&coords, CompareBy::Custom(&kernel));
        let a = random_counts(categories, 500, rng);
        let b = random_counts(categories, 500, rng);
        let input = BootstrapInput::new(&sim, &a).against(&b);

        let (seq_ms, seq) = timed(|| {
            let config = BootstrapConfig::with_samples(NUM_SAMPLES).seeded(2);
            bootstrap_samples(&WeightedCosineSimilarity, &input, &config, &NoCache)
        });
        let (par_ms, par) = timed(|| {
            let config = BootstrapConfig::with_samples(NUM_SAMPLES).seeded(2).parallel(true);
            bootstrap_samples(&WeightedCosineSimilarity, &input, &config, &NoCache)
        });

        if let Err(e) = seq.and(par) {
            println!("  {:>10} FAILED: {}", categories, e);
            continue;
        }
        println!(
            "  {:>10} {:>12.1} {:>12.1} {:>7.1}x",
            categories,
            seq_ms,
            par_ms,
            seq_ms / par_ms.max(1e-9)
        );
    }
    println!();
}

fn timed<T>(f: impl FnOnce() -> T) -> (f64, T) {
    let start = Instant::now();
    let out = f();
    (start.elapsed().as_secs_f64() * 1000.0, out)
}
