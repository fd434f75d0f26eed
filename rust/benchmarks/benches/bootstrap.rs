use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use benchmarks::{kernel, random_coords, random_counts};
use cogdist::{
    as_square_matrix, bootstrap_sample, bootstrap_samples, confidence_interval, Barycenter,
    BootstrapConfig, BootstrapInput, CompareBy, NoCache, WeightedCosineSimilarity,
};

fn bench_bootstrap_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("bootstrap_sample");
    let mut rng = StdRng::seed_from_u64(1);

    for papers in [100u64, 1_000, 10_000] {
        let counts = random_counts(250, papers, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(papers), &counts, |b, counts| {
            let mut rng = StdRng::seed_from_u64(2);
            b.iter(|| bootstrap_sample(counts, &mut rng).unwrap());
        });
    }

    group.finish();
}

fn bench_barycenter_bootstrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("barycenter_bootstrap");
    group.sample_size(10);
    let mut rng = StdRng::seed_from_u64(3);
    let coords = random_coords(250, 2, &mut rng);
    let counts = random_counts(250, 500, &mut rng);
    let input = BootstrapInput::new(&coords, &counts);

    for parallel in [false, true] {
        let config = BootstrapConfig::with_samples(1000).seeded(4).parallel(parallel);
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_with_input(BenchmarkId::from_parameter(label), &config, |b, config| {
            b.iter(|| bootstrap_samples(&Barycenter, &input, config, &NoCache).unwrap());
        });
    }

    group.finish();
}

fn bench_weighted_cosine_bootstrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("weighted_cosine_bootstrap");
    group.sample_size(10);
    let mut rng = StdRng::seed_from_u64(5);

    for categories in [50, 150] {
        let coords = random_coords(categories, 8, &mut rng);
        let sim = as_square_matrix(&coords, CompareBy::Custom(&kernel));
        let a = random_counts(categories, 300, &mut rng);
        let b = random_counts(categories, 300, &mut rng);
        let config = BootstrapConfig::with_samples(200).seeded(6).parallel(true);
        group.bench_with_input(BenchmarkId::from_parameter(categories), &sim, |bench, sim| {
            let input = BootstrapInput::new(sim, &a).against(&b);
            bench.iter(|| {
                bootstrap_samples(&WeightedCosineSimilarity, &input, &config, &NoCache).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_confidence_interval(c: &mut Criterion) {
    let mut group = c.benchmark_group("confidence_interval");
    let mut rng = StdRng::seed_from_u64(7);

    for n in [1_000usize, 10_000, 100_000] {
        let samples: Vec<f64> = (0..n).map(|_| rng.gen()).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &samples, |b, samples| {
            b.iter(|| confidence_interval(samples, 0.05).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_bootstrap_sample,
    bench_barycenter_bootstrap,
    bench_weighted_cosine_bootstrap,
    bench_confidence_interval
);
criterion_main!(benches);
