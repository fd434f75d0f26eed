//! Integration tests for the cogdist crate.
//!
//! Tests cover:
//! - End-to-end barycenter bootstrap with interval bracketing
//! - Two-portfolio statistics over a similarity space
//! - Disk cache idempotence across cache instances
//! - Overlap report from a merged-cell interval table

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use cogdist::input::PortfolioInput;
use cogdist::report::{self, IntervalTable, PANEL_LABELS};
use cogdist::statistic::{self, OptionValue};
use cogdist::{
    as_square_matrix, bootstrap_samples, point_estimate, Barycenter, BootstrapConfig,
    BootstrapInput, CompareBy, CountVector, DiskCache, Matrix, Metric, NoCache,
    SampleCollection, StatOptions, StatValue, WeightedCosineSimilarity,
};

fn bits(samples: &SampleCollection) -> Vec<u64> {
    samples.as_flat().iter().map(|x| x.to_bits()).collect()
}

fn coords() -> Matrix {
    Matrix::from_rows(vec![
        vec![0.0, 0.0],
        vec![3.0, 1.0],
        vec![1.0, 2.0],
        vec![2.0, 0.5],
        vec![-1.0, 4.0],
    ])
    .unwrap()
}

// ---------------------------------------------------------------------------
// End-to-end bootstrap
// ---------------------------------------------------------------------------

#[test]
fn test_barycenter_interval_brackets_estimate() {
    let space = coords();
    let counts = CountVector::new(vec![5, 0, 4, 10, 0]);
    let input = BootstrapInput::new(&space, &counts);

    let estimate = match point_estimate(&Barycenter, &input).unwrap() {
        StatValue::Vector(v) => v,
        other => panic!("expected vector estimate, got {:?}", other),
    };

    let mut bracketed = 0;
    let trials = 20;
    for seed in 0..trials {
        let config = BootstrapConfig::with_samples(1000).seeded(seed);
        let samples = bootstrap_samples(&Barycenter, &input, &config, &NoCache).unwrap();
        assert_eq!(samples.len(), 1000);
        let intervals = samples.intervals(0.05).unwrap();
        assert_eq!(intervals.len(), 2);
        if intervals
            .iter()
            .zip(&estimate)
            .all(|(ci, &x)| ci.contains(x))
        {
            bracketed += 1;
        }
    }
    assert!(
        bracketed >= trials - 1,
        "estimate bracketed in only {}/{} runs",
        bracketed,
        trials
    );
}

#[test]
fn test_bootstrap_only_moves_within_observed_categories() {
    // Only categories 0 and 2 are populated, so every replicate barycenter
    // lies on the segment between their coordinates.
    let space = coords();
    let counts = CountVector::new(vec![3, 0, 7, 0, 0]);
    let input = BootstrapInput::new(&space, &counts);
    let config = BootstrapConfig::with_samples(300).seeded(5).parallel(true);
    let samples = bootstrap_samples(&Barycenter, &input, &config, &NoCache).unwrap();
    let SampleCollection::Vectors(m) = samples else {
        panic!("expected vector samples");
    };
    for row in m.row_iter() {
        assert!((row[1] - 2.0 * row[0]).abs() < 1e-9, "off segment: {:?}", row);
    }
}

#[test]
fn test_weighted_cosine_over_similarity_space() {
    let space = coords();
    let sim = as_square_matrix(
        &space,
        CompareBy::Custom(&|a: &[f64], b: &[f64]| {
            let d = Metric::Euclidean.distance(a, b);
            (-d).exp()
        }),
    );
    let a = CountVector::new(vec![5, 0, 4, 10, 0]);
    let b = CountVector::new(vec![1, 6, 0, 2, 3]);
    let input = BootstrapInput::new(&sim, &a).against(&b);

    let config = BootstrapConfig::with_samples(400).seeded(17);
    let samples =
        bootstrap_samples(&WeightedCosineSimilarity, &input, &config, &NoCache).unwrap();
    let SampleCollection::Scalars(values) = &samples else {
        panic!("expected scalar samples");
    };
    assert!(values.iter().all(|v| (0.0..=1.0 + 1e-9).contains(v)));

    let ci = samples.intervals(0.05).unwrap()[0];
    assert!(ci.lower <= ci.upper);
}

// ---------------------------------------------------------------------------
// Disk cache
// ---------------------------------------------------------------------------

#[test]
fn test_disk_cache_idempotent_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let space = coords();
    let counts = CountVector::new(vec![5, 0, 4, 10, 0]);
    let input = BootstrapInput::new(&space, &counts);

    let first = {
        let cache = DiskCache::new(dir.path());
        let config = BootstrapConfig::with_samples(200).seeded(1);
        bootstrap_samples(&Barycenter, &input, &config, &cache).unwrap()
    };

    // A fresh instance over the same directory returns the stored
    // realization even with a different seed.
    let cache = DiskCache::new(dir.path());
    let config = BootstrapConfig::with_samples(200).seeded(2);
    let second = bootstrap_samples(&Barycenter, &input, &config, &cache).unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.len().unwrap(), 1);

    // Without the cache the second seed gives a different realization.
    let fresh = bootstrap_samples(&Barycenter, &input, &config, &NoCache).unwrap();
    assert_ne!(first, fresh);

    assert_eq!(cache.clear().unwrap(), 1);
    assert!(cache.is_empty().unwrap());
}

#[test]
fn test_disk_cache_hit_is_bit_identical_to_miss() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::new(dir.path());
    let space = Matrix::from_rows(vec![
        vec![0.1234567, 0.7654321],
        vec![1.0 / 3.0, 0.2],
        vec![0.3141592, 2.7182818],
        vec![0.1, 0.7],
        vec![-0.4444444, 0.9],
    ])
    .unwrap();
    let counts = CountVector::new(vec![5, 0, 4, 10, 0]);

    for seed in 0..5u64 {
        // Distinct sample counts give each seed its own key.
        let config = BootstrapConfig::with_samples(500 + seed as usize).seeded(seed);
        let input = BootstrapInput::new(&space, &counts);
        let miss = bootstrap_samples(&Barycenter, &input, &config, &cache).unwrap();
        let hit = bootstrap_samples(&Barycenter, &input, &config, &cache).unwrap();
        assert_eq!(bits(&miss), bits(&hit), "seed {}", seed);
    }
    assert_eq!(cache.len().unwrap(), 5);
}

#[test]
fn test_disk_cache_memoizes_non_finite_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::new(dir.path());
    let space = coords();
    // Category 1 holds one paper in ten, so many replicates lose it.
    let counts = CountVector::new(vec![5, 1, 4, 0, 0]);
    let input = BootstrapInput::new(&space, &counts);

    let calls = AtomicUsize::new(0);
    let share = statistic::statistic_fn("category_one_ratio", |_s, c, _c2, _o| {
        calls.fetch_add(1, Ordering::Relaxed);
        let x = c[1] as f64;
        Ok(StatValue::Scalar(x / x))
    });
    let config = BootstrapConfig::with_samples(200).seeded(13);

    let first = bootstrap_samples(&share, &input, &config, &cache).unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 200);
    assert!(first.as_flat().iter().any(|x| x.is_nan()));

    let second = bootstrap_samples(&share, &input, &config, &cache).unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 200, "second call must be a hit");
    assert_eq!(bits(&first), bits(&second));
}

#[test]
fn test_disk_cache_keys_on_options_and_sample_count() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::new(dir.path());
    let space = coords();
    let sim = as_square_matrix(&space, CompareBy::Metric(Metric::Euclidean));
    let counts = CountVector::new(vec![5, 0, 4, 10, 0]);
    let sa = statistic::builtin("sa_vector").unwrap();

    let normalized = BootstrapInput::new(&sim, &counts);
    let raw = BootstrapInput::new(&sim, &counts)
        .with_options(StatOptions::new().with("normalize", OptionValue::Bool(false)));

    let config = BootstrapConfig::with_samples(50).seeded(3);
    bootstrap_samples(sa.as_ref(), &normalized, &config, &cache).unwrap();
    bootstrap_samples(sa.as_ref(), &raw, &config, &cache).unwrap();
    bootstrap_samples(
        sa.as_ref(),
        &normalized,
        &BootstrapConfig::with_samples(60).seeded(3),
        &cache,
    )
    .unwrap();
    assert_eq!(cache.len().unwrap(), 3);
}

#[test]
fn test_corrupt_cache_file_is_recomputed() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::new(dir.path());
    let space = coords();
    let counts = CountVector::new(vec![1, 2, 3, 4, 5]);
    let input = BootstrapInput::new(&space, &counts);
    let config = BootstrapConfig::with_samples(20).seeded(8);

    let original = bootstrap_samples(&Barycenter, &input, &config, &cache).unwrap();
    for entry in fs::read_dir(dir.path()).unwrap() {
        fs::write(entry.unwrap().path(), b"{ not json").unwrap();
    }
    let again = bootstrap_samples(&Barycenter, &input, &config, &cache).unwrap();
    assert_eq!(original, again, "same seed redraws the same realization");
    assert_eq!(cache.len().unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Input documents and reports
// ---------------------------------------------------------------------------

#[test]
fn test_portfolio_input_round_trip_through_bootstrap() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.json");
    fs::write(
        &path,
        r#"{
            "coords": [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            "portfolios": { "alice": [2, 2, 2, 2], "bob": [0, 0, 0, 8] }
        }"#,
    )
    .unwrap();

    let doc = PortfolioInput::from_json_file(&path).unwrap();
    let space = doc.space_for("barycenter_distance").unwrap();
    let alice = doc.portfolio("alice").unwrap();
    let bob = doc.portfolio("bob").unwrap();
    let stat = statistic::builtin("barycenter_distance").unwrap();
    let input = BootstrapInput::new(&space, &alice).against(&bob);

    let estimate = point_estimate(stat.as_ref(), &input).unwrap();
    match estimate {
        StatValue::Scalar(d) => assert!((d - 0.5f64.hypot(0.5)).abs() < 1e-12),
        other => panic!("expected scalar, got {:?}", other),
    }

    let config = BootstrapConfig::with_samples(100).seeded(4);
    let samples = bootstrap_samples(stat.as_ref(), &input, &config, &NoCache).unwrap();
    assert_eq!(samples.len(), 100);
}

#[test]
fn test_overlap_report_from_merged_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.json");
    fs::write(
        &path,
        r#"{
            "groups": ["cosine"],
            "rows": [
                {"entity": "PM1", "stat": "actual", "values": [0.42]},
                {"entity": null,  "stat": "lower",  "values": [0.35]},
                {"entity": null,  "stat": "upper",  "values": [0.50]},
                {"entity": "PM2", "stat": "actual", "values": [0.47]},
                {"stat": "lower", "values": [0.40]},
                {"stat": "upper", "values": [0.55]},
                {"entity": "PM3", "stat": "actual", "values": [0.80]},
                {"stat": "lower", "values": [0.70]},
                {"stat": "upper", "values": [0.90]},
                {"entity": "Panel together", "stat": "actual", "values": [0.10]},
                {"stat": "lower", "values": [0.05]},
                {"stat": "upper", "values": [0.15]}
            ]
        }"#,
    )
    .unwrap();

    let table = report::fix_merged_cells(IntervalTable::from_json_file(&path).unwrap()).unwrap();
    let entries = table.group("cosine").unwrap();
    assert_eq!(entries.len(), 4);

    let bottom = report::overlap_report(&entries, true, PANEL_LABELS).unwrap();
    assert_eq!(bottom.reference, "PM1");
    assert_eq!(bottom.overlapping, vec!["PM2".to_string()]);

    let top = report::overlap_report(&entries, false, PANEL_LABELS).unwrap();
    assert_eq!(top.reference, "PM3");
    assert!(top.overlapping.is_empty());

    let closest = report::closest_entity(&entries, true, PANEL_LABELS).unwrap();
    assert_eq!(closest.entity, "PM1");

    let bars = report::errorbar_offsets(&entries);
    assert_eq!(bars.first().unwrap().entity, "Panel together");
}
