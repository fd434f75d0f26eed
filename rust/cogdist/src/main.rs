//! cogdist CLI: bootstrap intervals for portfolio statistics and overlap
//! reports over interval tables.
//!
//! Subcommands:
//!   bootstrap    Point estimate and percentile interval of one statistic
//!   overlap      Per group, the reference entity and the entities overlapping it
//!   cache-clear  Remove every stored bootstrap realization
//!
//! Set RUST_LOG=info (or debug) to see cache hits/misses and progress.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

use cogdist::cache::{DiskCache, NoCache, SampleCache};
use cogdist::input::PortfolioInput;
use cogdist::report::{self, IntervalTable, PANEL_LABELS};
use cogdist::statistic::{self, OptionValue, StatOptions, StatValue};
use cogdist::{
    check_alpha, point_estimate, BootstrapConfig, BootstrapInput, Bootstrapper, ConfidenceInterval,
};

#[derive(Parser)]
#[command(name = "cogdist", version, about)]
struct Cli {
    /// Directory holding cached bootstrap samples
    #[arg(long, default_value = DiskCache::DEFAULT_DIR)]
    cache_dir: PathBuf,

    /// Always draw fresh samples and store nothing
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap a statistic over one or two portfolios
    Bootstrap {
        /// JSON document with coords/similarity and portfolios
        #[arg(long)]
        input: PathBuf,

        /// Built-in statistic name
        #[arg(long, default_value = "barycenter")]
        statistic: String,

        /// Portfolio to resample
        #[arg(long)]
        portfolio: String,

        /// Second portfolio, for statistics comparing two
        #[arg(long)]
        against: Option<String>,

        #[arg(long, default_value_t = 1000)]
        samples: usize,

        #[arg(long, default_value_t = 0.05)]
        alpha: f64,

        #[arg(long)]
        seed: Option<u64>,

        /// Spread replicates over all cores
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Statistic option as key=value (repeatable)
        #[arg(long = "option", value_parser = parse_option)]
        options: Vec<(String, OptionValue)>,

        /// Print a JSON summary instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Report which entities' intervals overlap the best (or worst) one
    Overlap {
        /// Interval table as JSON
        #[arg(long)]
        table: PathBuf,

        /// Use the highest estimate as reference instead of the lowest
        #[arg(long, default_value_t = false)]
        top: bool,

        /// Keep panel aggregate rows
        #[arg(long, default_value_t = false)]
        include_panel: bool,
    },
    /// Delete all cache entries
    CacheClear,
}

fn parse_option(raw: &str) -> Result<(String, OptionValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty option name in '{}'", raw));
    }
    Ok((key.to_string(), OptionValue::parse(value)))
}

#[derive(Serialize)]
struct BootstrapSummary<'a> {
    statistic: &'a str,
    portfolio: &'a str,
    against: Option<&'a str>,
    num_samples: usize,
    alpha: f64,
    estimate: StatValue,
    intervals: Vec<ConfidenceInterval>,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let disk = DiskCache::new(&cli.cache_dir);
    let cache: &dyn SampleCache = if cli.no_cache { &NoCache } else { &disk };

    let result = match &cli.command {
        Commands::Bootstrap {
            input,
            statistic,
            portfolio,
            against,
            samples,
            alpha,
            seed,
            parallel,
            options,
            json,
        } => {
            let config = BootstrapConfig {
                num_samples: *samples,
                seed: *seed,
                parallel: *parallel,
                ..Default::default()
            };
            let mut stat_options = StatOptions::new();
            for (key, value) in options {
                stat_options.insert(key.clone(), value.clone());
            }
            cmd_bootstrap(
                cache,
                input,
                statistic,
                portfolio,
                against.as_deref(),
                config,
                *alpha,
                stat_options,
                *json,
            )
        }
        Commands::Overlap {
            table,
            top,
            include_panel,
        } => cmd_overlap(table, *top, *include_panel),
        Commands::CacheClear => cmd_cache_clear(&disk),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_bootstrap(
    cache: &dyn SampleCache,
    input_path: &Path,
    statistic_name: &str,
    portfolio: &str,
    against: Option<&str>,
    config: BootstrapConfig,
    alpha: f64,
    options: StatOptions,
    json: bool,
) -> cogdist::Result<()> {
    check_alpha(alpha)?;
    let doc = PortfolioInput::from_json_file(input_path)?;
    let statistic = statistic::builtin(statistic_name)?;
    let space = doc.space_for(statistic_name)?;
    let counts = doc.portfolio(portfolio)?;
    let counts2 = against.map(|name| doc.portfolio(name)).transpose()?;

    let mut input = BootstrapInput::new(&space, &counts).with_options(options);
    if let Some(c2) = &counts2 {
        input = input.against(c2);
    }

    let num_samples = config.num_samples;
    let step = (num_samples / 10).max(1);
    let runner = Bootstrapper::new(config, cache).with_progress(move |done, total| {
        if done % step == 0 || done == total {
            eprintln!("  {:>6}/{} replicates", done, total);
        }
    });

    let estimate = point_estimate(statistic.as_ref(), &input)?;
    let samples = runner.run(statistic.as_ref(), &input)?;
    let intervals = samples.intervals(alpha)?;

    if json {
        let summary = BootstrapSummary {
            statistic: statistic_name,
            portfolio,
            against,
            num_samples: samples.len(),
            alpha,
            estimate,
            intervals,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let label = match against {
        Some(other) => format!("{} vs {}", portfolio, other),
        None => portfolio.to_string(),
    };
    println!("{} of {} ({} samples)", statistic_name, label, samples.len());
    println!();
    println!(
        "  {:>4} | {:>12} | {:>12} | {:>12}",
        "dim", "estimate", "lower", "upper"
    );
    println!("  {}", "-".repeat(49));
    for (dim, (value, ci)) in estimate.as_slice().iter().zip(&intervals).enumerate() {
        println!(
            "  {:>4} | {:>12.6} | {:>12.6} | {:>12.6}",
            dim, value, ci.lower, ci.upper
        );
    }
    println!();
    println!("  {:.0}% percentile interval", (1.0 - alpha) * 100.0);
    Ok(())
}

fn cmd_overlap(table_path: &Path, top: bool, include_panel: bool) -> cogdist::Result<()> {
    let table = report::fix_merged_cells(IntervalTable::from_json_file(table_path)?)?;
    let excluded: &[&str] = if include_panel { &[] } else { PANEL_LABELS };

    for group in &table.groups {
        println!("{}", group);
        let entries = table.group(group)?;
        if let Some(report) = report::overlap_report(&entries, !top, excluded) {
            println!("- {}", report.reference);
            for entity in &report.overlapping {
                println!("- {}", entity);
            }
        }
    }
    Ok(())
}

fn cmd_cache_clear(cache: &DiskCache) -> cogdist::Result<()> {
    let removed = cache.clear()?;
    println!("Removed {} entries from {:?}", removed, cache.dir());
    Ok(())
}
