//! Strata CLI
//!
//! Command-line interface for running read-path rollup queries against a
//! JSON fixture.
//!
//! # Usage
//!
//! ```bash
//! strata --help
//! strata granularities
//! strata --data series.json query --tenant acme --metric cpu \
//!     --from 2024-01-01T00:00:00Z --to 2024-01-01T06:00:00Z --granularity 5m
//! strata --data series.json query --tenant acme --metric cpu --from 0 --to 86400000 --points 100
//! strata --data series.json histograms --tenant acme --metric cpu --from 0 --to 3600000 --granularity 20m
//! ```

#![deny(unsafe_code)]

mod fixture;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fixture::Fixture;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use shared::config::RollupConfig;
use shared::handlers::{RollupHandler, RollupResponse};
use shared::rollup::Granularity;
use std::path::PathBuf;
use std::sync::Arc;

/// Strata CLI - Multi-resolution time-series query tool
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON fixture holding raw samples and persisted rollups
    #[arg(short, long, env = "STRATA_DATA")]
    data: Option<PathBuf>,

    /// Disable synthesis of missing rollups from raw data
    #[arg(long)]
    no_backfill: bool,

    /// Concurrent raw fetches while filling a gap
    #[arg(long)]
    parallelism: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Query rollups for a metric
    Query(QueryArgs),
    /// Query histogram rollups for a metric
    Histograms(HistogramArgs),
    /// List granularity levels and their bucket widths
    Granularities,
}

#[derive(Args)]
struct SeriesArgs {
    /// Tenant owning the metric
    #[arg(short, long)]
    tenant: String,

    /// Metric name
    #[arg(short, long)]
    metric: String,

    /// Start of the window (RFC 3339 or epoch millis)
    #[arg(long, value_parser = parse_timestamp, allow_hyphen_values = true)]
    from: i64,

    /// End of the window, exclusive (RFC 3339 or epoch millis)
    #[arg(long, value_parser = parse_timestamp, allow_hyphen_values = true)]
    to: i64,
}

#[derive(Args)]
struct QueryArgs {
    #[command(flatten)]
    series: SeriesArgs,

    /// Granularity level (full, 5m, 20m, 60m, 240m, 1440m)
    #[arg(short, long, conflicts_with = "points", required_unless_present = "points")]
    granularity: Option<Granularity>,

    /// Target number of points; picks the closest granularity
    #[arg(short, long)]
    points: Option<u32>,

    /// Print the metrics recorded by the query to stderr
    #[arg(long)]
    stats: bool,
}

#[derive(Args)]
struct HistogramArgs {
    #[command(flatten)]
    series: SeriesArgs,

    /// Granularity level, coarser than full
    #[arg(short, long)]
    granularity: Granularity,
}

/// Parses epoch milliseconds or an RFC 3339 timestamp.
fn parse_timestamp(value: &str) -> Result<i64, String> {
    if let Ok(millis) = value.parse::<i64>() {
        return Ok(millis);
    }
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| format!("expected RFC 3339 or epoch millis: {e}"))
}

impl Cli {
    fn config(&self) -> Result<RollupConfig> {
        self.config_with(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, then applies command-line overrides.
    fn config_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<RollupConfig> {
        let mut config =
            RollupConfig::from_lookup(lookup).context("Failed to load configuration")?;
        if self.no_backfill {
            config.backfill_enabled = false;
        }
        if let Some(parallelism) = self.parallelism {
            config.backfill_parallelism = parallelism;
        }
        Ok(config)
    }

    fn handler(&self) -> Result<RollupHandler> {
        let path = self
            .data
            .as_deref()
            .context("No fixture given; pass --data or set STRATA_DATA")?;
        let store = Fixture::load(path)?.into_store()?;
        let config = self.config()?;
        tracing::debug!(?config, "Rollup handler configured");
        Ok(RollupHandler::with_config(Arc::new(store), config)?)
    }
}

/// Runs `f`, printing the handler metrics it recorded to stderr when enabled.
fn with_stats<T>(enabled: bool, f: impl FnOnce() -> T) -> T {
    if !enabled {
        return f();
    }

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let result = metrics::with_local_recorder(&recorder, f);

    for (key, _, _, value) in snapshotter.snapshot().into_vec() {
        let name = key.key().name();
        match value {
            DebugValue::Counter(count) => eprintln!("{name} {count}"),
            DebugValue::Histogram(values) => {
                let sum: f64 = values.iter().map(|v| v.into_inner()).sum();
                eprintln!("{name} count={} sum={sum}", values.len());
            }
            other => eprintln!("{name} {other:?}"),
        }
    }
    result
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Query(args)) => {
            let handler = cli.handler()?;
            let SeriesArgs {
                tenant,
                metric,
                from,
                to,
            } = &args.series;

            let response = with_stats(args.stats, || -> Result<RollupResponse> {
                Ok(match (args.granularity, args.points) {
                    (Some(granularity), _) => {
                        handler.get_rollup_by_granularity(tenant, metric, *from, *to, granularity)?
                    }
                    (None, Some(points)) => {
                        handler.get_rollup_by_points(tenant, metric, *from, *to, points)?
                    }
                    (None, None) => anyhow::bail!("Either --granularity or --points is required"),
                })
            })?;

            if response.is_partial() {
                tracing::warn!(
                    skipped = response.skipped().len(),
                    "Some buckets could not be synthesized"
                );
            }
            print_json(&response)?;
        }
        Some(Commands::Histograms(args)) => {
            let handler = cli.handler()?;
            let series = &args.series;
            let data = handler.get_histograms_by_granularity(
                &series.tenant,
                &series.metric,
                series.from,
                series.to,
                args.granularity,
            )?;
            print_json(&data)?;
        }
        Some(Commands::Granularities) => {
            for granularity in Granularity::granularities() {
                match granularity.bucket_millis() {
                    Some(millis) => println!("{granularity:<6} {millis} ms"),
                    None => println!("{granularity:<6} raw"),
                }
            }
        }
        None => {
            println!("Strata CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
