use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zonewatch::{AggregationEngine, AggregationQuery, SqliteTelemetryStore, ZonewatchConfig};

/// Run aggregation queries against a telemetry store and print JSON.
#[derive(Parser, Debug)]
#[command(name = "telemetry-report")]
#[command(about = "Report bucketed telemetry and data rates from a zonewatch store")]
struct Args {
    /// Path to zonewatch configuration file (for the store path and default bucket width)
    #[arg(short = 'c', long, default_value = "zonewatch.toml")]
    config: PathBuf,

    /// Store file to read instead of store.path from the configuration
    #[arg(short, long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct Window {
    /// Window start (RFC 3339); defaults to the oldest stored record
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Window end (RFC 3339); defaults to the newest stored record
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    /// Bucket width in milliseconds
    #[arg(long)]
    bucket_ms: Option<i64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Records per second, per device or for one device
    TelemetryRates {
        #[arg(short, long)]
        device: Option<String>,
        #[command(flatten)]
        window: Window,
    },
    /// Kilobytes per second, per device or for one device
    DataRates {
        #[arg(short, long)]
        device: Option<String>,
        #[command(flatten)]
        window: Window,
    },
    /// Average object counts of one device
    ObjectCounts {
        #[arg(short, long)]
        device: String,
        #[command(flatten)]
        window: Window,
    },
    /// Stored telemetry strings of one device
    Telemetries {
        #[arg(short, long)]
        device: String,
        #[command(flatten)]
        window: Window,
    },
    /// Newest object count of one device
    LastObjectCount {
        #[arg(short, long)]
        device: String,
    },
    /// Oldest stored timestamp and storage size
    DatabaseInfo,
}

impl Window {
    fn query(&self, default_bucket_width_ms: i64) -> AggregationQuery {
        let mut query = AggregationQuery::new(self.bucket_ms.unwrap_or(default_bucket_width_ms));
        if let Some(start) = self.start {
            query = query.with_start(start);
        }
        if let Some(end) = self.end {
            query = query.with_end(end);
        }
        query
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = ZonewatchConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let store_path = args
        .store
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.store.path));

    info!("Reading telemetry from {}", store_path.display());
    let store = SqliteTelemetryStore::open(&store_path)
        .with_context(|| format!("Failed to open store {}", store_path.display()))?;
    let engine = AggregationEngine::new(Arc::new(store));
    let default_bucket = config.aggregation.default_bucket_width_ms;

    match &args.command {
        Command::TelemetryRates { device, window } => {
            let query = window.query(default_bucket);
            match device {
                Some(device) => print_json(&engine.device_telemetry_rates(device, &query)?),
                None => print_json(&engine.telemetry_rates(&query)?),
            }
        }
        Command::DataRates { device, window } => {
            let query = window.query(default_bucket);
            match device {
                Some(device) => print_json(&engine.device_data_rates(device, &query)?),
                None => print_json(&engine.data_rates(&query)?),
            }
        }
        Command::ObjectCounts { device, window } => {
            print_json(&engine.object_counts(device, &window.query(default_bucket))?)
        }
        Command::Telemetries { device, window } => {
            print_json(&engine.telemetries(device, &window.query(default_bucket))?)
        }
        Command::LastObjectCount { device } => print_json(&engine.last_object_count(device)?),
        Command::DatabaseInfo => print_json(&engine.database_info()?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
