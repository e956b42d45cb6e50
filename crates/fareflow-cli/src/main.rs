mod logging;

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use fareflow_engine::config::{DEFAULT_CONCURRENCY, DEFAULT_MAX_SPEED_KMH};
use fareflow_engine::{Config, Estimator};

#[derive(Parser)]
#[command(
    name = "fareflow",
    version,
    about = "Estimate taxi ride fares from a CSV stream of GPS positions"
)]
struct Cli {
    /// Input CSV of ride_id,latitude,longitude,unix_timestamp rows
    #[arg(long)]
    input: PathBuf,

    /// Output CSV of ride_id,fare rows
    #[arg(long, default_value = "fares.csv")]
    output: PathBuf,

    /// Number of rides estimated concurrently
    #[arg(short = 'c', long = "concurrency", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Discard segments faster than this speed (km/h)
    #[arg(long, default_value_t = DEFAULT_MAX_SPEED_KMH)]
    max_speed: f64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let config = Config {
        max_speed: cli.max_speed,
        concurrency: cli.concurrency,
    };

    let input = File::open(&cli.input)
        .with_context(|| format!("open input file {}", cli.input.display()))?;
    let output = File::create(&cli.output)
        .with_context(|| format!("create output file {}", cli.output.display()))?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, winding down");
            interrupt.cancel();
        }
    });

    let start = Instant::now();
    let estimator = Estimator::new(input, output, config).context("configure estimator")?;
    estimator
        .run(cancel)
        .await
        .context("estimation pipeline failed")?;

    tracing::info!(
        input = %cli.input.display(),
        output = %cli.output.display(),
        elapsed_secs = start.elapsed().as_secs_f64(),
        "done"
    );
    Ok(())
}
