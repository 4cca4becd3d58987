use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use burstgate::config::BurstgateConfig;
use burstgate::ratelimit::{Limit, RateLimiter};
use burstgate::throttle::copy_throttled;

/// Copy stdin to stdout under a burstable bandwidth limit.
#[derive(Debug, Parser)]
#[command(name = "burstgate", version, about)]
struct Cli {
    /// YAML configuration file with named limit profiles
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Limit profile to use from the configuration file
    #[arg(short, long, requires = "config")]
    profile: Option<String>,

    /// Accrual rate in bytes per second
    #[arg(long)]
    rate: Option<f64>,

    /// Maximum balance that can be accrued
    #[arg(long)]
    max_balance: Option<f64>,

    /// Minimum balance, or maximum debt (<= 0)
    #[arg(long, allow_hyphen_values = true)]
    min_balance: Option<f64>,

    /// Largest chunk gated at once
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    chunk_size: Option<usize>,

    /// Initial balance (defaults to the maximum balance)
    #[arg(long, allow_hyphen_values = true)]
    preload: Option<f64>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = match &cli.config {
        Some(path) => BurstgateConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BurstgateConfig::default(),
    };

    let limit = resolve_limit(&cli, &config)?;
    limit.validate()?;

    let chunk_size = cli.chunk_size.unwrap_or(config.copy.chunk_size);
    let preload = cli.preload.unwrap_or_else(|| config.copy.preload_for(&limit));
    info!(
        bytes_per_second = limit.bytes_per_second,
        max_balance = limit.max_balance,
        min_balance = limit.min_balance,
        chunk_size = chunk_size,
        preload = preload,
        "Starting throttled copy"
    );

    let mut limiter = RateLimiter::with_preload(preload);
    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let stats = copy_throttled(&mut stdin, &mut stdout, &mut limiter, &limit, chunk_size).await?;

    info!(
        bytes = stats.bytes,
        chunks = stats.chunks,
        waits = stats.waits,
        waited_ms = stats.waited.as_millis() as u64,
        "Copy finished"
    );
    Ok(())
}

/// Initialize tracing on stderr, leaving stdout for data.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Build the limit from the selected profile, with explicit flags taking
/// precedence.
fn resolve_limit(cli: &Cli, config: &BurstgateConfig) -> anyhow::Result<Limit> {
    let base = match &cli.profile {
        Some(name) => Some(config.limit(name)?),
        None => None,
    };

    let bytes_per_second = cli
        .rate
        .or(base.map(|l| l.bytes_per_second))
        .context("no rate given; pass --rate or --profile")?;
    let max_balance = cli
        .max_balance
        .or(base.map(|l| l.max_balance))
        .unwrap_or(bytes_per_second);
    let min_balance = cli
        .min_balance
        .or(base.map(|l| l.min_balance))
        .unwrap_or(0.0);

    Ok(Limit::new(bytes_per_second, max_balance, min_balance))
}
