//! envsnap - Main Entry Point
//!
//! Periodically samples diagnostic counters from a network device by
//! fanning out a fixed table of show commands and archiving each round
//! as one compressed JSON snapshot.

mod telemetry;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use envsnap_core::application::sampler::constants::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_INTERVAL, DEFAULT_NUM_RUNS,
};
use envsnap_core::application::sampler::{shutdown_channel, Sampler};
use envsnap_core::application::Collector;
use envsnap_core::domain::DeviceProfile;
use envsnap_core::port::run_id_provider::UuidRunIdProvider;
use envsnap_core::port::time_provider::SystemTimeProvider;
use envsnap_infra_archive::ZstdSnapshotStore;
use envsnap_infra_system::SubprocessRunner;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_OUTPUT_DIR: &str = "/var/xr/disk1/envSnaps";
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "envsnap")]
#[command(about = "Periodic NPU diagnostic snapshot collector", long_about = None)]
#[command(version)]
struct Cli {
    /// Seconds between subsequent sampling rounds
    #[arg(short = 't', long, env = "ENVSNAP_INTERVAL", default_value_t = DEFAULT_INTERVAL.as_secs())]
    time_interval: u64,

    /// Number of rounds to execute (0 = run forever)
    #[arg(short = 'n', long, env = "ENVSNAP_NUM_RUNS", default_value_t = DEFAULT_NUM_RUNS)]
    num_runs: u32,

    /// Output directory for snapshots
    #[arg(short, long, env = "ENVSNAP_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: String,

    /// Descriptive string prepended to snapshot filenames
    #[arg(short, long, env = "ENVSNAP_LEADER", default_value = "")]
    leader: String,

    /// Per-command wall-clock timeout in seconds
    #[arg(long, env = "ENVSNAP_COMMAND_TIMEOUT", default_value_t = DEFAULT_COMMAND_TIMEOUT.as_secs())]
    command_timeout: u64,

    /// Line card slots to iterate when sampling drop counters
    #[arg(long, env = "ENVSNAP_CARDS", default_value_t = 18)]
    cards: u8,

    /// NPU instances per line card
    #[arg(long, env = "ENVSNAP_NPUS_PER_CARD", default_value_t = 4)]
    npus_per_card: u8,

    /// Interface whose policy-map statistics are sampled
    #[arg(long, env = "ENVSNAP_INTERFACE", default_value = "Bundle-Ether21")]
    interface: String,

    /// Append logs to this file instead of stderr
    #[arg(long, env = "ENVSNAP_LOG_FILE")]
    log_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging (JSON format for fleet collection)
    let log_format = std::env::var("ENVSNAP_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .expect("Failed to create env filter");

    // Keep the non-blocking appender guard alive for the process lifetime
    let mut _appender_guard: Option<WorkerGuard> = None;

    match (log_format.as_str(), cli.log_file.as_deref()) {
        ("json", Some(path)) => {
            let (writer, guard) = file_writer(path)?;
            _appender_guard = Some(guard);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(writer).with_ansi(false))
                .init();
        }
        (_, Some(path)) => {
            let (writer, guard) = file_writer(path)?;
            _appender_guard = Some(guard);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
        }
        ("json", None) => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("envsnap v{} starting...", VERSION);

    // 1.1. Initialize OpenTelemetry (optional)
    if let Err(e) = telemetry::init_telemetry() {
        tracing::warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)");
    }

    // 2. Resolve configuration
    let output_dir = shellexpand::tilde(&cli.output_dir).into_owned();
    info!(output_dir = %output_dir, "Using snapshot output directory");

    let profile = DeviceProfile::new(cli.cards, cli.npus_per_card, cli.interface.clone())?;
    let show_table = profile.show_table()?;
    let clear_table = profile.clear_table()?;

    // 3. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let run_ids = Arc::new(UuidRunIdProvider);

    let runner = Arc::new(SubprocessRunner::new(
        time_provider.clone(),
        Duration::from_secs(cli.command_timeout),
    ));
    let store = Arc::new(ZstdSnapshotStore::new(&output_dir));

    let collector = Collector::new(
        runner.clone(),
        store,
        time_provider.clone(),
        run_ids,
        cli.leader.clone(),
        show_table,
    );

    let sampler = Sampler::new(
        collector,
        runner,
        clear_table,
        Duration::from_secs(cli.time_interval),
        cli.num_runs,
    );

    // 4. Start the sampling loop
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let mut sampler_handle = tokio::spawn(async move { sampler.run(shutdown_rx).await });

    // 5. Wait for completion or shutdown signal
    tokio::select! {
        result = &mut sampler_handle => {
            let rounds = result??;
            info!(rounds, "Sampling complete");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Stopping sampler...");
            shutdown_tx.shutdown();
            let _ = tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, &mut sampler_handle).await;
        }
    }

    info!("Shutdown complete.");

    Ok(())
}

/// Non-blocking appender writing to a fixed log file, `~` expanded.
fn file_writer(path: &str) -> Result<(NonBlocking, WorkerGuard)> {
    let expanded = shellexpand::tilde(path).into_owned();
    let path = Path::new(&expanded);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("log file path has no file name: {expanded}"))?;

    Ok(tracing_appender::non_blocking(
        tracing_appender::rolling::never(dir, file_name),
    ))
}
