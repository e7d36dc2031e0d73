//! uhttp-lm - periodic latency monitor for mixnet-routed uHTTP requests
//!
//! Usage:
//!     uhttp-lm --client-id <id> --rpc-provider <url> --zero-hop <bool>
//!
//! Every flag is also a UHTTP_LM_* environment variable; see --help.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

use uhttp_latency_monitor::config::{Cli, Config};
use uhttp_latency_monitor::exporter::Exporter;
use uhttp_latency_monitor::metrics::{LabelSet, LatencyMetrics};
use uhttp_latency_monitor::routing::{DirectClient, Routing, Settings};
use uhttp_latency_monitor::scheduler::TickScheduler;
use uhttp_latency_monitor::util::init_logging;

fn main() -> Result<()> {
    // Parse command line arguments and environment
    let cli = Cli::parse();

    // Initialize logging before config resolution so its warnings are seen
    init_logging(&cli.log_level, cli.log_format);

    // Resolve and validate configuration
    let config = cli.into_config().context("invalid configuration")?;

    let hops = if config.zero_hop { 0 } else { 1 };
    info!(
        version = env!("CARGO_PKG_VERSION"),
        rpc_provider = %config.rpc_provider,
        hops,
        interval = %humantime::format_duration(config.interval),
        "latency monitor starting"
    );

    // Run the monitor
    run(config)
}

/// Run the monitor with the given configuration.
fn run(config: Config) -> Result<()> {
    // Create tokio runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(async { run_async(config).await })
}

/// Async entry point for the monitor.
async fn run_async(config: Config) -> Result<()> {
    // Create shutdown channel
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // The label schema is finalized before any aggregator exists
    let labels = LabelSet::from_config(&config);
    let metrics =
        LatencyMetrics::new(&labels).context("failed to build metric registry")?;

    let grouping: Vec<(&str, &str)> = labels
        .get("instance")
        .map(|instance| ("instance", instance))
        .into_iter()
        .collect();
    let exporter = Exporter::new(
        config.push_gateway.as_deref(),
        config.push_mode,
        &grouping,
    )
    .context("failed to build exporter")?;

    let client: Arc<dyn Routing> = Arc::new(
        DirectClient::new(
            &config.client_id,
            Settings {
                discovery_platform: config.discovery_platform.clone(),
                force_zero_hop: config.zero_hop,
            },
        )
        .context("failed to build routing client")?,
    );

    let scheduler = TickScheduler::new(
        client,
        config.rpc_provider.clone(),
        metrics,
        exporter,
        config.offset,
        config.interval,
    );

    let handle = tokio::spawn(scheduler.run(shutdown_tx.subscribe()));

    info!("latency monitor is running");
    info!("press Ctrl+C to stop");

    // Wait for shutdown signal
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("received shutdown signal");
        }
        Err(e) => {
            error!(error = %e, "failed to listen for shutdown signal");
        }
    }

    // Stop arming new ticks; in-flight ticks are abandoned at exit
    let _ = shutdown_tx.send(());
    let _ = handle.await;

    info!("latency monitor shut down complete");
    Ok(())
}
