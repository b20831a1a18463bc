//! metrics-bridge - standalone metrics bridge
//!
//! Usage:
//!     metrics-bridge --config <path>
//!
//! See --help for more options.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use metrics_bridge::config::{load_config, Config};
use metrics_bridge::runtime::TrackingAllocator;
use metrics_bridge::util::init_logging;
use metrics_bridge::{Bridge, Registry};

#[global_allocator]
static ALLOCATOR: TrackingAllocator = TrackingAllocator::new();

/// Publish process metrics over HTTP pull and push.
#[derive(Parser, Debug)]
#[command(name = "metrics-bridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config).with_context(|| {
        format!(
            "failed to load configuration from '{}'",
            cli.config.display()
        )
    })?;

    // CLI overrides config
    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.global.log_level);

    init_logging(log_level, &config.global.log_format).context("failed to initialize logging")?;

    if cli.validate {
        info!("Configuration is valid");
        println!("Configuration is valid.");
        println!("  Prefix: {}", config.bridge.prefix);
        if config.bridge.push_url.is_empty() {
            println!("  Push: disabled");
        } else {
            println!("  Push: {}", config.bridge.push_url);
        }
        if config.server.enabled {
            println!("  Pull: http://{}{}", config.server.address, config.server.path);
        } else {
            println!("  Pull: disabled");
        }
        return Ok(());
    }

    info!(
        config_path = %cli.config.display(),
        prefix = %config.bridge.prefix,
        push_url = %config.bridge.push_url,
        "metrics-bridge starting"
    );

    run(config)
}

/// Run the bridge with the given configuration.
fn run(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(async { run_async(config).await })
}

/// Async entry point.
async fn run_async(config: Config) -> Result<()> {
    let registry = Registry::new();
    let mut bridge =
        Bridge::from_config(&config.bridge, registry).context("failed to start metrics bridge")?;

    if config.server.enabled {
        let address = bridge
            .serve(config.server.address, &config.server.path)
            .await
            .context("failed to start pull server")?;
        info!(address = %address, path = %config.server.path, "pull endpoint ready");
    }

    info!("metrics-bridge is running");
    info!("press Ctrl+C to stop");

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("received shutdown signal");
        }
        Err(e) => {
            error!(error = %e, "failed to listen for shutdown signal");
        }
    }

    bridge.shutdown().await;

    info!("metrics-bridge shut down complete");
    Ok(())
}
