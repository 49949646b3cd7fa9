//! Insights API server.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request
//!   ───────────────▶ CORS ─▶ trace id ─▶ timeout ─▶ handler
//!                                                      │
//!                                   fields::mapping ◀──┤ rename row keys
//!                                                      │
//!   Client Response                                    ▼
//!   ◀─────────────── CORS ◀─ X-Trace-Id ◀──── envelope / export bytes
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use insights_api::config::{load_config, override_bind_address, ApiConfig};
use insights_api::observability::{logging, metrics};
use insights_api::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "insights-api")]
#[command(about = "Learning-analytics REST API", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "INSIGHTS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ApiConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config = override_bind_address(config, bind)?;
    }

    logging::init_logging(&config.observability);
    tracing::info!("insights-api v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        export_directory = %config.export.directory.display(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
