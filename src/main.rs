//! Request-Aggregation Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                 AGGREGATION GATEWAY                  │
//!                       │                                                      │
//!   GET /aggregate      │  ┌────────┐    ┌────────────┐    ┌──────────────────┐ │
//!   ────────────────────┼─▶│  http  │───▶│ aggregation│───▶│ task per         │ │
//!                       │  │ server │    │ aggregator │    │ dependency       │ │
//!                       │  └────────┘    └─────┬──────┘    └────────┬─────────┘ │
//!                       │       ▲              │ join all           │           │
//!                       │       │              ▼                    ▼           │
//!                       │  ┌────────┐    ┌────────────┐    ┌──────────────────┐ │
//!   200 / 500 JSON      │  │response│◀───│ Aggregate  │    │ resilience       │ │
//!   ◀───────────────────┼──│ mapping│    │ Result     │    │ circuit breaker  │─┼──▶ upstream
//!                       │  └────────┘    └────────────┘    │ + call timeout   │ │    (reqwest)
//!                       │                                  └──────────────────┘ │
//!                       │  ┌─────────────────────────────────────────────────┐ │
//!                       │  │ config · observability · lifecycle              │ │
//!                       │  └─────────────────────────────────────────────────┘ │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use aggregation_gateway::config::{load_config, validation::validate_config, GatewayConfig};
use aggregation_gateway::http::HttpServer;
use aggregation_gateway::lifecycle::{signals, Shutdown};
use aggregation_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "aggregation-gateway")]
#[command(about = "Fan-out/fan-in HTTP aggregation gateway", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
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
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(|errors| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })?;
    }

    logging::init(&config.observability);
    tracing::info!("aggregation-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        dependencies = config.dependencies.len(),
        max_failures = config.breaker.max_failures,
        call_timeout_ms = config.breaker.call_timeout_ms,
        reset_timeout_ms = config.breaker.reset_timeout_ms,
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
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
