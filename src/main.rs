//! relay-gateway server.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────────┐
//!                  │                      RELAY GATEWAY                        │
//!                  │                                                           │
//!  Client Request  │  ┌─────────┐   ┌─────────┐   ┌──────────┐   ┌─────────┐  │
//!  ────────────────┼─▶│  http   │──▶│ routing │──▶│  codec   │──▶│  refs   │  │
//!                  │  │ server  │   │ endpoint│   │  decode  │   │  Store  │  │
//!                  │  └─────────┘   └─────────┘   └──────────┘   └────┬────┘  │
//!                  │                                                  │       │
//!                  │                                                  ▼       │
//!                  │                  ┌──────────────┐        ┌────────────┐   │
//!                  │                  │  functions   │◀──────▶│    flow    │───┼──▶ Services
//!                  │                  │  (sprintf)   │        │   steps    │◀──┼──
//!                  │                  └──────────────┘        └─────┬──────┘   │
//!                  │                                                │          │
//!  Client Response │  ┌─────────┐   ┌──────────┐   ┌──────────┐     │          │
//!  ◀───────────────┼──│  http   │◀──│  codec   │◀──│  walker  │◀────┘          │
//!                  │  │response │   │ marshal  │   │ + Tracker│                │
//!                  │  └─────────┘   └──────────┘   └──────────┘                │
//!                  │                                                           │
//!                  │  config (load, validate, watch) · observability ·         │
//!                  │  resilience (retry, backoff) · lifecycle (shutdown)       │
//!                  └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use relay_gateway::config::{load_config, ConfigWatcher, GatewayConfig};
use relay_gateway::lifecycle::{shutdown_signal, Shutdown};
use relay_gateway::observability::{logging, metrics};
use relay_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "relay-gateway", version)]
#[command(about = "Protocol-translation gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the configuration when the file changes
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::info!("relay-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        services = config.services.len(),
        flows = config.flows.len(),
        endpoints = config.endpoints.len(),
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

    // Dropping the watcher stops it, so it lives as long as main.
    let (_watcher, updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(&config)?;
    server.run(listener, updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
