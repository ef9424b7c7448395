//! relay-gateway
//!
//! HTTP gateway for a browser client.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                  RELAY GATEWAY                   │
//!                       │                                                  │
//!   Browser request     │  ┌─────────┐   ┌────────────┐                    │
//!   ────────────────────┼─▶│  cors   │──▶│  dispatch  │                    │
//!                       │  └─────────┘   └─────┬──────┘                    │
//!                       │          /api/store/ │  /api/proxy/              │
//!                       │          ┌───────────┴──────────┐                │
//!                       │          ▼                      ▼                │
//!                       │   ┌────────────┐        ┌──────────────┐         │
//!                       │   │ blob store │        │ proxy router │         │
//!                       │   └─────┬──────┘        └──────┬───────┘         │
//!                       │         ▼                      ▼                 │
//!                       │   ┌────────────┐        ┌──────────────┐         │
//!                       │   │ snapshot   │        │ secrets      │─────────┼──▶ Upstream
//!                       │   │ writer     │        │ interpolator │         │
//!                       │   └─────┬──────┘        └──────────────┘         │
//!                       └─────────┼────────────────────────────────────────┘
//!                                 ▼
//!                           store.json
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use relay_gateway::config::resolve_config;
use relay_gateway::lifecycle::signals::shutdown_on_signal;
use relay_gateway::observability::{logging, metrics};
use relay_gateway::{bootstrap, SecretSet, Shutdown};

#[derive(Parser)]
#[command(name = "relay-gateway")]
#[command(about = "Credential-injecting HTTP proxy and blob store", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "relay-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let gateway = bootstrap(config, SecretSet::from_env())?;

    // Bound only after the store is loaded.
    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(shutdown_on_signal(shutdown));

    gateway.server.run(listener, server_shutdown).await?;

    tracing::info!("Waiting for pending snapshot writes");
    gateway.store.settle().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
