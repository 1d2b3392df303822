//! Host-routing reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request          ┌──────────────────────────────────────────────────────┐
//!     ────────────────────────┼─▶ net (plain / TLS) ──▶ http::dispatcher             │
//!                             │                          │                           │
//!                             │        bypass header? ───┤──▶ http::admin (200)      │
//!                             │                          ▼                           │
//!                             │                      routing::table ──miss──▶ 404    │
//!                             │                          │ hit                       │
//!                             │                          ▼                           │
//!     Client Response         │                   upstream::connector ──err──▶ 502/504
//!     ◀───────────────────────┼──── relayed status, headers, body ◀──────────────────┼── Upstream
//!                             └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;

use vhost_proxy::config::{load_config, watcher::ConfigWatcher, ProxyConfig};
use vhost_proxy::lifecycle::{signals, Shutdown};
use vhost_proxy::observability::{logging, metrics};
use vhost_proxy::{net, HttpServer};

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(name = "vhost-proxy", version, about = "Host-routing reverse proxy")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Do not reload routes when the configuration file changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // A missing default file means "run with defaults"; an explicit path must exist.
    let explicit = args.config != PathBuf::from(DEFAULT_CONFIG);
    let config = if explicit || args.config.exists() {
        load_config(&args.config)?
    } else {
        ProxyConfig::default()
    };

    logging::init(&config.observability.log_level);

    tracing::info!("vhost-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = net::bind(&config.listener).await?;

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = if args.no_watch || !args.config.exists() {
        (None, mpsc::unbounded_channel().1)
    } else {
        let (watcher, updates) = ConfigWatcher::new(&args.config);
        (Some(watcher.run()?), updates)
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_termination().await;
        signal_shutdown.trigger();
    });

    HttpServer::new(config)
        .run(listener, config_updates, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
