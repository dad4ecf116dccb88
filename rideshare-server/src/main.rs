//! Rideshare Dispatch Server
//!
//! Matches rider ride requests with connected drivers and streams offers and
//! status updates over WebSockets.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use rideshare_core::config::ConfigStore;
use rideshare_core::processors::RideJanitor;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Rideshare dispatch server - matches riders with nearby drivers
#[derive(Parser, Debug)]
#[command(name = "rideshare-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./rideshare-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:50054)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting rideshare-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let dispatch_config = ConfigStore::new(loaded_config.dispatch);
    let state = AppState::new(dispatch_config.clone());

    // Background processors
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let janitor = RideJanitor::new(state.dispatcher.clone());
    let janitor_handle = tokio::spawn(janitor.run(
        shutdown_rx,
        dispatch_config.clone(),
        dispatch_config.subscribe(),
    ));

    // Spawn config reload handler (listens for SIGHUP)
    let reload_notify =
        spawn_config_reload_handler(config_loader, state.dispatch_config().clone(), listen_addr);

    // Build the router
    let router = build_router(state.clone());

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop background tasks
    reload_notify.notify_one();
    let _ = shutdown_tx.send(true);
    if let Err(e) = janitor_handle.await {
        tracing::error!(error = %e, "RideJanitor task failed");
    }
    let cancelled = state.dispatcher.timeouts().cancel_all().await;
    tracing::info!(cancelled, "Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
