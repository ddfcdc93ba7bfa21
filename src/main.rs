use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber;

use floodgate::config::FloodgateConfig;
use floodgate::http::HttpServer;
use floodgate::limit::{Limiters, Reaper};

#[derive(Debug, Parser)]
#[command(name = "floodgate", version, about = "Per-client request rate limiting service")]
struct Args {
    /// Path to the YAML configuration file (defaults apply when omitted).
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Floodgate Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => FloodgateConfig::from_file(path)?,
        None => FloodgateConfig::default(),
    };
    info!(
        listen_addr = %config.server.listen_addr,
        limiters = config.limits.policies.len(),
        "Configuration loaded"
    );

    // One independent limiter per named policy
    let limiters = Arc::new(Limiters::new(config.limits.policies.clone()));

    // Start the reaper alongside the server, stopped via the watch channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = Reaper::new(
        limiters.clone(),
        Duration::from_secs(config.limits.reaper_interval_secs),
    );
    let reaper_handle = reaper.spawn(shutdown_rx);

    let server = HttpServer::new(config.server.listen_addr, limiters);

    // Run the server with graceful shutdown on Ctrl+C or SIGTERM
    server.serve_with_shutdown(shutdown_signal()).await?;

    // Stop the reaper once the server has drained
    let _ = shutdown_tx.send(true);
    reaper_handle.await?;

    info!("Floodgate Rate Limiting Service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
