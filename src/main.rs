//! # Platform Web Proxy - Main Entry Point
//!
//! Start-up order: load configuration (file + environment), install logging,
//! install the metrics recorder, build shared state, serve until SIGINT or
//! SIGTERM, then drain in-flight requests.

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use platform_web_proxy::observability::{init_logging, install_prometheus};
use platform_web_proxy::{AppState, PlatformConfig, PlatformServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PlatformConfig::load()
        .await
        .context("Failed to load configuration")?;

    init_logging(&config.observability).context("Failed to initialize logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting platform web proxy");
    info!(auth_mode = %config.auth_mode(), "Auth mode resolved");

    let metrics_enabled = config.observability.metrics_enabled;
    let mut state = AppState::new(config).context("Failed to initialize application state")?;
    if metrics_enabled {
        let handle = install_prometheus().context("Failed to initialize metrics")?;
        state = state.with_metrics(handle);
    }

    PlatformServer::new(state)
        .serve(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Platform web proxy shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
