//! Ticket Pool Server
//!
//! HTTP server that runs the ticket pool simulator.
//!
//! This binary:
//! - Loads `.env` and server settings from the environment
//! - Restores the last saved simulation configuration
//! - Opens the activity log file
//! - Serves the HTTP API until Ctrl+C or SIGTERM
//! - Stops any running simulation before exiting
//!
//! # Usage
//!
//! ```bash
//! PORT=8080 cargo run --bin ticket-pool-server
//! ```

use anyhow::Context;
use std::sync::Arc;
use ticket_pool_core::environment::SystemClock;
use ticket_pool_runtime::PoolSupervisor;
use ticket_pool_runtime::metrics::MetricsExporter;
use ticket_pool_web::{AppState, ConfigStore, FileActivityLog, ServerConfig, build_router};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ticket_pool=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ticket Pool Server");

    let config = ServerConfig::from_env();
    info!(
        config_path = %config.config_path.display(),
        log_path = %config.log_path.display(),
        cors_origin = %config.cors_origin,
        "Configuration loaded"
    );

    let log = FileActivityLog::open(&config.log_path, Arc::new(SystemClock))
        .with_context(|| format!("failed to open log file {}", config.log_path.display()))?;

    let config_store = ConfigStore::new(&config.config_path);
    let simulation = config_store.load_or_default().await;
    if let Err(err) = simulation.validate() {
        tracing::warn!(error = %err, "Saved configuration is invalid; fix it through /api/config");
    }

    let supervisor =
        PoolSupervisor::with_config(Arc::new(log), config.supervisor_settings(), simulation);

    let mut state = AppState::new(supervisor.clone(), config_store);
    if config.metrics_enabled {
        let mut exporter = MetricsExporter::new();
        exporter.install()?;
        state = state.with_metrics(exporter);
        info!("Metrics available at /metrics");
    }

    let app = build_router(state, &config.cors_origin);

    let addr = config.bind_addr().context("invalid HOST/PORT")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if supervisor.is_running() {
        info!("Stopping running simulation");
        supervisor.stop().await;
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
