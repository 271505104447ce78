//! Simulation lifecycle endpoints.
//!
//! Thin wrappers over [`PoolSupervisor`](ticket_pool_runtime::PoolSupervisor):
//! each handler calls one supervisor operation and maps its result to a
//! response. Lifecycle messages are returned as plain text.

use crate::{AppError, WebResult};
use crate::state::AppState;
use axum::{Json, extract::State};
use ticket_pool_core::{PoolStats, SimulationConfig};
use ticket_pool_runtime::PoolStatus;

/// Replace the simulation configuration and persist it.
///
/// ```text
/// POST /api/config
/// {"totalTickets": 100, "ticketReleaseRate": 5, "customerRetrievalRate": 3, "maxTicketCapacity": 200}
/// ```
///
/// # Errors
///
/// - 422 if the configuration is invalid
/// - 409 while a simulation is running
/// - 500 if the configuration file cannot be written
pub async fn set_config(
    State(state): State<AppState>,
    Json(config): Json<SimulationConfig>,
) -> WebResult<String> {
    state.supervisor.configure(config.clone()).await?;
    state.config_store.save(&config).await?;
    Ok(format!(
        "Configuration received: {} tickets.",
        config.total_tickets
    ))
}

/// Current simulation configuration.
///
/// ```text
/// GET /api/config
/// ```
pub async fn get_config(State(state): State<AppState>) -> Json<SimulationConfig> {
    Json(state.supervisor.config().await)
}

/// Start a simulation.
///
/// ```text
/// POST /api/start
/// ```
///
/// # Errors
///
/// - 409 while a simulation is already running
/// - 422 if the stored configuration is invalid
pub async fn start(State(state): State<AppState>) -> WebResult<String> {
    Ok(state.supervisor.start().await?)
}

/// Stop the simulation and persist the configuration.
///
/// Persisting is best effort: a write failure is logged and the summary is
/// still returned.
///
/// ```text
/// POST /api/stop
/// ```
pub async fn stop(State(state): State<AppState>) -> String {
    let summary = state.supervisor.stop().await;
    let config = state.supervisor.config().await;
    if let Err(err) = state.config_store.save(&config).await {
        tracing::warn!(error = %err, "Error saving configuration");
    }
    summary
}

/// Stop and discard the simulation.
///
/// ```text
/// POST /api/reset
/// ```
pub async fn reset(State(state): State<AppState>) -> String {
    state.supervisor.reset().await
}

/// Tickets currently available.
///
/// ```text
/// GET /api/status
/// {"currentTicketsAvailable": 42}
/// ```
#[allow(clippy::unused_async)]
pub async fn status(State(state): State<AppState>) -> Json<PoolStatus> {
    Json(state.supervisor.status())
}

/// Counters of the current (or last) pool.
///
/// ```text
/// GET /api/statistics
/// ```
///
/// # Errors
///
/// Returns 404 if no simulation has been started since the last reset.
#[allow(clippy::unused_async)]
pub async fn statistics(State(state): State<AppState>) -> WebResult<Json<PoolStats>> {
    state
        .supervisor
        .statistics()
        .map(Json)
        .ok_or_else(|| AppError::not_found("No ticket pool. Start the system first."))
}
