//! Activity log endpoints.
//!
//! The log sink may be file-backed, so reads and clears run on the blocking
//! thread pool.

use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::WebResult;
use axum::{Json, extract::State};
use tokio::task::JoinError;

fn join_failed(err: JoinError) -> AppError {
    AppError::new(ErrorCode::InternalServerError, "Failed to access the activity log").caused_by(err)
}

/// Activity log lines, oldest first.
///
/// ```text
/// GET /api/logs
/// ```
///
/// # Errors
///
/// Returns 500 if the read task panics.
pub async fn get_logs(State(state): State<AppState>) -> WebResult<Json<Vec<String>>> {
    let supervisor = state.supervisor.clone();
    let lines = tokio::task::spawn_blocking(move || supervisor.logs())
        .await
        .map_err(join_failed)?;
    Ok(Json(lines))
}

/// Drop every activity log line.
///
/// ```text
/// POST /api/clear-logs
/// ```
///
/// # Errors
///
/// Returns 500 if the clear task panics.
pub async fn clear_logs(State(state): State<AppState>) -> WebResult<&'static str> {
    let supervisor = state.supervisor.clone();
    tokio::task::spawn_blocking(move || supervisor.clear_logs())
        .await
        .map_err(join_failed)?;
    tracing::info!("Activity log cleared");
    Ok("Logs cleared.")
}
