//! Liveness and Prometheus scrape endpoints. Neither touches the supervisor.

use crate::{AppError, WebResult};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};

/// Liveness probe: `GET /health` answers `200 ok` while the process serves.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Prometheus scrape endpoint.
///
/// # Endpoint
///
/// ```text
/// GET /metrics
/// ```
///
/// # Errors
///
/// Returns 404 when metrics are disabled or another recorder owns the
/// process-wide registry.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> WebResult<String> {
    state
        .metrics
        .as_ref()
        .and_then(|exporter| exporter.render())
        .ok_or_else(|| AppError::not_found("Metrics are not enabled"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_is_ok() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
