//! Router configuration.
//!
//! Builds the complete Axum router with all endpoints.

use crate::handlers::{health, logs, simulation, workers};
use crate::state::AppState;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Configures:
/// - Health and metrics endpoints at the root
/// - Simulation endpoints under `/api`
/// - CORS for `cors_origin` on every route
/// - Request tracing
///
/// An origin that is not a valid header value is logged and CORS is left
/// closed.
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let api_routes = Router::new()
        // Configuration
        .route("/config", post(simulation::set_config).get(simulation::get_config))
        // Lifecycle
        .route("/start", post(simulation::start))
        .route("/stop", post(simulation::stop))
        .route("/reset", post(simulation::reset))
        // Queries
        .route("/status", get(simulation::status))
        .route("/statistics", get(simulation::statistics))
        // Runtime workers
        .route("/vendors", post(workers::add_vendor))
        .route("/customers", post(workers::add_customer))
        // Activity log
        .route("/logs", get(logs::get_logs))
        .route("/clear-logs", post(logs::clear_logs));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .nest("/api", api_routes)
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(err) => {
            tracing::warn!(origin, error = %err, "Invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}
