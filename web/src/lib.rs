//! Axum HTTP adapter for the ticket pool simulator.
//!
//! This crate is the imperative shell around the supervisor: it parses
//! requests, calls one [`PoolSupervisor`](ticket_pool_runtime::PoolSupervisor)
//! operation per route and maps the result to a response. It also owns the
//! process-level concerns: the configuration file, the log file and
//! environment-driven server settings.
//!
//! # Routes
//!
//! ```text
//! GET  /health              liveness
//! GET  /metrics             Prometheus scrape (when enabled)
//! POST /api/config          configure + persist
//! GET  /api/config          current configuration
//! POST /api/start           start a run
//! POST /api/stop            stop, persist configuration
//! POST /api/reset           stop and discard
//! GET  /api/status          {"currentTicketsAvailable": n}
//! GET  /api/statistics      pool counters
//! POST /api/vendors         {name, rate}
//! POST /api/customers       {name, rate}
//! GET  /api/logs            activity log lines
//! POST /api/clear-logs      clear the activity log
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ticket_pool_web::{AppState, ConfigStore, build_router};
//!
//! let state = AppState::new(supervisor, ConfigStore::new("config.json"));
//! let app = build_router(state, "http://localhost:3000");
//! axum::serve(listener, app).await?;
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod config_store;
pub mod error;
pub mod file_log;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use config::ServerConfig;
pub use config_store::{ConfigStore, ConfigStoreError};
pub use error::{AppError, ErrorCode};
pub use file_log::FileActivityLog;
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
