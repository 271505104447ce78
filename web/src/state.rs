//! Application state for Axum handlers.

use crate::config_store::ConfigStore;
use std::sync::Arc;
use ticket_pool_runtime::PoolSupervisor;
use ticket_pool_runtime::metrics::MetricsExporter;

/// Application state shared across all HTTP handlers.
///
/// Cheap to clone: every field is a shared handle.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Simulation lifecycle
    pub supervisor: PoolSupervisor,
    /// Persisted simulation configuration
    pub config_store: Arc<ConfigStore>,
    /// Prometheus exporter, if metrics are enabled
    pub metrics: Option<Arc<MetricsExporter>>,
}

impl AppState {
    /// Create a new application state without metrics.
    #[must_use]
    pub fn new(supervisor: PoolSupervisor, config_store: ConfigStore) -> Self {
        Self {
            supervisor,
            config_store: Arc::new(config_store),
            metrics: None,
        }
    }

    /// Attach a Prometheus exporter served at `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, exporter: MetricsExporter) -> Self {
        self.metrics = Some(Arc::new(exporter));
        self
    }
}
