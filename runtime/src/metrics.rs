//! Prometheus metrics for the ticket pool simulator.
//!
//! The pool and the supervisor record through the `metrics` facade; nothing
//! is exported until a recorder is installed. [`MetricsExporter`] installs
//! the Prometheus recorder and renders the scrape text:
//!
//! - Pool traffic: released, sold, admin-returned and rejected tickets
//! - Pool waits, labelled by role
//! - Available tickets gauge
//! - Run lifecycle: runs started/stopped, worker shutdown timeouts
//!
//! # Example
//!
//! ```rust,no_run
//! use ticket_pool_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // Serve this from a `/metrics` route
//! let text = exporter.render();
//! # let _ = text;
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder wrapper.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsExporter")
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

impl MetricsExporter {
    /// Create an exporter that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe every metric and install the Prometheus recorder globally.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if the recorder cannot be installed.
    ///
    /// # Note
    ///
    /// Only one global recorder can exist per process. If one is already
    /// installed (e.g., by another test), this logs a warning, returns `Ok`
    /// and [`render`](Self::render) yields `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                register_metrics();
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this exporter did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Pool metrics
    describe_counter!(
        "ticket_pool.released",
        "Total number of tickets released into the pool"
    );
    describe_counter!("ticket_pool.sold", "Total number of tickets purchased");
    describe_counter!(
        "ticket_pool.admin_returned",
        "Total number of cancelled tickets returned to the pool"
    );
    describe_counter!(
        "ticket_pool.rejected",
        "Total number of refused fail-fast operations and admin returns"
    );
    describe_counter!(
        "ticket_pool.waits",
        "Number of times a worker had to wait on the pool"
    );
    describe_gauge!("ticket_pool.available", "Tickets currently in the pool");

    // Supervisor metrics
    describe_counter!("supervisor.runs.started", "Total number of runs started");
    describe_counter!("supervisor.runs.stopped", "Total number of runs stopped");
    describe_counter!(
        "supervisor.worker.shutdown_timeout",
        "Workers aborted because they did not stop in time"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_starts_uninstalled() {
        let exporter = MetricsExporter::new();
        assert!(exporter.handle().is_none());
        assert!(exporter.render().is_none());
        assert_eq!(
            format!("{exporter:?}"),
            "MetricsExporter { installed: false }"
        );
    }

    #[test]
    fn test_install_and_render() {
        let mut exporter = MetricsExporter::new();
        assert!(exporter.install().is_ok());

        metrics::counter!("ticket_pool.released").increment(3);

        // Another test may already own the global recorder.
        if let Some(rendered) = exporter.render() {
            assert!(rendered.contains("ticket_pool_released"));
        }
    }
}
