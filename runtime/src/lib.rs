//! # Ticket Pool Runtime
//!
//! Runtime for the ticket pool simulator.
//!
//! This crate owns the lifecycle of a simulation run: it builds the pool,
//! spawns vendors and customers, watches for depletion and drains every
//! worker on stop.
//!
//! ## Core Components
//!
//! - **`PoolSupervisor`**: the `STOPPED -> RUNNING -> STOPPED` state machine
//! - **Monitor**: background task that stops a run once the pool stays empty
//! - **Metrics**: descriptions and a Prometheus exporter for pool and run metrics
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ticket_pool_core::{environment::SystemClock, MemoryLog, SimulationConfig};
//! use ticket_pool_runtime::{PoolSupervisor, SupervisorSettings};
//!
//! # async fn example() -> Result<(), ticket_pool_runtime::SupervisorError> {
//! let log = Arc::new(MemoryLog::new(1_000, Arc::new(SystemClock)));
//! let supervisor = PoolSupervisor::new(log, SupervisorSettings::default());
//!
//! supervisor.configure(SimulationConfig::new(50, 2, 3, 100)).await?;
//! println!("{}", supervisor.start().await?);
//! println!("{}", supervisor.stop().await);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

/// Prometheus metrics for observability
pub mod metrics;

/// Run lifecycle and worker supervision
pub mod supervisor;

/// Error types for supervisor operations
pub mod error {
    use thiserror::Error;
    use ticket_pool_core::ConfigError;

    /// Errors returned by [`PoolSupervisor`](crate::PoolSupervisor) operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum SupervisorError {
        /// Configuration or worker parameters were rejected
        ///
        /// Nothing changed.
        #[error("Invalid configuration: {0}")]
        Validation(#[from] ConfigError),

        /// The operation needs a running simulation
        #[error("Ticket system is not started. Please start the system first.")]
        NotStarted,

        /// The operation is only allowed while stopped
        #[error("Ticket system is already running.")]
        AlreadyRunning,
    }
}

pub use error::SupervisorError;
pub use supervisor::{PoolStatus, PoolSupervisor};

/// Timing parameters of a supervisor.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use ticket_pool_runtime::SupervisorSettings;
///
/// let settings = SupervisorSettings::default()
///     .with_tick_interval(Duration::from_millis(100))
///     .with_depletion_confirmations(3);
/// assert_eq!(settings.depletion_confirmations, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Delay between two iterations of every worker
    pub tick_interval: Duration,
    /// How often the monitor polls the pool
    pub monitor_interval: Duration,
    /// Consecutive empty polls required before the monitor stops a run
    pub depletion_confirmations: u32,
    /// How long `stop` waits for all workers together; stragglers are aborted
    pub shutdown_timeout: Duration,
}

impl SupervisorSettings {
    /// Create settings with custom values
    #[must_use]
    pub const fn new(
        tick_interval: Duration,
        monitor_interval: Duration,
        depletion_confirmations: u32,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            tick_interval,
            monitor_interval,
            depletion_confirmations,
            shutdown_timeout,
        }
    }

    /// Set the worker tick interval
    #[must_use]
    pub const fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the monitor poll interval
    #[must_use]
    pub const fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Set the number of consecutive empty polls before auto-stop
    ///
    /// Values below 1 are treated as 1.
    #[must_use]
    pub const fn with_depletion_confirmations(mut self, confirmations: u32) -> Self {
        self.depletion_confirmations = confirmations;
        self
    }

    /// Set the shutdown deadline shared by all workers of a run
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            monitor_interval: Duration::from_secs(1),
            depletion_confirmations: 2,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}
