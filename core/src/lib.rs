//! # Ticket Pool Core
//!
//! Core types for the ticket pool simulator.
//!
//! This crate provides the pieces that run inside a simulation:
//! a capacity-bounded [`TicketPool`] shared by many concurrent workers,
//! the [`Worker`] loop that drives vendors and customers, the strategy
//! objects that decide how many tickets move per tick, and the
//! [`SimulationConfig`] that describes a run.
//!
//! ## Core Concepts
//!
//! - **Pool**: bounded buffer of tickets with blocking `add`/`remove`
//! - **Producer (vendor)**: worker that releases tickets into the pool
//! - **Consumer (customer)**: worker that purchases tickets from the pool
//! - **Tick**: one iteration of a worker loop, gated by a fixed delay
//! - **Admin return**: non-blocking refund path back into the pool
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ticket_pool_core::{
//!     environment::SystemClock, log::MemoryLog, pool::TicketPool,
//!     worker::{Worker, WorkerSpec},
//! };
//! use tokio::sync::watch;
//!
//! # async fn example() {
//! let log = Arc::new(MemoryLog::new(1_000, Arc::new(SystemClock)));
//! let pool = Arc::new(TicketPool::new(10, 20, log));
//! let (stop_tx, stop_rx) = watch::channel(false);
//!
//! let handle = Worker::new(WorkerSpec::consumer("[Customer-1]", 2), pool, stop_rx).spawn();
//! stop_tx.send_replace(true);
//! let report = handle.await;
//! # let _ = report;
//! # }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod config;
pub mod error;
pub mod log;
pub mod policy;
pub mod pool;
pub mod worker;

/// Environment module - injected time source
///
/// Activity log sinks stamp every entry with the time returned by a
/// [`Clock`](environment::Clock), so tests can swap in a fixed clock and get
/// byte-for-byte reproducible log lines.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic log lines
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`].
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use config::SimulationConfig;
pub use error::ConfigError;
pub use log::{ActivityLog, LogLevel, MemoryLog};
pub use policy::{FixedQuantity, QuantityPolicy, QuantityPolicyKind, RandomQuantity, RefundPolicy};
pub use pool::{PoolStats, Rejection, TicketOutcome, TicketPool};
pub use worker::{Worker, WorkerId, WorkerReport, WorkerRole, WorkerSpec};
