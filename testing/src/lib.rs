//! # Ticket Pool Testing
//!
//! Testing utilities and fixtures for the ticket pool simulator.
//!
//! This crate provides:
//! - A fixed clock so activity log lines are reproducible
//! - Fast supervisor settings and small configurations
//! - Assertion helpers for pool invariants
//! - Property-based testing strategies for pool operations
//!
//! ## Example
//!
//! ```ignore
//! use ticket_pool_testing::{fast_settings, test_log};
//! use ticket_pool_runtime::PoolSupervisor;
//!
//! #[tokio::test]
//! async fn test_run() {
//!     let supervisor = PoolSupervisor::new(test_log(), fast_settings());
//!     supervisor.start().await.unwrap();
//!     supervisor.stop().await;
//! }
//! ```

use chrono::{DateTime, Utc};
use ticket_pool_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making log lines reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use ticket_pool_testing::mocks::FixedClock;
    /// use ticket_pool_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2);
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Fixtures and assertion helpers.
pub mod helpers {
    use super::mocks::test_clock;
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;
    use ticket_pool_core::{MemoryLog, PoolStats, SimulationConfig};
    use ticket_pool_runtime::SupervisorSettings;

    /// In-memory activity log stamped by [`test_clock`].
    #[must_use]
    pub fn test_log() -> Arc<MemoryLog> {
        Arc::new(MemoryLog::new(10_000, Arc::new(test_clock())))
    }

    /// Supervisor settings with millisecond ticks, for tests that run whole
    /// simulations.
    #[must_use]
    pub const fn fast_settings() -> SupervisorSettings {
        SupervisorSettings::new(
            Duration::from_millis(10),
            Duration::from_millis(10),
            2,
            Duration::from_secs(2),
        )
    }

    /// Small valid configuration: 10 initial tickets, capacity 20, one vendor
    /// and one customer moving one ticket per tick.
    #[must_use]
    pub fn small_config() -> SimulationConfig {
        SimulationConfig::new(10, 1, 1, 20).with_workers(1, 1)
    }

    /// Configuration that a single customer drains: `initial` tickets at full
    /// capacity, no vendors, one customer buying `rate` per tick.
    #[must_use]
    pub fn draining_config(initial: u32, rate: u32) -> SimulationConfig {
        SimulationConfig::new(initial, 1, rate, initial).with_workers(0, 1)
    }

    /// Assert the capacity bound and the conservation law on a snapshot.
    ///
    /// # Panics
    ///
    /// Panics with the offending snapshot if an invariant does not hold.
    #[allow(clippy::panic)]
    pub fn assert_pool_invariants(stats: &PoolStats) {
        assert!(
            stats.available <= stats.capacity,
            "available exceeds capacity: {stats:?}"
        );
        assert!(
            stats.is_consistent(),
            "released - sold + returned != available: {stats:?}"
        );
    }

    /// Poll `condition` every few milliseconds until it returns true or
    /// `timeout` elapses. Returns whether the condition was met.
    pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let poll = async {
            loop {
                if condition().await {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }

    /// Install a test-friendly tracing subscriber honoring `RUST_LOG`.
    ///
    /// Safe to call from every test; only the first call installs.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing strategies using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// One non-blocking pool operation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PoolOp {
        /// `try_add`
        Release(u32),
        /// `try_remove`
        Purchase(u32),
        /// `admin_return`
        Return(u32),
    }

    /// Strategy for a single operation moving `1..=max_quantity` tickets.
    pub fn pool_op(max_quantity: u32) -> impl Strategy<Value = PoolOp> {
        let quantity = 1..=max_quantity.max(1);
        prop_oneof![
            quantity.clone().prop_map(PoolOp::Release),
            quantity.clone().prop_map(PoolOp::Purchase),
            quantity.prop_map(PoolOp::Return),
        ]
    }

    /// Strategy for `(initial, capacity)` with `initial <= capacity`.
    pub fn pool_bounds(max_capacity: u32) -> impl Strategy<Value = (u32, u32)> {
        (1..=max_capacity.max(1)).prop_flat_map(|capacity| (0..=capacity, Just(capacity)))
    }
}

// Re-export commonly used items
pub use helpers::{
    assert_pool_invariants, draining_config, fast_settings, init_tracing, small_config,
    test_log, wait_until,
};
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use ticket_pool_core::ActivityLog;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_log_lines_are_reproducible() {
        let log = test_log();
        log.info("hello");
        assert_eq!(log.entries(), vec!["2025-01-01T00:00:00.000Z INFO: hello".to_string()]);
    }

    #[test]
    fn test_fixture_configs_are_valid() {
        assert!(small_config().validate().is_ok());
        assert!(draining_config(10, 2).validate().is_ok());
    }

    #[tokio::test]
    async fn test_wait_until_times_out() {
        let met = wait_until(Duration::from_millis(20), || async { false }).await;
        assert!(!met);
        let met = wait_until(Duration::from_millis(20), || async { true }).await;
        assert!(met);
    }
}
