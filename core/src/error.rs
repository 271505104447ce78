//! Error types for simulation configuration.

use thiserror::Error;

/// Errors produced when validating a [`SimulationConfig`](crate::SimulationConfig)
/// or a worker definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Initial ticket count must be positive
    #[error("Initial ticket count must be greater than zero")]
    NoInitialTickets,

    /// Capacity cannot hold the initial tickets
    #[error("Max ticket capacity ({capacity}) must be at least the initial ticket count ({initial})")]
    CapacityBelowInitial {
        /// Configured capacity
        capacity: u32,
        /// Configured initial tickets
        initial: u32,
    },

    /// A per-tick rate of zero would never move a ticket
    #[error("{field} must be at least 1")]
    ZeroRate {
        /// Name of the offending field
        field: &'static str,
    },

    /// Refund probability outside `[0, 1]`
    #[error("Refund probability must be between 0 and 1, got {0}")]
    RefundProbability(String),

    /// Worker name is empty
    #[error("Worker name must not be empty")]
    EmptyWorkerName,
}
