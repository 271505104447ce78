//! Simulation configuration.
//!
//! A [`SimulationConfig`] describes one run: how many tickets the pool starts
//! with, how large it may grow, how fast vendors release and customers buy,
//! and how many of each are spawned. The JSON form uses the camelCase keys of
//! the persisted `config.json` file.

use crate::error::ConfigError;
use crate::policy::QuantityPolicyKind;
use serde::{Deserialize, Serialize};

/// Configuration for a single simulation run.
///
/// Missing fields deserialize to their defaults, so a payload carrying only
/// the four core values (`totalTickets`, `ticketReleaseRate`,
/// `customerRetrievalRate`, `maxTicketCapacity`) is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    /// Tickets placed in the pool when a run starts
    pub total_tickets: u32,
    /// Per-tick release rate of each vendor
    pub ticket_release_rate: u32,
    /// Per-tick retrieval rate of each customer
    pub customer_retrieval_rate: u32,
    /// Upper bound on tickets held by the pool at once
    pub max_ticket_capacity: u32,
    /// Vendors spawned at start
    pub vendor_count: u32,
    /// Customers spawned at start
    pub customer_count: u32,
    /// How a rate is turned into a per-tick quantity
    pub quantity_policy: QuantityPolicyKind,
    /// Chance that a customer cancels its last purchase (0.0 to 1.0)
    pub refund_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_tickets: 100,
            ticket_release_rate: 5,
            customer_retrieval_rate: 3,
            max_ticket_capacity: 200,
            vendor_count: 2,
            customer_count: 5,
            quantity_policy: QuantityPolicyKind::Fixed,
            refund_probability: 0.0,
        }
    }
}

impl SimulationConfig {
    /// Create a configuration from the four core values, keeping default
    /// worker counts and policies.
    #[must_use]
    pub fn new(
        total_tickets: u32,
        ticket_release_rate: u32,
        customer_retrieval_rate: u32,
        max_ticket_capacity: u32,
    ) -> Self {
        Self {
            total_tickets,
            ticket_release_rate,
            customer_retrieval_rate,
            max_ticket_capacity,
            ..Self::default()
        }
    }

    /// Set how many vendors and customers a run spawns.
    #[must_use]
    pub const fn with_workers(mut self, vendor_count: u32, customer_count: u32) -> Self {
        self.vendor_count = vendor_count;
        self.customer_count = customer_count;
        self
    }

    /// Set the quantity policy.
    #[must_use]
    pub const fn with_quantity_policy(mut self, policy: QuantityPolicyKind) -> Self {
        self.quantity_policy = policy;
        self
    }

    /// Set the customer refund probability.
    #[must_use]
    pub const fn with_refund_probability(mut self, probability: f64) -> Self {
        self.refund_probability = probability;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the initial ticket count is zero, the
    /// capacity is below the initial ticket count, a rate is zero, or the
    /// refund probability lies outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_tickets == 0 {
            return Err(ConfigError::NoInitialTickets);
        }
        if self.max_ticket_capacity < self.total_tickets {
            return Err(ConfigError::CapacityBelowInitial {
                capacity: self.max_ticket_capacity,
                initial: self.total_tickets,
            });
        }
        if self.ticket_release_rate == 0 {
            return Err(ConfigError::ZeroRate {
                field: "ticketReleaseRate",
            });
        }
        if self.customer_retrieval_rate == 0 {
            return Err(ConfigError::ZeroRate {
                field: "customerRetrievalRate",
            });
        }
        if !(0.0..=1.0).contains(&self.refund_probability) {
            return Err(ConfigError::RefundProbability(
                self.refund_probability.to_string(),
            ));
        }
        Ok(())
    }

    /// Rates that can never be satisfied by the pool.
    ///
    /// A worker asking for more than `max_ticket_capacity` tickets per tick
    /// blocks until it is stopped. Such a configuration is legal; callers may
    /// use this to warn about it.
    #[must_use]
    pub fn unsatisfiable_rates(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.ticket_release_rate > self.max_ticket_capacity {
            fields.push("ticketReleaseRate");
        }
        if self.customer_retrieval_rate > self.max_ticket_capacity {
            fields.push("customerRetrievalRate");
        }
        fields
    }
}
