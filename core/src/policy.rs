//! Per-tick strategies for workers.
//!
//! A worker never decides on its own how many tickets to move or whether to
//! refund a purchase. It asks a [`QuantityPolicy`] and a [`RefundPolicy`],
//! both chosen per run, so the randomness can be swapped out (or removed
//! entirely for deterministic tests).

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Turns a worker's configured rate into the quantity for one tick.
///
/// Implementations must return a value in `1..=rate` for any `rate >= 1`.
pub trait QuantityPolicy: Send + Sync + fmt::Debug {
    /// Quantity to move this tick.
    fn quantity(&self, rate: u32) -> u32;
}

/// Always moves exactly `rate` tickets.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedQuantity;

impl QuantityPolicy for FixedQuantity {
    fn quantity(&self, rate: u32) -> u32 {
        rate.max(1)
    }
}

/// Moves a uniformly random quantity in `1..=rate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomQuantity;

impl QuantityPolicy for RandomQuantity {
    fn quantity(&self, rate: u32) -> u32 {
        rand::thread_rng().gen_range(1..=rate.max(1))
    }
}

/// Serializable selector for the built-in quantity policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityPolicyKind {
    /// [`FixedQuantity`]
    #[default]
    Fixed,
    /// [`RandomQuantity`]
    Random,
}

impl QuantityPolicyKind {
    /// Build the policy object for this kind.
    #[must_use]
    pub fn build(self) -> Arc<dyn QuantityPolicy> {
        match self {
            Self::Fixed => Arc::new(FixedQuantity),
            Self::Random => Arc::new(RandomQuantity),
        }
    }
}

/// Decides whether a customer cancels the tickets it just bought.
///
/// With probability `probability` the whole purchase is cancelled and handed
/// back to the pool through an admin return; otherwise nothing is cancelled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefundPolicy {
    probability: f64,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self::never()
    }
}

impl RefundPolicy {
    /// A policy that never cancels.
    #[must_use]
    pub const fn never() -> Self {
        Self { probability: 0.0 }
    }

    /// A policy that cancels with the given probability.
    ///
    /// Values are clamped to `[0, 1]`; NaN is treated as 0.
    #[must_use]
    pub fn with_probability(probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self { probability }
    }

    /// The cancellation probability.
    #[must_use]
    pub const fn probability(&self) -> f64 {
        self.probability
    }

    /// Number of the `purchased` tickets to cancel.
    #[must_use]
    pub fn tickets_to_cancel(&self, purchased: u32) -> u32 {
        if purchased == 0 || self.probability <= 0.0 {
            0
        } else if self.probability >= 1.0 || rand::thread_rng().gen_bool(self.probability) {
            purchased
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_quantity_returns_rate() {
        assert_eq!(FixedQuantity.quantity(4), 4);
        assert_eq!(FixedQuantity.quantity(0), 1);
    }

    #[test]
    fn test_random_quantity_stays_in_range() {
        for _ in 0..500 {
            let quantity = RandomQuantity.quantity(3);
            assert!((1..=3).contains(&quantity));
        }
        assert_eq!(RandomQuantity.quantity(1), 1);
    }

    #[test]
    fn test_policy_kind_builds_matching_policy() {
        let fixed = QuantityPolicyKind::Fixed.build();
        assert_eq!(fixed.quantity(7), 7);

        let random = QuantityPolicyKind::Random.build();
        assert!((1..=7).contains(&random.quantity(7)));
    }

    #[test]
    fn test_refund_policy_extremes() {
        assert_eq!(RefundPolicy::never().tickets_to_cancel(5), 0);
        assert_eq!(RefundPolicy::with_probability(1.0).tickets_to_cancel(5), 5);
        assert_eq!(RefundPolicy::with_probability(1.0).tickets_to_cancel(0), 0);
    }

    #[test]
    fn test_refund_policy_clamps() {
        assert!((RefundPolicy::with_probability(3.0).probability() - 1.0).abs() < f64::EPSILON);
        assert!(RefundPolicy::with_probability(-1.0).probability().abs() < f64::EPSILON);
        assert!(RefundPolicy::with_probability(f64::NAN).probability().abs() < f64::EPSILON);
    }

    #[test]
    fn test_refund_policy_is_all_or_nothing() {
        let policy = RefundPolicy::with_probability(0.5);
        for _ in 0..200 {
            let cancelled = policy.tickets_to_cancel(3);
            assert!(cancelled == 0 || cancelled == 3);
        }
    }
}
