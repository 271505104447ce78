//! Capacity-bounded ticket pool.
//!
//! The pool is the only state shared between workers. Every field lives
//! behind one [`std::sync::Mutex`] that is held for short synchronous
//! sections only, never across an `.await`. Waiting callers park on a
//! [`tokio::sync::Notify`] used as a condition variable:
//!
//! ```text
//! loop {
//!     register interest in the next notification
//!     lock; if predicate holds { mutate; unlock; notify all; return }
//!     unlock; count the wait
//!     await notification          <- cancellation point
//! }
//! ```
//!
//! Interest is registered before the predicate is checked, so a mutation
//! that lands between the check and the await still wakes the waiter. The
//! predicate is re-checked after every wake because several waiters may
//! race for the same capacity change.
//!
//! # Cancellation
//!
//! [`TicketPool::add`] and [`TicketPool::remove`] are cancel-safe: the state
//! is mutated in one synchronous step after the last await, so dropping the
//! future while it waits (for example when a worker's stop signal wins a
//! `tokio::select!`) leaves the pool untouched.
//!
//! # Fairness
//!
//! No ordering among waiters is guaranteed; whichever waiter re-acquires the
//! lock first after a wake wins.

use crate::log::ActivityLog;
use crate::worker::WorkerRole;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Point-in-time snapshot of the pool's counters.
///
/// All fields are read under a single lock acquisition, so a snapshot is
/// never torn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// Tickets currently in the pool
    pub available: u32,
    /// Immutable upper bound on `available`
    pub capacity: u32,
    /// Tickets released into the pool, including the initial tickets
    pub total_released: u64,
    /// Tickets purchased from the pool
    pub total_sold: u64,
    /// Tickets handed back through admin returns
    pub total_admin_returned: u64,
    /// Times `available` reached exactly `capacity`
    pub capacity_reached_count: u64,
    /// Times a producer had to wait for room
    pub producer_wait_count: u64,
    /// Times a consumer had to wait for tickets
    pub consumer_wait_count: u64,
    /// Fail-fast operations and admin returns that were refused
    pub rejected_count: u64,
}

impl PoolStats {
    /// Whether the conservation law
    /// `released - sold + admin_returned == available` and the capacity
    /// bound hold for this snapshot.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let balance = i128::from(self.total_released) - i128::from(self.total_sold)
            + i128::from(self.total_admin_returned);
        self.available <= self.capacity && balance == i128::from(self.available)
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Available Tickets: {}/{}", self.available, self.capacity)?;
        writeln!(f, "Total Tickets Released: {}", self.total_released)?;
        writeln!(f, "Total Tickets Sold: {}", self.total_sold)?;
        writeln!(f, "Total Tickets Returned: {}", self.total_admin_returned)?;
        writeln!(f, "Max Capacity Reached Count: {}", self.capacity_reached_count)?;
        writeln!(f, "Customer Wait Count: {}", self.consumer_wait_count)?;
        write!(f, "Vendor Wait Count: {}", self.producer_wait_count)
    }
}

/// Why a non-blocking operation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The tickets would push the pool past its capacity
    CapacityExceeded {
        /// Tickets offered
        requested: u32,
        /// Tickets in the pool at the time
        available: u32,
    },
    /// The pool is empty
    SoldOut,
    /// The pool holds fewer tickets than requested
    Insufficient {
        /// Tickets requested
        requested: u32,
        /// Tickets in the pool at the time
        available: u32,
    },
}

/// Result of a non-blocking pool operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketOutcome {
    /// The operation was applied
    Applied {
        /// Tickets in the pool afterwards
        available: u32,
    },
    /// The operation was refused and nothing changed
    Rejected(Rejection),
}

impl TicketOutcome {
    /// Whether the operation was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug, Default)]
struct PoolState {
    available: u32,
    total_released: u64,
    total_sold: u64,
    total_admin_returned: u64,
    capacity_reached_count: u64,
    producer_wait_count: u64,
    consumer_wait_count: u64,
    rejected_count: u64,
}

impl PoolState {
    fn has_room(&self, quantity: u32, capacity: u32) -> bool {
        u64::from(self.available) + u64::from(quantity) <= u64::from(capacity)
    }

    fn has_tickets(&self, quantity: u32) -> bool {
        self.available >= quantity
    }

    // Callers check `has_room` first.
    fn put(&mut self, quantity: u32, capacity: u32) -> u32 {
        self.available += quantity;
        if self.available == capacity {
            self.capacity_reached_count += 1;
        }
        self.available
    }

    fn release(&mut self, quantity: u32, capacity: u32) -> u32 {
        self.total_released += u64::from(quantity);
        self.put(quantity, capacity)
    }

    fn sell(&mut self, quantity: u32) -> u32 {
        self.available -= quantity;
        self.total_sold += u64::from(quantity);
        self.available
    }

    fn snapshot(&self, capacity: u32) -> PoolStats {
        PoolStats {
            available: self.available,
            capacity,
            total_released: self.total_released,
            total_sold: self.total_sold,
            total_admin_returned: self.total_admin_returned,
            capacity_reached_count: self.capacity_reached_count,
            producer_wait_count: self.producer_wait_count,
            consumer_wait_count: self.consumer_wait_count,
            rejected_count: self.rejected_count,
        }
    }
}

/// Bounded pool of tickets shared by vendors and customers.
///
/// Invariants, for every reachable state:
///
/// - `0 <= available <= capacity`
/// - `total_released - total_sold + total_admin_returned == available`
///
/// Quantities are expected to be positive. A blocking request for more than
/// `capacity` tickets can never be satisfied and waits until its future is
/// dropped.
pub struct TicketPool {
    capacity: u32,
    state: Mutex<PoolState>,
    changed: Notify,
    log: Arc<dyn ActivityLog>,
}

impl fmt::Debug for TicketPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketPool")
            .field("capacity", &self.capacity)
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl TicketPool {
    /// Create a pool seeded with `initial` tickets.
    ///
    /// The initial tickets count as released. `initial` is clamped to
    /// `capacity`; configuration validation rejects that case upstream.
    #[must_use]
    pub fn new(initial: u32, capacity: u32, log: Arc<dyn ActivityLog>) -> Self {
        let initial = initial.min(capacity);
        let mut state = PoolState::default();
        state.release(initial, capacity);

        log.info(&format!(
            "Initialized TicketPool with {initial} tickets. Current Pool Size: {initial}/{capacity}"
        ));
        tracing::info!(initial, capacity, "Ticket pool initialized");
        metrics::gauge!("ticket_pool.available").set(f64::from(initial));

        Self {
            capacity,
            state: Mutex::new(state),
            changed: Notify::new(),
            log,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Immutable capacity.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Tickets currently in the pool.
    #[must_use]
    pub fn current_available(&self) -> u32 {
        self.lock().available
    }

    /// Consistent snapshot of every counter.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.lock().snapshot(self.capacity)
    }

    /// Release `quantity` tickets, waiting while they would exceed capacity.
    ///
    /// Wakes every waiter once applied. Returns the tickets available
    /// afterwards.
    ///
    /// Cancel-safe: dropping the future while it waits changes nothing. If
    /// `quantity > capacity` this never completes.
    pub async fn add(&self, quantity: u32, producer_id: &str) -> u32 {
        let capacity = self.capacity;
        let available = self
            .wait_until(WorkerRole::Producer, quantity, producer_id, |state| {
                state
                    .has_room(quantity, capacity)
                    .then(|| state.release(quantity, capacity))
            })
            .await;

        self.log.info(&format!(
            "{producer_id} added {quantity} tickets. Current Pool Size: {available}/{capacity}"
        ));
        tracing::debug!(producer = producer_id, quantity, available, "Tickets released");
        metrics::counter!("ticket_pool.released").increment(u64::from(quantity));
        available
    }

    /// Purchase `quantity` tickets, waiting while fewer are available.
    ///
    /// Wakes every waiter once applied. Returns the tickets available
    /// afterwards.
    ///
    /// Cancel-safe: dropping the future while it waits changes nothing. If
    /// `quantity > capacity` this never completes.
    pub async fn remove(&self, quantity: u32, consumer_id: &str) -> u32 {
        let available = self
            .wait_until(WorkerRole::Consumer, quantity, consumer_id, |state| {
                state.has_tickets(quantity).then(|| state.sell(quantity))
            })
            .await;

        self.log.info(&format!(
            "{consumer_id} purchased {quantity} tickets. Current Pool Size: {available}/{}",
            self.capacity
        ));
        tracing::debug!(consumer = consumer_id, quantity, available, "Tickets purchased");
        metrics::counter!("ticket_pool.sold").increment(u64::from(quantity));
        available
    }

    /// Monitor loop shared by `add` and `remove`.
    ///
    /// `attempt` runs under the lock and returns `Some` once it has applied
    /// its mutation.
    async fn wait_until<F>(&self, role: WorkerRole, quantity: u32, origin: &str, mut attempt: F) -> u32
    where
        F: FnMut(&mut PoolState) -> Option<u32>,
    {
        let mut announced = false;
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let available = {
                let mut state = self.lock();
                if let Some(available) = attempt(&mut *state) {
                    drop(state);
                    self.changed.notify_waiters();
                    metrics::gauge!("ticket_pool.available").set(f64::from(available));
                    return available;
                }
                match role {
                    WorkerRole::Producer => state.producer_wait_count += 1,
                    WorkerRole::Consumer => state.consumer_wait_count += 1,
                }
                state.available
            };

            metrics::counter!("ticket_pool.waits", "role" => role.as_str()).increment(1);
            if announced {
                tracing::trace!(origin, quantity, available, "Woken but still waiting");
            } else {
                announced = true;
                let message = match role {
                    WorkerRole::Producer => format!(
                        "Ticket pool at capacity! {origin} is waiting to add {quantity} tickets. (Pool size: {available}/{})",
                        self.capacity
                    ),
                    WorkerRole::Consumer => format!(
                        "No tickets available! {origin} is waiting to purchase {quantity} tickets. (Pool size: {available}/{})",
                        self.capacity
                    ),
                };
                self.log.warn(&message);
                tracing::debug!(origin, quantity, available, role = role.as_str(), "Waiting on pool");
            }

            notified.await;
        }
    }

    /// Release `quantity` tickets only if they fit right now.
    ///
    /// Never waits. A refusal is logged as a warning and counted.
    pub fn try_add(&self, quantity: u32, producer_id: &str) -> TicketOutcome {
        let outcome = {
            let mut state = self.lock();
            if state.has_room(quantity, self.capacity) {
                TicketOutcome::Applied {
                    available: state.release(quantity, self.capacity),
                }
            } else {
                state.rejected_count += 1;
                TicketOutcome::Rejected(Rejection::CapacityExceeded {
                    requested: quantity,
                    available: state.available,
                })
            }
        };

        match outcome {
            TicketOutcome::Applied { available } => {
                self.changed.notify_waiters();
                self.log.info(&format!(
                    "{producer_id} added {quantity} tickets. Current Pool Size: {available}/{}",
                    self.capacity
                ));
                metrics::counter!("ticket_pool.released").increment(u64::from(quantity));
            }
            TicketOutcome::Rejected(_) => {
                self.log.warn(&format!(
                    "Cannot add {quantity} tickets by {producer_id}. Exceeds max capacity."
                ));
                tracing::warn!(producer = producer_id, quantity, "Release rejected: capacity exceeded");
                metrics::counter!("ticket_pool.rejected").increment(1);
            }
        }
        outcome
    }

    /// Purchase `quantity` tickets only if they are available right now.
    ///
    /// Never waits. A refusal is logged as a warning and counted.
    pub fn try_remove(&self, quantity: u32, consumer_id: &str) -> TicketOutcome {
        let outcome = {
            let mut state = self.lock();
            if state.has_tickets(quantity) {
                TicketOutcome::Applied {
                    available: state.sell(quantity),
                }
            } else {
                state.rejected_count += 1;
                if state.available == 0 {
                    TicketOutcome::Rejected(Rejection::SoldOut)
                } else {
                    TicketOutcome::Rejected(Rejection::Insufficient {
                        requested: quantity,
                        available: state.available,
                    })
                }
            }
        };

        match outcome {
            TicketOutcome::Applied { available } => {
                self.changed.notify_waiters();
                self.log.info(&format!(
                    "{consumer_id} purchased {quantity} tickets. Current Pool Size: {available}/{}",
                    self.capacity
                ));
                metrics::counter!("ticket_pool.sold").increment(u64::from(quantity));
            }
            TicketOutcome::Rejected(rejection) => {
                let message = match rejection {
                    Rejection::Insufficient { available, .. } => format!(
                        "{consumer_id} tried to purchase {quantity} tickets but only {available} are available."
                    ),
                    Rejection::SoldOut | Rejection::CapacityExceeded { .. } => {
                        format!("No tickets available for {consumer_id}.")
                    }
                };
                self.log.warn(&message);
                tracing::debug!(consumer = consumer_id, quantity, ?rejection, "Purchase rejected");
                metrics::counter!("ticket_pool.rejected").increment(1);
            }
        }
        outcome
    }

    /// Hand `quantity` previously sold tickets back to the pool.
    ///
    /// Compensating action for cancelled purchases. Never waits: if the
    /// tickets would exceed capacity the return is refused, logged as a
    /// warning and counted, and the pool is left unchanged.
    pub fn admin_return(&self, quantity: u32, origin_id: &str) -> TicketOutcome {
        let outcome = {
            let mut state = self.lock();
            if state.has_room(quantity, self.capacity) {
                state.total_admin_returned += u64::from(quantity);
                TicketOutcome::Applied {
                    available: state.put(quantity, self.capacity),
                }
            } else {
                state.rejected_count += 1;
                TicketOutcome::Rejected(Rejection::CapacityExceeded {
                    requested: quantity,
                    available: state.available,
                })
            }
        };

        match outcome {
            TicketOutcome::Applied { available } => {
                self.changed.notify_waiters();
                self.log.info(&format!(
                    "Admin returned {quantity} canceled ticket(s) from {origin_id}. Current Pool Size: {available}/{}",
                    self.capacity
                ));
                tracing::debug!(origin = origin_id, quantity, available, "Admin return applied");
                metrics::counter!("ticket_pool.admin_returned").increment(u64::from(quantity));
            }
            TicketOutcome::Rejected(_) => {
                self.log.warn(&format!(
                    "Cannot return {quantity} tickets from {origin_id}. Exceeds max capacity."
                ));
                tracing::warn!(origin = origin_id, quantity, "Admin return rejected: capacity exceeded");
                metrics::counter!("ticket_pool.rejected").increment(1);
            }
        }
        outcome
    }
}
