//! Vendor and customer workers.
//!
//! A [`Worker`] is one loop with two roles. A producer releases tickets into
//! the pool each tick; a consumer purchases tickets and may then cancel part
//! of the purchase through an admin return. How many tickets move per tick
//! is decided by the run's [`QuantityPolicy`]; whether a purchase is
//! cancelled is decided by its [`RefundPolicy`].
//!
//! Each worker observes a shared stop signal (`watch::Receiver<bool>`):
//!
//! - at the top of every iteration,
//! - while waiting inside the pool,
//! - during the tick delay.
//!
//! The pool call and the delay are raced against the signal with
//! `tokio::select!`; losing the race drops the pool future, which leaves the
//! pool unchanged.

use crate::policy::{FixedQuantity, QuantityPolicy, RefundPolicy};
use crate::pool::TicketPool;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default delay between two ticks.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Which side of the pool a worker drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerRole {
    /// Vendor releasing tickets
    #[serde(alias = "vendor")]
    Producer,
    /// Customer purchasing tickets
    #[serde(alias = "customer")]
    Consumer,
}

impl WorkerRole {
    /// Stable lowercase name, used as a metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => write!(f, "vendor"),
            Self::Consumer => write!(f, "customer"),
        }
    }
}

/// Stable worker identity used in logs and reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    /// Create a worker id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for WorkerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What a worker is: identity, role and per-tick rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    /// Identity
    pub id: WorkerId,
    /// Producer or consumer
    pub role: WorkerRole,
    /// Rate handed to the quantity policy every tick
    pub rate: u32,
}

impl WorkerSpec {
    /// Create a spec.
    #[must_use]
    pub fn new(id: impl Into<WorkerId>, role: WorkerRole, rate: u32) -> Self {
        Self {
            id: id.into(),
            role,
            rate,
        }
    }

    /// A vendor spec.
    #[must_use]
    pub fn producer(id: impl Into<WorkerId>, rate: u32) -> Self {
        Self::new(id, WorkerRole::Producer, rate)
    }

    /// A customer spec.
    #[must_use]
    pub fn consumer(id: impl Into<WorkerId>, rate: u32) -> Self {
        Self::new(id, WorkerRole::Consumer, rate)
    }
}

/// Summary returned by a worker when it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    /// Identity
    pub id: WorkerId,
    /// Producer or consumer
    pub role: WorkerRole,
    /// Completed pool operations
    pub operations: u64,
    /// Tickets released (producer) or purchased (consumer)
    pub tickets_moved: u64,
    /// Purchased tickets the consumer cancelled and returned
    pub canceled_tickets: u64,
}

/// Resolves once a stop has been requested.
///
/// A dropped sender counts as a stop request.
pub async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|requested| *requested).await;
}

/// One vendor or customer bound to a pool.
pub struct Worker {
    spec: WorkerSpec,
    pool: Arc<TicketPool>,
    quantity: Arc<dyn QuantityPolicy>,
    refunds: RefundPolicy,
    tick: Duration,
    stop: watch::Receiver<bool>,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("spec", &self.spec)
            .field("quantity", &self.quantity)
            .field("refunds", &self.refunds)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl Worker {
    /// Create a worker with a fixed quantity policy, no refunds and a
    /// one-second tick.
    #[must_use]
    pub fn new(spec: WorkerSpec, pool: Arc<TicketPool>, stop: watch::Receiver<bool>) -> Self {
        Self {
            spec,
            pool,
            quantity: Arc::new(FixedQuantity),
            refunds: RefundPolicy::never(),
            tick: DEFAULT_TICK,
            stop,
        }
    }

    /// Set the quantity policy.
    #[must_use]
    pub fn with_quantity_policy(mut self, policy: Arc<dyn QuantityPolicy>) -> Self {
        self.quantity = policy;
        self
    }

    /// Set the refund policy. Only consumers consult it.
    #[must_use]
    pub const fn with_refund_policy(mut self, policy: RefundPolicy) -> Self {
        self.refunds = policy;
        self
    }

    /// Set the delay between ticks.
    #[must_use]
    pub const fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Identity of this worker.
    #[must_use]
    pub const fn id(&self) -> &WorkerId {
        &self.spec.id
    }

    /// Run the worker on its own task.
    pub fn spawn(self) -> JoinHandle<WorkerReport> {
        tokio::spawn(self.run())
    }

    /// Run until a stop is requested.
    pub async fn run(mut self) -> WorkerReport {
        let mut report = WorkerReport {
            id: self.spec.id.clone(),
            role: self.spec.role,
            operations: 0,
            tickets_moved: 0,
            canceled_tickets: 0,
        };
        tracing::debug!(worker = %self.spec.id, role = %self.spec.role, rate = self.spec.rate, "Worker started");

        while !*self.stop.borrow() {
            let quantity = self.quantity.quantity(self.spec.rate);
            let id = self.spec.id.as_str();

            let completed = match self.spec.role {
                WorkerRole::Producer => tokio::select! {
                    biased;
                    () = wait_for_stop(&mut self.stop) => false,
                    _ = self.pool.add(quantity, id) => true,
                },
                WorkerRole::Consumer => tokio::select! {
                    biased;
                    () = wait_for_stop(&mut self.stop) => false,
                    _ = self.pool.remove(quantity, id) => true,
                },
            };
            if !completed {
                break;
            }
            report.operations += 1;
            report.tickets_moved += u64::from(quantity);

            if self.spec.role == WorkerRole::Consumer {
                let cancel = self.refunds.tickets_to_cancel(quantity);
                if cancel > 0 && self.pool.admin_return(cancel, id).is_applied() {
                    report.canceled_tickets += u64::from(cancel);
                    tracing::debug!(worker = id, cancel, "Purchase cancelled");
                }
            }

            tokio::select! {
                biased;
                () = wait_for_stop(&mut self.stop) => break,
                () = tokio::time::sleep(self.tick) => {}
            }
        }

        tracing::debug!(
            worker = %report.id,
            operations = report.operations,
            tickets = report.tickets_moved,
            canceled = report.canceled_tickets,
            "Worker stopped"
        );
        report
    }
}
