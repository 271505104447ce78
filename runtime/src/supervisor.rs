//! Pool supervisor.
//!
//! [`PoolSupervisor`] is a cheap-to-clone handle that owns at most one run at
//! a time. A run is a pool, a stop signal shared by its workers, the worker
//! join handles and a monitor task.
//!
//! Lifecycle operations (`configure`, `start`, `stop`, `reset`,
//! `add_worker`) are serialized by an async mutex. Reads that must never
//! wait on a lifecycle transition (`status`, `statistics`, `is_running`) go
//! through a separate snapshot slot instead.
//!
//! The monitor only holds a [`Weak`] reference to the supervisor. Dropping
//! every handle drops the run's stop sender, which every worker treats as a
//! stop request.

use crate::{SupervisorError, SupervisorSettings};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use ticket_pool_core::worker::wait_for_stop;
use ticket_pool_core::{
    ActivityLog, ConfigError, PoolStats, QuantityPolicy, RefundPolicy, SimulationConfig,
    TicketOutcome, TicketPool, Worker, WorkerId, WorkerReport, WorkerRole, WorkerSpec,
};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const BANNER: &str = "***********************************************";

/// Lightweight status returned to pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    /// Tickets in the current (or last) pool; 0 when there is none
    #[serde(rename = "currentTicketsAvailable")]
    pub current_available: u32,
}

/// Who asked for a run to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopOrigin {
    Caller,
    Monitor,
}

struct RunningWorker {
    id: WorkerId,
    role: WorkerRole,
    handle: JoinHandle<WorkerReport>,
}

struct Run {
    generation: u64,
    pool: Arc<TicketPool>,
    stop_tx: watch::Sender<bool>,
    workers: Vec<RunningWorker>,
    monitor: Option<JoinHandle<()>>,
    quantity: Arc<dyn QuantityPolicy>,
    refunds: RefundPolicy,
    tick: Duration,
}

impl Run {
    fn spawn_worker(&mut self, spec: WorkerSpec, log: &dyn ActivityLog) {
        let id = spec.id.clone();
        let role = spec.role;
        let handle = Worker::new(spec, Arc::clone(&self.pool), self.stop_tx.subscribe())
            .with_quantity_policy(Arc::clone(&self.quantity))
            .with_refund_policy(self.refunds)
            .with_tick(self.tick)
            .spawn();

        log.info(&format!("{id} started."));
        tracing::debug!(worker = %id, %role, "Worker spawned");
        self.workers.push(RunningWorker { id, role, handle });
    }
}

struct Lifecycle {
    config: SimulationConfig,
    run: Option<Run>,
    generation: u64,
}

struct Inner {
    log: Arc<dyn ActivityLog>,
    settings: SupervisorSettings,
    lifecycle: Mutex<Lifecycle>,
    pool: RwLock<Option<Arc<TicketPool>>>,
    running: AtomicBool,
}

impl Inner {
    fn current_pool(&self) -> Option<Arc<TicketPool>> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_pool(&self, pool: Option<Arc<TicketPool>>) {
        *self.pool.write().unwrap_or_else(PoisonError::into_inner) = pool;
    }

    fn live_pool(&self) -> Result<Arc<TicketPool>, SupervisorError> {
        if !self.running.load(Ordering::Acquire) {
            return Err(SupervisorError::NotStarted);
        }
        self.current_pool().ok_or(SupervisorError::NotStarted)
    }

    /// Stop the current run, if any, and return the summary.
    ///
    /// Must be called with the lifecycle lock held.
    async fn stop_locked(&self, lifecycle: &mut Lifecycle, origin: StopOrigin) -> String {
        let total = lifecycle.config.total_tickets;
        let Some(mut run) = lifecycle.run.take() else {
            let remaining = self.current_pool().map_or(0, |pool| pool.current_available());
            return summary(remaining, total);
        };

        tracing::info!(generation = run.generation, ?origin, workers = run.workers.len(), "Stopping run");
        self.running.store(false, Ordering::Release);
        run.stop_tx.send_replace(true);

        // One deadline for the whole drain; workers left past it are aborted.
        let timeout = self.settings.shutdown_timeout;
        let deadline = tokio::time::Instant::now() + timeout;
        for RunningWorker { id, role, mut handle } in run.workers.drain(..) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(report)) => {
                    self.log.info(&format!("{id} has completed."));
                    if report.canceled_tickets > 0 {
                        self.log.info(&format!(
                            "{id} canceled {} ticket(s) in total.",
                            report.canceled_tickets
                        ));
                    }
                    tracing::debug!(
                        worker = %id,
                        %role,
                        operations = report.operations,
                        tickets = report.tickets_moved,
                        "Worker joined"
                    );
                }
                Ok(Err(err)) => {
                    self.log.warn(&format!("{id} was interrupted while stopping."));
                    tracing::error!(worker = %id, %role, error = %err, "Worker task failed");
                }
                Err(_) => {
                    handle.abort();
                    self.log.warn(&format!(
                        "{id} did not stop within {}ms and was aborted.",
                        timeout.as_millis()
                    ));
                    tracing::warn!(worker = %id, %role, ?timeout, "Worker shutdown timed out");
                    metrics::counter!("supervisor.worker.shutdown_timeout").increment(1);
                }
            }
        }

        if let Some(monitor) = run.monitor.take() {
            match origin {
                StopOrigin::Caller => {
                    monitor.abort();
                    let _ = monitor.await;
                }
                // The monitor is the task running this stop.
                StopOrigin::Monitor => drop(monitor),
            }
        }

        let remaining = run.pool.current_available();
        let message = summary(remaining, total);
        self.log.info(&message);
        tracing::info!(remaining, total, "Simulation ended");
        metrics::counter!("supervisor.runs.stopped").increment(1);
        message
    }
}

/// Handle to the simulation lifecycle.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct PoolSupervisor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PoolSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolSupervisor")
            .field("settings", &self.inner.settings)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl PoolSupervisor {
    /// Create a stopped supervisor with the default configuration.
    #[must_use]
    pub fn new(log: Arc<dyn ActivityLog>, settings: SupervisorSettings) -> Self {
        Self::with_config(log, settings, SimulationConfig::default())
    }

    /// Create a stopped supervisor with an initial configuration.
    ///
    /// The configuration is not validated here; `start` validates it.
    #[must_use]
    pub fn with_config(
        log: Arc<dyn ActivityLog>,
        settings: SupervisorSettings,
        config: SimulationConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                log,
                settings,
                lifecycle: Mutex::new(Lifecycle {
                    config,
                    run: None,
                    generation: 0,
                }),
                pool: RwLock::new(None),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Timing parameters.
    #[must_use]
    pub fn settings(&self) -> SupervisorSettings {
        self.inner.settings
    }

    /// Replace the configuration used by the next run.
    ///
    /// Rates larger than the capacity are accepted but logged as a warning:
    /// workers with such a rate wait until they are stopped.
    ///
    /// # Errors
    ///
    /// - [`SupervisorError::AlreadyRunning`] while a run is active
    /// - [`SupervisorError::Validation`] if the configuration is invalid
    pub async fn configure(&self, config: SimulationConfig) -> Result<(), SupervisorError> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if lifecycle.run.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }
        config.validate()?;

        for field in config.unsatisfiable_rates() {
            self.inner.log.warn(&format!(
                "{field} exceeds max ticket capacity ({}). Workers using it will wait until stopped.",
                config.max_ticket_capacity
            ));
            tracing::warn!(field, capacity = config.max_ticket_capacity, "Rate can never be satisfied");
        }

        tracing::info!(
            total_tickets = config.total_tickets,
            capacity = config.max_ticket_capacity,
            "Configuration updated"
        );
        lifecycle.config = config;
        Ok(())
    }

    /// The stored configuration.
    pub async fn config(&self) -> SimulationConfig {
        self.inner.lifecycle.lock().await.config.clone()
    }

    /// Start a run.
    ///
    /// Clears the activity log, builds a fresh pool and spawns the configured
    /// vendors (`[Vendor-1]`, ...) and customers (`[Customer-1]`, ...) plus
    /// the depletion monitor.
    ///
    /// # Errors
    ///
    /// - [`SupervisorError::AlreadyRunning`] while a run is active
    /// - [`SupervisorError::Validation`] if the stored configuration is invalid
    pub async fn start(&self) -> Result<String, SupervisorError> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if lifecycle.run.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }
        let config = lifecycle.config.clone();
        config.validate()?;

        self.inner.log.clear();
        lifecycle.generation += 1;
        let generation = lifecycle.generation;

        let pool = Arc::new(TicketPool::new(
            config.total_tickets,
            config.max_ticket_capacity,
            Arc::clone(&self.inner.log),
        ));
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut run = Run {
            generation,
            pool: Arc::clone(&pool),
            stop_tx,
            workers: Vec::new(),
            monitor: None,
            quantity: config.quantity_policy.build(),
            refunds: RefundPolicy::with_probability(config.refund_probability),
            tick: self.inner.settings.tick_interval,
        };

        for i in 1..=config.vendor_count {
            let spec = WorkerSpec::producer(format!("[Vendor-{i}]"), config.ticket_release_rate);
            run.spawn_worker(spec, self.inner.log.as_ref());
        }
        for i in 1..=config.customer_count {
            let spec = WorkerSpec::consumer(format!("[Customer-{i}]"), config.customer_retrieval_rate);
            run.spawn_worker(spec, self.inner.log.as_ref());
        }

        run.monitor = Some(tokio::spawn(monitor(
            Arc::downgrade(&self.inner),
            generation,
            Arc::clone(&pool),
            stop_rx,
            self.inner.settings,
        )));

        self.inner.set_pool(Some(pool));
        self.inner.running.store(true, Ordering::Release);
        lifecycle.run = Some(run);

        tracing::info!(
            generation,
            vendors = config.vendor_count,
            customers = config.customer_count,
            "Run started"
        );
        metrics::counter!("supervisor.runs.started").increment(1);
        Ok(format!(
            "Ticket system started with {} initial tickets.",
            config.total_tickets
        ))
    }

    /// Stop the current run and return the end-of-simulation summary.
    ///
    /// Every worker is signalled, then joined; a worker that does not finish
    /// within the shutdown timeout is aborted. Calling `stop` while stopped
    /// returns the summary for the last pool and appends nothing.
    pub async fn stop(&self) -> String {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        self.inner
            .stop_locked(&mut lifecycle, StopOrigin::Caller)
            .await
    }

    /// Stop, then discard the pool, the workers and the activity log.
    pub async fn reset(&self) -> String {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        self.inner
            .stop_locked(&mut lifecycle, StopOrigin::Caller)
            .await;
        self.inner.set_pool(None);
        self.inner.log.clear();
        tracing::info!("Supervisor reset");
        "Ticket system reset.".to_string()
    }

    /// Add a vendor or customer to the running simulation.
    ///
    /// The worker uses the run's quantity and refund policies.
    ///
    /// # Errors
    ///
    /// - [`SupervisorError::NotStarted`] while stopped
    /// - [`SupervisorError::Validation`] for an empty name or a zero rate
    pub async fn add_worker(
        &self,
        role: WorkerRole,
        id: impl Into<WorkerId>,
        rate: u32,
    ) -> Result<(), SupervisorError> {
        let id = id.into();
        if id.as_str().trim().is_empty() {
            return Err(ConfigError::EmptyWorkerName.into());
        }
        if rate == 0 {
            return Err(ConfigError::ZeroRate { field: "rate" }.into());
        }

        let mut lifecycle = self.inner.lifecycle.lock().await;
        let run = lifecycle.run.as_mut().ok_or(SupervisorError::NotStarted)?;
        if u64::from(rate) > u64::from(run.pool.capacity()) {
            self.inner.log.warn(&format!(
                "{id} rate {rate} exceeds max ticket capacity ({}). It will wait until stopped.",
                run.pool.capacity()
            ));
        }
        run.spawn_worker(WorkerSpec::new(id, role, rate), self.inner.log.as_ref());
        Ok(())
    }

    /// Release tickets into the live pool without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotStarted`] while stopped.
    pub fn try_release(&self, quantity: u32, producer_id: &str) -> Result<TicketOutcome, SupervisorError> {
        Ok(self.inner.live_pool()?.try_add(quantity, producer_id))
    }

    /// Purchase tickets from the live pool without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotStarted`] while stopped.
    pub fn try_purchase(&self, quantity: u32, consumer_id: &str) -> Result<TicketOutcome, SupervisorError> {
        Ok(self.inner.live_pool()?.try_remove(quantity, consumer_id))
    }

    /// Hand cancelled tickets back to the live pool.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::NotStarted`] while stopped.
    pub fn admin_return(&self, quantity: u32, origin_id: &str) -> Result<TicketOutcome, SupervisorError> {
        Ok(self.inner.live_pool()?.admin_return(quantity, origin_id))
    }

    /// Tickets currently available; never waits on a lifecycle transition.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            current_available: self
                .inner
                .current_pool()
                .map_or(0, |pool| pool.current_available()),
        }
    }

    /// Counters of the current (or last) pool.
    #[must_use]
    pub fn statistics(&self) -> Option<PoolStats> {
        self.inner.current_pool().map(|pool| pool.stats())
    }

    /// Activity log entries, oldest first.
    #[must_use]
    pub fn logs(&self) -> Vec<String> {
        self.inner.log.entries()
    }

    /// Drop every activity log entry.
    pub fn clear_logs(&self) {
        self.inner.log.clear();
    }

    /// Whether a run is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }
}

/// End-of-simulation banner.
fn summary(remaining: u32, total: u32) -> String {
    format!(
        "{BANNER}\n                 Simulation ended.\n{BANNER}\nTotal Tickets Remaining: {remaining}/{total}\n"
    )
}

/// Stops a run once the pool has been empty for enough consecutive polls.
async fn monitor(
    supervisor: Weak<Inner>,
    generation: u64,
    pool: Arc<TicketPool>,
    mut stop: watch::Receiver<bool>,
    settings: SupervisorSettings,
) {
    let confirmations = settings.depletion_confirmations.max(1);
    let mut ticker = tokio::time::interval(settings.monitor_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut depleted = 0;
    while depleted < confirmations {
        tokio::select! {
            biased;
            () = wait_for_stop(&mut stop) => return,
            _ = ticker.tick() => {}
        }
        if pool.current_available() == 0 {
            depleted += 1;
            tracing::trace!(generation, depleted, confirmations, "Pool observed empty");
        } else {
            depleted = 0;
        }
    }
    drop(pool);

    let Some(inner) = supervisor.upgrade() else {
        return;
    };
    let mut lifecycle = inner.lifecycle.lock().await;
    if lifecycle.run.as_ref().is_some_and(|run| run.generation == generation) {
        inner.log.info("All tickets sold. Stopping simulation.");
        tracing::info!(generation, "Pool depleted, stopping run");
        inner.stop_locked(&mut lifecycle, StopOrigin::Monitor).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticket_pool_core::environment::SystemClock;
    use ticket_pool_core::MemoryLog;

    fn supervisor() -> PoolSupervisor {
        let log = Arc::new(MemoryLog::new(1_000, Arc::new(SystemClock)));
        let settings = SupervisorSettings::default()
            .with_tick_interval(Duration::from_millis(10))
            .with_monitor_interval(Duration::from_millis(10))
            .with_shutdown_timeout(Duration::from_secs(2));
        PoolSupervisor::new(log, settings)
    }

    #[test]
    fn test_summary_format() {
        let text = summary(3, 10);
        assert!(text.starts_with(BANNER));
        assert!(text.contains("Simulation ended."));
        assert!(text.ends_with("Total Tickets Remaining: 3/10\n"));
    }

    #[test]
    fn test_status_serializes_with_api_key() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(PoolStatus { current_available: 7 })?;
        assert_eq!(json, serde_json::json!({ "currentTicketsAvailable": 7 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_status_is_zero_without_pool() {
        let supervisor = supervisor();
        assert_eq!(supervisor.status().current_available, 0);
        assert!(supervisor.statistics().is_none());
        assert!(!supervisor.is_running());
    }

    #[tokio::test]
    async fn test_configure_rejected_while_running() {
        let supervisor = supervisor();
        let config = SimulationConfig::new(10, 1, 1, 20).with_workers(0, 0);
        assert_eq!(supervisor.configure(config).await, Ok(()));
        assert!(supervisor.start().await.is_ok());

        let result = supervisor.configure(SimulationConfig::default()).await;
        assert_eq!(result, Err(SupervisorError::AlreadyRunning));
        assert_eq!(supervisor.start().await, Err(SupervisorError::AlreadyRunning));

        supervisor.stop().await;
        assert!(!supervisor.is_running());
    }

    #[tokio::test]
    async fn test_live_operations_require_a_run() {
        let supervisor = supervisor();
        assert_eq!(
            supervisor.try_release(1, "[Admin]"),
            Err(SupervisorError::NotStarted)
        );
        assert_eq!(
            supervisor.add_worker(WorkerRole::Producer, "[Vendor-9]", 1).await,
            Err(SupervisorError::NotStarted)
        );
    }

    #[tokio::test]
    async fn test_stop_drains_all_workers_within_one_deadline() {
        let log: Arc<dyn ActivityLog> = Arc::new(MemoryLog::new(1_000, Arc::new(SystemClock)));
        let timeout = Duration::from_millis(200);
        let supervisor = PoolSupervisor::new(
            Arc::clone(&log),
            SupervisorSettings::default().with_shutdown_timeout(timeout),
        );

        // Tasks that ignore the stop signal stand in for stuck workers.
        let (stop_tx, _) = watch::channel(false);
        let workers = (1..=4)
            .map(|i| RunningWorker {
                id: WorkerId::new(format!("[Vendor-{i}]")),
                role: WorkerRole::Producer,
                handle: tokio::spawn(std::future::pending::<WorkerReport>()),
            })
            .collect();
        let run = Run {
            generation: 1,
            pool: Arc::new(TicketPool::new(1, 1, Arc::clone(&log))),
            stop_tx,
            workers,
            monitor: None,
            quantity: SimulationConfig::default().quantity_policy.build(),
            refunds: RefundPolicy::with_probability(0.0),
            tick: Duration::from_millis(10),
        };

        let mut lifecycle = supervisor.inner.lifecycle.lock().await;
        lifecycle.run = Some(run);
        let started = std::time::Instant::now();
        supervisor
            .inner
            .stop_locked(&mut lifecycle, StopOrigin::Caller)
            .await;
        let elapsed = started.elapsed();

        assert!(elapsed >= timeout);
        assert!(elapsed < timeout * 3, "drain took {elapsed:?}");
        let aborted = log
            .entries()
            .iter()
            .filter(|line| line.contains("was aborted"))
            .count();
        assert_eq!(aborted, 4);
    }

    #[tokio::test]
    async fn test_monitor_of_an_older_run_leaves_current_run_alone() -> Result<(), SupervisorError> {
        let supervisor = supervisor();
        supervisor
            .configure(SimulationConfig::new(5, 1, 1, 10).with_workers(0, 0))
            .await?;
        supervisor.start().await?;

        // An empty pool seen by a monitor that belongs to generation 0.
        let log: Arc<dyn ActivityLog> = Arc::new(MemoryLog::new(10, Arc::new(SystemClock)));
        let stale_pool = Arc::new(TicketPool::new(1, 1, log));
        assert!(stale_pool.try_remove(1, "[Customer-1]").is_applied());
        let (_stop_tx, stop_rx) = watch::channel(false);

        monitor(
            Arc::downgrade(&supervisor.inner),
            0,
            stale_pool,
            stop_rx,
            supervisor.settings(),
        )
        .await;

        assert!(supervisor.is_running());
        assert_eq!(supervisor.status().current_available, 5);
        assert!(
            !supervisor
                .logs()
                .iter()
                .any(|line| line.contains("All tickets sold."))
        );
        supervisor.stop().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_monitor_stops_its_own_run() -> Result<(), SupervisorError> {
        let supervisor = supervisor();
        supervisor
            .configure(SimulationConfig::new(1, 1, 1, 10).with_workers(0, 0))
            .await?;
        supervisor.start().await?;
        assert!(supervisor.try_purchase(1, "[Customer-1]")?.is_applied());

        let pool = supervisor.inner.current_pool().ok_or(SupervisorError::NotStarted)?;
        let (_stop_tx, stop_rx) = watch::channel(false);
        monitor(Arc::downgrade(&supervisor.inner), 1, pool, stop_rx, supervisor.settings()).await;

        assert!(!supervisor.is_running());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_worker_validates_before_state_check() {
        let supervisor = supervisor();
        assert!(matches!(
            supervisor.add_worker(WorkerRole::Consumer, "  ", 1).await,
            Err(SupervisorError::Validation(ConfigError::EmptyWorkerName))
        ));
        assert!(matches!(
            supervisor.add_worker(WorkerRole::Consumer, "[Customer-9]", 0).await,
            Err(SupervisorError::Validation(ConfigError::ZeroRate { .. }))
        ));
    }
}
