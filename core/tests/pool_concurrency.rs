//! Integration tests for the ticket pool under concurrent producers and
//! consumers.
//!
//! These run on the multi-threaded runtime so pool mutations really race.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;
use ticket_pool_core::worker::wait_for_stop;
use ticket_pool_core::{ActivityLog, RandomQuantity, RefundPolicy, TicketPool, Worker, WorkerSpec};
use ticket_pool_testing::{assert_pool_invariants, test_log};
use tokio::sync::watch;

fn pool(initial: u32, capacity: u32) -> Arc<TicketPool> {
    Arc::new(TicketPool::new(initial, capacity, test_log() as Arc<dyn ActivityLog>))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_ticket_producers_never_oversell() {
    const PRODUCERS: u32 = 8;
    const CONSUMERS: u32 = 12;

    let pool = pool(0, PRODUCERS);
    let (stop_tx, _) = watch::channel(false);

    let producers: Vec<_> = (1..=PRODUCERS)
        .map(|i| {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.add(1, &format!("[Vendor-{i}]")).await })
        })
        .collect();

    let consumers: Vec<_> = (1..=CONSUMERS)
        .map(|i| {
            let pool = Arc::clone(&pool);
            let mut stop = stop_tx.subscribe();
            tokio::spawn(async move {
                let id = format!("[Customer-{i}]");
                tokio::select! {
                    biased;
                    () = wait_for_stop(&mut stop) => false,
                    _ = pool.remove(1, &id) => true,
                }
            })
        })
        .collect();

    for producer in producers {
        tokio::time::timeout(Duration::from_secs(5), producer)
            .await
            .expect("producer blocked")
            .expect("producer panicked");
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop_tx.send_replace(true);

    let mut purchased = 0;
    for consumer in consumers {
        if tokio::time::timeout(Duration::from_secs(5), consumer)
            .await
            .expect("consumer ignored stop")
            .expect("consumer panicked")
        {
            purchased += 1;
        }
    }

    let stats = pool.stats();
    assert_eq!(stats.total_released, u64::from(PRODUCERS));
    assert!(stats.total_sold <= u64::from(PRODUCERS.min(CONSUMERS)));
    assert_eq!(stats.total_sold, purchased);
    assert_pool_invariants(&stats);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_workers_keep_invariants() {
    let pool = pool(20, 40);
    let (stop_tx, stop_rx) = watch::channel(false);
    let tick = Duration::from_millis(1);

    let mut handles = Vec::new();
    for i in 1..=3 {
        let spec = WorkerSpec::producer(format!("[Vendor-{i}]"), 5);
        handles.push(
            Worker::new(spec, Arc::clone(&pool), stop_rx.clone())
                .with_quantity_policy(Arc::new(RandomQuantity))
                .with_tick(tick)
                .spawn(),
        );
    }
    for i in 1..=5 {
        let spec = WorkerSpec::consumer(format!("[Customer-{i}]"), 4);
        handles.push(
            Worker::new(spec, Arc::clone(&pool), stop_rx.clone())
                .with_quantity_policy(Arc::new(RandomQuantity))
                .with_refund_policy(RefundPolicy::with_probability(0.3))
                .with_tick(tick)
                .spawn(),
        );
    }

    for _ in 0..40 {
        assert_pool_invariants(&pool.stats());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    stop_tx.send_replace(true);
    let mut moved_by_consumers = 0;
    let mut canceled = 0;
    for handle in handles {
        let report = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker ignored stop")
            .expect("worker panicked");
        if report.role == ticket_pool_core::WorkerRole::Consumer {
            moved_by_consumers += report.tickets_moved;
            canceled += report.canceled_tickets;
        }
    }

    let stats = pool.stats();
    assert_pool_invariants(&stats);
    assert_eq!(stats.total_sold, moved_by_consumers);
    assert_eq!(stats.total_admin_returned, canceled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_releases_every_blocked_worker() {
    // Full pool: producers block. No tickets can satisfy rate 50: consumers block.
    let pool = pool(10, 10);
    let (stop_tx, stop_rx) = watch::channel(false);

    let handles: Vec<_> = (1..=4)
        .map(|i| {
            let spec = if i % 2 == 0 {
                WorkerSpec::producer(format!("[Vendor-{i}]"), 1)
            } else {
                WorkerSpec::consumer(format!("[Customer-{i}]"), 50)
            };
            Worker::new(spec, Arc::clone(&pool), stop_rx.clone()).spawn()
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let stats = pool.stats();
    assert!(stats.producer_wait_count >= 2);
    assert!(stats.consumer_wait_count >= 2);

    stop_tx.send_replace(true);
    for handle in handles {
        let report = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("blocked worker ignored stop")
            .expect("worker panicked");
        assert_eq!(report.operations, 0);
    }
    assert_eq!(pool.current_available(), 10);
}
