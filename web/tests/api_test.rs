//! HTTP API integration tests
//!
//! Drives the full router (CORS and tracing layers included) through
//! `axum-test` against a supervisor with millisecond ticks and a temporary
//! configuration file.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use ticket_pool_core::SimulationConfig;
use ticket_pool_runtime::PoolSupervisor;
use ticket_pool_testing::{fast_settings, test_log, wait_until};
use ticket_pool_web::{AppState, ConfigStore, build_router};

// ============================================================================
// Test Fixtures
// ============================================================================

struct Harness {
    server: TestServer,
    supervisor: PoolSupervisor,
    store: ConfigStore,
    _dir: TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("config.json"));
    let supervisor = PoolSupervisor::new(test_log(), fast_settings());
    let state = AppState::new(supervisor.clone(), store.clone());
    let server = TestServer::new(build_router(state, "http://localhost:3000")).unwrap();

    Harness {
        server,
        supervisor,
        store,
        _dir: dir,
    }
}

fn quiet_config() -> Value {
    // Vendors and customers move one ticket each, so the pool never drains.
    json!({
        "totalTickets": 10,
        "ticketReleaseRate": 1,
        "customerRetrievalRate": 1,
        "maxTicketCapacity": 20,
        "vendorCount": 1,
        "customerCount": 1
    })
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_returns_ok() {
    let h = harness();
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn metrics_disabled_returns_404() {
    let h = harness();
    h.server.get("/metrics").await.assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn post_config_validates_stores_and_persists() {
    let h = harness();

    let response = h.server.post("/api/config").json(&quiet_config()).await;
    response.assert_status_ok();
    assert_eq!(response.text(), "Configuration received: 10 tickets.");

    let current: SimulationConfig = h.server.get("/api/config").await.json();
    assert_eq!(current.max_ticket_capacity, 20);
    assert_eq!(current.vendor_count, 1);

    let saved = h.store.load().await.unwrap();
    assert_eq!(saved, current);
}

#[tokio::test]
async fn post_config_accepts_the_four_core_fields() {
    let h = harness();
    let response = h
        .server
        .post("/api/config")
        .json(&json!({
            "totalTickets": 40,
            "ticketReleaseRate": 2,
            "customerRetrievalRate": 3,
            "maxTicketCapacity": 80
        }))
        .await;
    response.assert_status_ok();
    assert_eq!(
        h.supervisor.config().await,
        SimulationConfig::new(40, 2, 3, 80)
    );
}

#[tokio::test]
async fn invalid_config_is_unprocessable() {
    let h = harness();
    let response = h
        .server
        .post("/api/config")
        .json(&json!({
            "totalTickets": 50,
            "ticketReleaseRate": 1,
            "customerRetrievalRate": 1,
            "maxTicketCapacity": 10
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(h.supervisor.config().await, SimulationConfig::default());
    assert!(h.store.load().await.is_err(), "nothing persisted");
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_status_stop_reset() {
    let h = harness();
    h.server.post("/api/config").json(&quiet_config()).await.assert_status_ok();

    let response = h.server.post("/api/start").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "Ticket system started with 10 initial tickets.");

    let status: Value = h.server.get("/api/status").await.json();
    assert!(status["currentTicketsAvailable"].as_u64().is_some());

    h.server
        .post("/api/start")
        .await
        .assert_status(StatusCode::CONFLICT);
    h.server
        .post("/api/config")
        .json(&quiet_config())
        .await
        .assert_status(StatusCode::CONFLICT);

    let response = h.server.post("/api/stop").await;
    response.assert_status_ok();
    assert!(response.text().contains("Simulation ended."));
    assert!(!h.supervisor.is_running());
    assert!(h.store.load().await.is_ok(), "stop persists the configuration");

    let stats: Value = h.server.get("/api/statistics").await.json();
    assert_eq!(stats["capacity"], 20);
    assert!(stats["totalReleased"].as_u64().unwrap() >= 10);

    let response = h.server.post("/api/reset").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "Ticket system reset.");

    let status: Value = h.server.get("/api/status").await.json();
    assert_eq!(status, json!({ "currentTicketsAvailable": 0 }));
    h.server
        .get("/api/statistics")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stop_without_run_is_ok() {
    let h = harness();
    let response = h.server.post("/api/stop").await;
    response.assert_status_ok();
    assert!(response.text().contains("Total Tickets Remaining: 0/100"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn depleted_pool_stops_by_itself() {
    let h = harness();
    h.server
        .post("/api/config")
        .json(&json!({
            "totalTickets": 10,
            "ticketReleaseRate": 1,
            "customerRetrievalRate": 2,
            "maxTicketCapacity": 10,
            "vendorCount": 0,
            "customerCount": 1
        }))
        .await
        .assert_status_ok();
    h.server.post("/api/start").await.assert_status_ok();

    let stopped = wait_until(Duration::from_secs(3), || {
        let supervisor = h.supervisor.clone();
        async move { !supervisor.is_running() }
    })
    .await;
    assert!(stopped);

    let status: Value = h.server.get("/api/status").await.json();
    assert_eq!(status["currentTicketsAvailable"], 0);
}

// ============================================================================
// Runtime workers
// ============================================================================

#[tokio::test]
async fn adding_workers_requires_a_run() {
    let h = harness();
    let response = h
        .server
        .post("/api/vendors")
        .json(&json!({ "name": "[Vendor-9]", "rate": 2 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_STARTED");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn add_vendor_and_customer() {
    let h = harness();
    h.server.post("/api/config").json(&quiet_config()).await.assert_status_ok();
    h.server.post("/api/start").await.assert_status_ok();

    let response = h
        .server
        .post("/api/vendors")
        .json(&json!({ "name": "[Vendor-9]", "rate": 2 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.text(), "Vendor [Vendor-9] added with release rate 2.");

    h.server
        .post("/api/customers")
        .json(&json!({ "name": "[Customer-9]", "rate": 1 }))
        .await
        .assert_status(StatusCode::CREATED);

    h.server
        .post("/api/customers")
        .json(&json!({ "name": "", "rate": 1 }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    h.server.post("/api/stop").await.assert_status_ok();
    let logs: Vec<String> = h.server.get("/api/logs").await.json();
    assert!(logs.iter().any(|line| line.contains("[Vendor-9] has completed.")));
    assert!(logs.iter().any(|line| line.contains("[Customer-9] has completed.")));
}

// ============================================================================
// Logs and CORS
// ============================================================================

#[tokio::test]
async fn logs_can_be_read_and_cleared() {
    let h = harness();
    h.server.post("/api/config").json(&quiet_config()).await.assert_status_ok();
    h.server.post("/api/start").await.assert_status_ok();
    h.server.post("/api/stop").await.assert_status_ok();

    let logs: Vec<String> = h.server.get("/api/logs").await.json();
    assert!(logs.iter().any(|line| line.contains("Initialized TicketPool with 10 tickets")));

    let response = h.server.post("/api/clear-logs").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "Logs cleared.");

    let logs: Vec<String> = h.server.get("/api/logs").await.json();
    assert!(logs.is_empty());
}

#[tokio::test]
async fn cors_allows_the_frontend_origin() {
    let h = harness();
    let response = h
        .server
        .get("/api/status")
        .add_header(
            header::ORIGIN,
            HeaderValue::from_static("http://localhost:3000"),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        "http://localhost:3000"
    );
}
