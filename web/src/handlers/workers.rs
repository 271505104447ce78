//! Runtime vendor and customer endpoints.

use crate::WebResult;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use ticket_pool_core::WorkerRole;

/// Body of `POST /api/vendors` and `POST /api/customers`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddWorkerRequest {
    /// Worker name used in log lines, e.g. `[Vendor-3]`
    pub name: String,
    /// Tickets per tick
    pub rate: u32,
}

async fn add(state: &AppState, role: WorkerRole, request: AddWorkerRequest) -> WebResult<(StatusCode, String)> {
    let AddWorkerRequest { name, rate } = request;
    state.supervisor.add_worker(role, name.as_str(), rate).await?;
    tracing::info!(worker = %name, %role, rate, "Worker added");

    let message = match role {
        WorkerRole::Producer => format!("Vendor {name} added with release rate {rate}."),
        WorkerRole::Consumer => format!("Customer {name} added with retrieval rate {rate}."),
    };
    Ok((StatusCode::CREATED, message))
}

/// Add a vendor to the running simulation.
///
/// ```text
/// POST /api/vendors
/// {"name": "[Vendor-3]", "rate": 2}
/// ```
///
/// # Errors
///
/// - 409 if no simulation is running
/// - 422 for an empty name or a zero rate
pub async fn add_vendor(
    State(state): State<AppState>,
    Json(request): Json<AddWorkerRequest>,
) -> WebResult<(StatusCode, String)> {
    add(&state, WorkerRole::Producer, request).await
}

/// Add a customer to the running simulation.
///
/// ```text
/// POST /api/customers
/// {"name": "[Customer-6]", "rate": 1}
/// ```
///
/// # Errors
///
/// - 409 if no simulation is running
/// - 422 for an empty name or a zero rate
pub async fn add_customer(
    State(state): State<AppState>,
    Json(request): Json<AddWorkerRequest>,
) -> WebResult<(StatusCode, String)> {
    add(&state, WorkerRole::Consumer, request).await
}
