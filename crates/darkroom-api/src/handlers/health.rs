use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Version ledger reachability.
    pub ledger: &'static str,
}

/// Liveness/readiness probe, including downstream ledger reachability.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ledger = match state.ledger.health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Ledger health check failed");
            "unreachable"
        }
    };

    Json(HealthResponse {
        status: "ok",
        ledger,
    })
}
