//! Health check and metrics handlers

use axum::{extract::State, Json};
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub version: &'static str,
    pub checks: ReadyChecks,
}

#[derive(Serialize)]
pub struct ReadyChecks {
    /// Whether citation mode has a metadata source
    pub citation_source: bool,
}

/// Liveness check - always returns ok if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check
///
/// Collaborators are built before the listener binds, so a running gateway is
/// ready; the checks describe which ranking modes are fully backed.
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ready".to_string(),
        version: citerank_common::VERSION,
        checks: ReadyChecks {
            citation_source: state.pipeline.has_citation_source(),
        },
    })
}

/// Prometheus exposition
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
