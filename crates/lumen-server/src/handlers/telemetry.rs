//! Health and stats endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::dto::{HealthResponse, StatsResponse};
use crate::services::telemetry;
use crate::state::AppState;

/// Reports whether a model is loaded.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(telemetry::health(&state).await)
}

/// Reports memory, device and slot state. A failed probe answers 500 with
/// `success: false` and whatever slot state could still be read.
pub async fn stats(State(state): State<Arc<AppState>>) -> (StatusCode, Json<StatsResponse>) {
    match telemetry::stats(&state).await {
        Ok(stats) => (StatusCode::OK, Json(stats)),
        Err(degraded) => (StatusCode::INTERNAL_SERVER_ERROR, Json(degraded)),
    }
}
