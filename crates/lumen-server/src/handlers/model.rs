//! Model management HTTP handlers (load/unload).

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::warn;

use crate::dto::{LoadModelRequest, LoadModelResponse, UnloadModelResponse};
use crate::error::AppError;
use crate::services;
use crate::services::telemetry::{device_label, memory_usage};
use crate::state::AppState;

/// Loads a model into the slot, replacing any resident model.
pub async fn load(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoadModelRequest>, JsonRejection>,
) -> Result<Json<LoadModelResponse>, AppError> {
    let req = payload.map(|Json(req)| req).map_err(|e| {
        warn!("Rejected load request: {}", e.body_text());
        AppError::Validation("Model ID is required".into())
    })?;

    let model_id = req
        .model_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Model ID is required".into()))?;

    services::model::load(&state, &model_id).await?;

    Ok(Json(LoadModelResponse {
        success: true,
        message: format!("Model {} loaded successfully", model_id),
        model_id,
        device: device_label(&state),
        memory_usage: memory_usage(&state),
    }))
}

/// Unloads the resident model.
pub async fn unload(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UnloadModelResponse>, AppError> {
    services::model::unload(&state).await?;

    Ok(Json(UnloadModelResponse {
        success: true,
        message: "Model unloaded successfully".into(),
        memory_usage: memory_usage(&state),
    }))
}
