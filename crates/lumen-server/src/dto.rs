//! Data transfer objects for HTTP message serialization.

use serde::{Deserialize, Serialize};

// === Model Management Types ===

/// Request to load a model into the slot.
#[derive(Debug, Deserialize)]
pub struct LoadModelRequest {
    #[serde(default)]
    pub model_id: Option<String>,
}

/// Response from a successful load.
#[derive(Debug, Serialize)]
pub struct LoadModelResponse {
    pub success: bool,
    pub message: String,
    pub model_id: String,
    pub device: String,
    pub memory_usage: String,
}

/// Response from a successful unload.
#[derive(Debug, Serialize)]
pub struct UnloadModelResponse {
    pub success: bool,
    pub message: String,
    pub memory_usage: String,
}

// === Inference Types ===

/// Response from a successful inference call.
#[derive(Debug, Serialize)]
pub struct InferenceResponse {
    pub success: bool,
    /// Model output, passed through unchanged.
    pub result: serde_json::Value,
    pub task: String,
}

// === Telemetry Types ===

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"ready"` when a model is loaded, `"loading"` otherwise.
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_id: String,
}

/// Stats payload, also sent (with `success: false`) on probe failure.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub model_loaded: bool,
    pub model_id: String,
    pub memory_usage: String,
    pub device: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
