//! Application error types and Axum response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Request-level errors with HTTP status code mapping.
#[derive(Debug)]
pub enum AppError {
    /// Bad client input (empty prompt, bad image, missing model id).
    Validation(String),
    /// Upload exceeded the configured body limit.
    PayloadTooLarge(String),
    /// Unload requested while the slot is empty.
    NothingLoaded,
    /// Inference requested while the slot is empty.
    ModelUnavailable,
    /// The backend could not load the requested model.
    LoadFailed,
    /// The model raised an error during inference.
    InferenceFailure(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::NothingLoaded => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ModelUnavailable
            | AppError::LoadFailed
            | AppError::InferenceFailure(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the client.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::InferenceFailure(msg)
            | AppError::Internal(msg) => msg.clone(),
            AppError::NothingLoaded => "No model is currently loaded".into(),
            AppError::ModelUnavailable => "Model not loaded. Please load a model first.".into(),
            AppError::LoadFailed => "Failed to load model".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse { error: self.message() })).into_response()
    }
}
