//! Multipart inference endpoint.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use tracing::warn;

use crate::dto::InferenceResponse;
use crate::error::AppError;
use crate::services::inference::{self, InferenceForm, UploadedImage};
use crate::state::AppState;

/// Runs one prompt + image inference against the resident model.
pub async fn inference(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<InferenceResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| {
        warn!("Rejected inference request: {}", e.body_text());
        AppError::Validation(format!("Invalid form data: {}", e.body_text()))
    })?;

    let form = read_form(&mut multipart).await?;
    let request = inference::validate(form)?;
    let task = request.task.clone();

    let result = inference::run(&state, request).await?;

    Ok(Json(InferenceResponse {
        success: true,
        result,
        task,
    }))
}

/// Collects the known form fields; unknown fields are skipped.
async fn read_form(multipart: &mut Multipart) -> Result<InferenceForm, AppError> {
    let mut form = InferenceForm::default();

    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" => form.prompt = Some(field.text().await.map_err(field_error)?),
            "task" => form.task = Some(field.text().await.map_err(field_error)?),
            "temperature" => form.temperature = Some(field.text().await.map_err(field_error)?),
            // A part without a filename is a plain field, not an upload.
            "image" => match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(field_error)?;
                    form.image = Some(UploadedImage { file_name, bytes });
                }
                None => {
                    field.bytes().await.map_err(field_error)?;
                }
            },
            _ => {}
        }
    }

    Ok(form)
}

fn field_error(e: MultipartError) -> AppError {
    warn!("Multipart read failed: {}", e.body_text());
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge(e.body_text());
    }
    AppError::Validation(format!("Invalid form data: {}", e.body_text()))
}
