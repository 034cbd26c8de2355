//! Inference request validation and execution.

use std::io::Write;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use lumen_core::{InferenceRequest, SamplingParams, DEFAULT_TASK, DEFAULT_TEMPERATURE};
use tempfile::NamedTempFile;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Image extensions accepted for upload, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];

/// An uploaded file as received from the form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Raw inference form fields, before validation.
#[derive(Debug, Clone, Default)]
pub struct InferenceForm {
    pub prompt: Option<String>,
    pub task: Option<String>,
    pub temperature: Option<String>,
    pub image: Option<UploadedImage>,
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct ValidInference {
    pub prompt: String,
    pub task: String,
    pub temperature: f32,
    pub image: Bytes,
    /// Lowercased extension of the uploaded file.
    pub extension: &'static str,
}

/// Returns the allow-listed extension of `file_name`, if any.
pub fn allowed_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().copied().find(|allowed| *allowed == ext)
}

/// Checks form fields in order: prompt, temperature, image presence,
/// file name, extension.
pub fn validate(form: InferenceForm) -> Result<ValidInference, AppError> {
    let prompt = form.prompt.as_deref().unwrap_or("").trim().to_string();
    if prompt.is_empty() {
        return Err(AppError::Validation("Please enter a prompt.".into()));
    }

    let task = form
        .task
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TASK.to_string());

    let temperature = parse_temperature(form.temperature.as_deref())?;

    let Some(image) = form.image else {
        return Err(AppError::Validation("Please upload an image.".into()));
    };

    if image.file_name.trim().is_empty() {
        return Err(AppError::Validation("Please select a file.".into()));
    }

    let Some(extension) = allowed_extension(&image.file_name) else {
        return Err(AppError::Validation(
            "Please upload a valid image file (JPG, PNG, BMP, GIF).".into(),
        ));
    };

    Ok(ValidInference {
        prompt,
        task,
        temperature,
        image: image.bytes,
        extension,
    })
}

fn parse_temperature(raw: Option<&str>) -> Result<f32, AppError> {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Ok(DEFAULT_TEMPERATURE);
    }

    match raw.parse::<f32>() {
        Ok(t) if t.is_finite() && t >= 0.0 => Ok(t),
        _ => Err(AppError::Validation(format!(
            "Temperature must be a non-negative number, got '{}'.",
            raw
        ))),
    }
}

/// Runs a validated request against the resident model.
///
/// The upload is staged to a uniquely named file that is removed on every
/// exit path once the model call returns.
pub async fn run(state: &AppState, request: ValidInference) -> Result<serde_json::Value, AppError> {
    let request_id = Uuid::new_v4();
    let slot = state.slot.read().await;
    let Some(model) = slot.model.as_ref() else {
        warn!(%request_id, "Inference rejected: no model loaded");
        return Err(AppError::ModelUnavailable);
    };

    info!(
        %request_id,
        model = %model.model_id(),
        task = %request.task,
        "Inference request: {}...",
        request.prompt.get(..50).unwrap_or(&request.prompt)
    );

    let staged = stage_upload(state.upload_dir.clone(), request.extension, request.image).await?;

    let outcome = model
        .infer(InferenceRequest {
            text: &request.prompt,
            image: staged.path(),
            task: &request.task,
            params: SamplingParams::sampled(request.temperature),
        })
        .await;

    discard(staged);

    outcome.map_err(|e| {
        error!(%request_id, error = ?e, "Error during inference");
        AppError::InferenceFailure(format!("Error during inference: {}", e))
    })
}

/// Writes the upload to a fresh temp file in `dir`.
async fn stage_upload(dir: PathBuf, extension: &'static str, bytes: Bytes) -> Result<NamedTempFile, AppError> {
    tokio::task::spawn_blocking(move || write_temp(&dir, extension, &bytes))
        .await
        .map_err(|e| AppError::Internal(format!("upload staging task failed: {}", e)))?
        .map_err(|e| {
            error!("Failed to stage upload: {}", e);
            AppError::Internal("failed to store uploaded image".into())
        })
}

fn write_temp(dir: &Path, extension: &str, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix("lumen-upload-")
        .suffix(&format!(".{}", extension))
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

fn discard(staged: NamedTempFile) {
    let path = staged.path().to_path_buf();
    if let Err(e) = staged.close() {
        warn!("Failed to remove staged upload {}: {}", path.display(), e);
    }
}
