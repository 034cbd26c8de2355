//! Ollama vision backend.
//!
//! Uses Ollama's native `/api/generate` endpoint for all three lifecycle
//! steps: an empty-prompt request loads the weights, a prompt with base64
//! images runs inference, and `keep_alive: 0` evicts the model.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use lumen_core::{DevicePlacement, InferenceRequest, LoadedModel, ModelError, ModelLoader};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// How long Ollama keeps a loaded model resident between requests.
/// Negative means until explicitly unloaded.
const KEEP_RESIDENT: i64 = -1;

/// Performance metrics reported by Ollama on a completed generation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaMetrics {
    #[serde(default)]
    pub total_duration: u64,
    #[serde(default)]
    pub load_duration: u64,
    #[serde(default)]
    pub prompt_eval_count: u32,
    #[serde(default)]
    pub eval_count: u32,
    #[serde(default)]
    pub eval_duration: u64,
}

impl OllamaMetrics {
    /// Calculates tokens generated per second.
    pub fn tokens_per_sec(&self) -> f64 {
        if self.eval_duration == 0 {
            return 0.0;
        }
        (self.eval_count as f64) / (self.eval_duration as f64 / 1_000_000_000.0)
    }

    /// Total request duration in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration / 1_000_000
    }

    /// Model load time in milliseconds.
    pub fn load_duration_ms(&self) -> u64 {
        self.load_duration / 1_000_000
    }
}

#[derive(Debug, Default, Serialize, PartialEq)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_gpu: Option<i32>,
}

impl GenerateOptions {
    fn for_placement(placement: DevicePlacement) -> Self {
        let num_gpu = match placement {
            DevicePlacement::Auto => None,
            DevicePlacement::Cpu => Some(0),
            DevicePlacement::Gpu => Some(-1),
        };
        Self { temperature: None, num_gpu }
    }

    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.num_gpu.is_none()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    stream: bool,
    keep_alive: i64,
    #[serde(skip_serializing_if = "GenerateOptions::is_empty")]
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(flatten)]
    metrics: OllamaMetrics,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Loads vision models into an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaLoader {
    client: Client,
    api_base: String,
}

impl OllamaLoader {
    /// Creates a loader for the Ollama server at `api_base`.
    ///
    /// `timeout` bounds every request, including inference.
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL this loader talks to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

#[async_trait]
impl ModelLoader for OllamaLoader {
    async fn load(
        &self,
        model_id: &str,
        placement: DevicePlacement,
    ) -> Result<Box<dyn LoadedModel>, ModelError> {
        info!("Loading model {} via {} (placement: {})", model_id, self.api_base, placement);

        let request = GenerateRequest {
            model: model_id,
            prompt: "",
            images: Vec::new(),
            stream: false,
            keep_alive: KEEP_RESIDENT,
            options: GenerateOptions::for_placement(placement),
        };

        let resp = post_generate(&self.client, &self.api_base, &request)
            .await
            .map_err(|e| ModelError::load(model_id, e))?;

        info!("Model {} resident after {}ms", model_id, resp.metrics.load_duration_ms());

        Ok(Box::new(OllamaModel {
            client: self.client.clone(),
            api_base: self.api_base.clone(),
            model_id: model_id.to_string(),
            placement,
        }))
    }
}

/// A model resident in an Ollama server.
#[derive(Debug)]
pub struct OllamaModel {
    client: Client,
    api_base: String,
    model_id: String,
    placement: DevicePlacement,
}

#[async_trait]
impl LoadedModel for OllamaModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn infer(&self, request: InferenceRequest<'_>) -> Result<serde_json::Value, ModelError> {
        let image = encode_image(request.image).await?;
        let prompt = lumen_core::task::Task::from_label(request.task).render_prompt(request.text);

        let mut options = GenerateOptions::for_placement(self.placement);
        options.temperature = Some(request.params.effective_temperature());

        let body = GenerateRequest {
            model: &self.model_id,
            prompt: &prompt,
            images: vec![image],
            stream: false,
            keep_alive: KEEP_RESIDENT,
            options,
        };

        let resp = post_generate(&self.client, &self.api_base, &body)
            .await
            .map_err(ModelError::InferenceFailed)?;

        info!(
            "Ollama: {}ms total, {:.1} tok/s, {} eval tokens",
            resp.metrics.total_duration_ms(),
            resp.metrics.tokens_per_sec(),
            resp.metrics.eval_count
        );

        Ok(serde_json::Value::String(resp.response))
    }

    async fn release(self: Box<Self>) -> Result<(), ModelError> {
        let body = GenerateRequest {
            model: &self.model_id,
            prompt: "",
            images: Vec::new(),
            stream: false,
            keep_alive: 0,
            options: GenerateOptions::default(),
        };

        post_generate(&self.client, &self.api_base, &body)
            .await
            .map_err(|e| ModelError::release(&self.model_id, e))?;

        info!("Unloaded model: {}", self.model_id);
        Ok(())
    }
}

/// Sends a non-streaming generate request, mapping failures to a message.
async fn post_generate(
    client: &Client,
    api_base: &str,
    body: &GenerateRequest<'_>,
) -> Result<GenerateResponse, String> {
    let url = format!("{}/api/generate", api_base);

    let response = client
        .post(&url)
        .json(body)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = error_message(status, &text);
        warn!("Ollama returned {}: {}", status, message);
        return Err(message);
    }

    response.json().await.map_err(|e| format!("Failed to parse Ollama response: {}", e))
}

/// Extracts Ollama's `{"error": ...}` message, falling back to the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string());

    if detail.is_empty() {
        return format!("HTTP {}", status.as_u16());
    }
    format!("HTTP {}: {}", status.as_u16(), detail)
}

/// Reads an image from disk as base64.
async fn encode_image(path: &Path) -> Result<String, ModelError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ModelError::image_read(path, e))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}
