//! Shared fixtures: an in-process model backend, a scripted telemetry
//! probe, and request helpers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use lumen_config::ServerConfig;
use lumen_core::{DevicePlacement, InferenceRequest, LoadedModel, ModelError, ModelLoader};
use lumen_server::services::telemetry::{Device, SystemProbe};
use lumen_server::AppState;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

/// What the fake model saw during one inference call.
#[derive(Debug, Clone)]
pub struct SeenImage {
    pub path: PathBuf,
    pub existed: bool,
    pub bytes: Vec<u8>,
}

/// Shared log of backend activity.
#[derive(Debug, Default)]
pub struct Journal {
    pub events: Mutex<Vec<String>>,
    pub images: Mutex<Vec<SeenImage>>,
}

impl Journal {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn images(&self) -> Vec<SeenImage> {
        self.images.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

/// Loads anything except ids starting with `missing`. Ids starting with
/// `gated` wait for `gate` to be notified before finishing. Models whose id
/// starts with `sticky` fail to release; prompts containing `explode`
/// fail inference.
#[derive(Debug, Default)]
pub struct FakeLoader {
    pub journal: Arc<Journal>,
    pub gate: Arc<Notify>,
}

#[async_trait]
impl ModelLoader for FakeLoader {
    async fn load(
        &self,
        model_id: &str,
        placement: DevicePlacement,
    ) -> Result<Box<dyn LoadedModel>, ModelError> {
        self.journal.push(format!("load:{model_id}:{placement}"));
        if model_id.starts_with("gated") {
            self.gate.notified().await;
        }
        if model_id.starts_with("missing") {
            return Err(ModelError::load(model_id, "HTTP 404: model not found"));
        }
        Ok(Box::new(FakeModel {
            id: model_id.to_string(),
            journal: self.journal.clone(),
        }))
    }
}

struct FakeModel {
    id: String,
    journal: Arc<Journal>,
}

#[async_trait]
impl LoadedModel for FakeModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    async fn infer(&self, request: InferenceRequest<'_>) -> Result<Value, ModelError> {
        let existed = request.image.exists();
        let bytes = std::fs::read(request.image).unwrap_or_default();
        self.journal.images.lock().unwrap().push(SeenImage {
            path: request.image.to_path_buf(),
            existed,
            bytes,
        });
        self.journal.push(format!("infer:{}:{}", self.id, request.task));

        if request.text.contains("explode") {
            return Err(ModelError::InferenceFailed("CUDA out of memory".into()));
        }

        Ok(serde_json::json!({
            "answer": format!("{} says: {}", self.id, request.text),
            "temperature": request.params.temperature,
            "sampled": request.params.do_sample,
        }))
    }

    async fn release(self: Box<Self>) -> Result<(), ModelError> {
        self.journal.push(format!("release:{}", self.id));
        if self.id.starts_with("sticky") {
            return Err(ModelError::release(&self.id, "backend busy"));
        }
        Ok(())
    }
}

/// Telemetry probe with scripted answers.
#[derive(Debug, Clone)]
pub struct FakeProbe {
    pub memory: Option<u64>,
    pub device_fails: bool,
}

impl Default for FakeProbe {
    fn default() -> Self {
        Self {
            memory: Some(12 * 1024 * 1024),
            device_fails: false,
        }
    }
}

impl SystemProbe for FakeProbe {
    fn resident_memory_bytes(&self) -> Option<u64> {
        self.memory
    }

    fn device(&self) -> Result<Device, String> {
        if self.device_fails {
            return Err("driver query failed".into());
        }
        Ok(Device::Cpu)
    }
}

/// A test server: state, router, the backend journal and the upload dir.
pub struct Harness {
    pub state: Arc<AppState>,
    pub app: Router,
    pub journal: Arc<Journal>,
    pub gate: Arc<Notify>,
    pub upload_dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeProbe::default(), lumen_config::DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn with(probe: FakeProbe, max_upload_bytes: usize) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            default_model: "default-model".into(),
            upload_dir: upload_dir.path().to_path_buf(),
            max_upload_bytes,
            ..Default::default()
        };

        let loader = FakeLoader::default();
        let journal = loader.journal.clone();
        let gate = loader.gate.clone();
        let state = Arc::new(AppState::new(Arc::new(loader), &config).with_probe(Arc::new(probe)));

        Self {
            app: lumen_server::app(state.clone()),
            state,
            journal,
            gate,
            upload_dir,
        }
    }

    /// Sends a request and decodes the JSON body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn load(&self, model_id: &str) -> (StatusCode, Value) {
        self.post_json("/api/load-model", serde_json::json!({ "model_id": model_id }))
            .await
    }

    pub async fn unload(&self) -> (StatusCode, Value) {
        self.send(Request::post("/api/unload-model").body(Body::empty()).unwrap())
            .await
    }

    /// Files currently left in the upload directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        list_dir(self.upload_dir.path())
    }
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

pub const BOUNDARY: &str = "lumen-test-boundary";

/// Builds a multipart inference request from text fields and an optional
/// `(file name, contents)` image part.
pub fn inference_request(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    if let Some((file_name, contents)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/inference")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
