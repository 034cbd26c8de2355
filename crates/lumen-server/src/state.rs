//! Shared server state and the model slot.

use std::path::PathBuf;
use std::sync::Arc;

use lumen_config::ServerConfig;
use lumen_core::{DevicePlacement, LoadedModel, ModelLoader};
use tokio::sync::{Mutex, RwLock};

use crate::services::telemetry::{HostProbe, SystemProbe};

/// The single process-wide model slot.
///
/// `model_id` keeps the id of the last model loaded successfully (or the
/// configured default before any load), even after the slot is emptied.
pub struct ModelSlot {
    pub model: Option<Box<dyn LoadedModel>>,
    pub model_id: String,
}

impl ModelSlot {
    /// An empty slot remembering `model_id` as the current id.
    pub fn empty(model_id: impl Into<String>) -> Self {
        Self {
            model: None,
            model_id: model_id.into(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Id of the resident model, if any.
    pub fn loaded_id(&self) -> Option<&str> {
        self.model.as_ref().map(|_| self.model_id.as_str())
    }
}

/// Shared server state accessible from all handlers.
///
/// `transitions` serializes load and unload. The slot's write lock is only
/// held to swap the handle in or out; inference holds the read lock while
/// the model runs.
pub struct AppState {
    pub slot: RwLock<ModelSlot>,
    pub transitions: Mutex<()>,
    pub loader: Arc<dyn ModelLoader>,
    pub probe: Arc<dyn SystemProbe>,
    pub placement: DevicePlacement,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Creates state with an empty slot. Nothing is loaded until
    /// [`crate::services::model::bootstrap`] or a load request runs.
    pub fn new(loader: Arc<dyn ModelLoader>, config: &ServerConfig) -> Self {
        Self {
            slot: RwLock::new(ModelSlot::empty(&config.default_model)),
            transitions: Mutex::new(()),
            loader,
            probe: Arc::new(HostProbe),
            placement: config.device_placement,
            upload_dir: config.upload_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Replaces the host telemetry probe.
    pub fn with_probe(mut self, probe: Arc<dyn SystemProbe>) -> Self {
        self.probe = probe;
        self
    }
}
