//! Core domain types and error definitions for lumen.
//!
//! This crate provides the types shared between the model backend and the
//! HTTP server:
//!
//! - [`ModelError`] — Error type for load, inference and release operations
//! - [`ModelLoader`] and [`LoadedModel`] — The seam to an external model
//! - [`InferenceRequest`] and [`SamplingParams`] — One text + image call
//! - [`DevicePlacement`] — Where the backend should put the weights
//! - [`task`] — Task labels and their prompt templates
//!
//! # Example
//!
//! ```rust
//! use lumen_core::{DevicePlacement, SamplingParams};
//!
//! let placement: DevicePlacement = "auto".parse().unwrap();
//! assert_eq!(placement, DevicePlacement::Auto);
//!
//! let params = SamplingParams::sampled(0.7);
//! assert!(params.do_sample);
//! ```

pub mod task;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default task label when a request does not name one.
pub const DEFAULT_TASK: &str = "general";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Errors raised by a model backend.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The backend refused or failed to load the weights.
    #[error("Failed to load model '{model_id}': {reason}")]
    LoadFailed { model_id: String, reason: String },

    /// The backend accepted the request but inference failed.
    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    /// Releasing a loaded model failed.
    #[error("Failed to release model '{model_id}': {reason}")]
    ReleaseFailed { model_id: String, reason: String },

    /// Transport-level failure talking to the backend.
    #[error("Backend request failed: {0}")]
    Backend(String),

    /// The staged image could not be read.
    #[error("Failed to read image '{path}': {source}")]
    ImageRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ModelError {
    /// Creates a load error with model context.
    pub fn load(model_id: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::LoadFailed {
            model_id: model_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a release error with model context.
    pub fn release(model_id: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ReleaseFailed {
            model_id: model_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an image read error with path context.
    pub fn image_read(path: &Path, source: std::io::Error) -> Self {
        Self::ImageRead {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Device placement policy handed to the loader.
///
/// | Policy | Behavior |
/// |--------|----------|
/// | `Auto` | Backend decides how many layers go to an accelerator |
/// | `Cpu` | Keep every layer on the CPU |
/// | `Gpu` | Offload every layer to the accelerator |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePlacement {
    #[default]
    Auto,
    Cpu,
    Gpu,
}

impl FromStr for DevicePlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "gpu" | "cuda" => Ok(Self::Gpu),
            other => Err(format!("unknown device placement '{other}' (expected auto, cpu or gpu)")),
        }
    }
}

impl fmt::Display for DevicePlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        };
        write!(f, "{}", s)
    }
}

/// Sampling parameters for one inference call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Whether to sample at all; `false` means greedy decoding.
    pub do_sample: bool,
    /// Sampling temperature, ignored when `do_sample` is false.
    pub temperature: f32,
}

impl SamplingParams {
    /// Sampling enabled at the given temperature.
    pub fn sampled(temperature: f32) -> Self {
        Self { do_sample: true, temperature }
    }

    /// Temperature the backend should actually use; zero when a caller
    /// turns sampling off.
    pub fn effective_temperature(&self) -> f32 {
        if self.do_sample {
            self.temperature
        } else {
            0.0
        }
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self::sampled(DEFAULT_TEMPERATURE)
    }
}

/// One text + image inference call.
#[derive(Debug, Clone, Copy)]
pub struct InferenceRequest<'a> {
    /// The user prompt, already trimmed.
    pub text: &'a str,
    /// Path to the staged image file.
    pub image: &'a Path,
    /// Free-form task label.
    pub task: &'a str,
    pub params: SamplingParams,
}

/// Loads models by id. Implemented by each backend.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Loads `model_id` with the given placement policy.
    async fn load(
        &self,
        model_id: &str,
        placement: DevicePlacement,
    ) -> Result<Box<dyn LoadedModel>, ModelError>;
}

/// A model resident in the backend, ready for inference.
///
/// Dropping a handle without calling [`LoadedModel::release`] leaves the
/// backend to evict the weights on its own schedule.
#[async_trait]
pub trait LoadedModel: Send + Sync {
    /// The id this handle was loaded with.
    fn model_id(&self) -> &str;

    /// Runs one inference call. The result is passed through to callers unchanged.
    async fn infer(&self, request: InferenceRequest<'_>) -> Result<serde_json::Value, ModelError>;

    /// Frees backend resources held by this handle.
    async fn release(self: Box<Self>) -> Result<(), ModelError>;
}
