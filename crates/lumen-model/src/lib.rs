//! Model backends for lumen.
//!
//! Backends implement [`lumen_core::ModelLoader`] and hand out
//! [`lumen_core::LoadedModel`] handles:
//!
//! - [`OllamaLoader`] — Vision models served by an Ollama instance
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use std::time::Duration;
//! use lumen_core::{DevicePlacement, InferenceRequest, ModelLoader, SamplingParams};
//! use lumen_model::OllamaLoader;
//!
//! let loader = OllamaLoader::new("http://localhost:11434", Duration::from_secs(600))?;
//! let model = loader.load("qwen2.5vl:7b", DevicePlacement::Auto).await?;
//!
//! let result = model
//!     .infer(InferenceRequest {
//!         text: "What is on the table?",
//!         image: Path::new("scene.jpg"),
//!         task: "general",
//!         params: SamplingParams::sampled(0.7),
//!     })
//!     .await?;
//!
//! model.release().await?;
//! ```

mod ollama;

pub use ollama::{OllamaLoader, OllamaMetrics, OllamaModel};
