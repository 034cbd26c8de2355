//! HTTP route handlers for the inference server.

pub mod inference;
pub mod model;
pub mod telemetry;
