//! Business logic behind the HTTP handlers.

pub mod inference;
pub mod model;
pub mod telemetry;
