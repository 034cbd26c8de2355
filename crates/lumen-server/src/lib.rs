//! HTTP server exposing a single multimodal model slot.
//!
//! | Method/Path | Handler |
//! |-------------|---------|
//! | `GET /` | [`lumen_ui`] page |
//! | `POST /api/inference` | [`handlers::inference::inference`] |
//! | `GET /api/health` | [`handlers::telemetry::health`] |
//! | `GET /api/stats` | [`handlers::telemetry::stats`] |
//! | `POST /api/load-model` | [`handlers::model::load`] |
//! | `POST /api/unload-model` | [`handlers::model::unload`] |

pub mod dto;
pub mod error;
pub mod handlers;
pub mod services;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use state::{AppState, ModelSlot};

/// Builds the application router.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route("/api/inference", post(handlers::inference::inference))
        .route("/api/stats", get(handlers::telemetry::stats))
        .route("/api/load-model", post(handlers::model::load))
        .route("/api/unload-model", post(handlers::model::unload))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(trace_layer);

    Router::new()
        .merge(logged_routes)
        .route("/api/health", get(handlers::telemetry::health))
        .merge(lumen_ui::routes())
        .layer(cors)
        .with_state(state)
}
