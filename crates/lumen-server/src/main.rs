//! HTTP server entry point.
//!
//! Reads configuration from the environment, attempts one implicit load of
//! the default model, then serves the router until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use lumen_config::ServerConfig;
use lumen_model::OllamaLoader;
use lumen_server::{services, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    let config = ServerConfig::from_env()?;
    std::fs::create_dir_all(&config.upload_dir)
        .with_context(|| format!("creating upload dir {}", config.upload_dir.display()))?;

    let loader = OllamaLoader::new(&config.backend_url, config.backend_timeout)?;
    info!("Model backend: {} (placement: {})", loader.api_base(), config.device_placement);

    let state = Arc::new(AppState::new(Arc::new(loader), &config));

    if config.skip_startup_load {
        info!("Startup load skipped; no model loaded");
    } else if services::model::bootstrap(&state, &config.default_model).await {
        info!("Model loaded on startup: {}", config.default_model);
    }

    let app = lumen_server::app(state);

    let addr = config.bind_addr();
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
