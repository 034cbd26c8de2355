//! Model slot lifecycle: load, unload, startup bootstrap.
//!
//! Transitions run one at a time under `AppState::transitions`. The slot's
//! write lock is taken only to take out or store a handle, so health and
//! stats keep answering while the backend loads or releases weights.

use tracing::{error, info, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Loads `model_id` into the slot, releasing any resident model first.
///
/// Release failures of the previous model are logged and ignored. On load
/// failure the slot is left empty and the caller only learns that loading
/// failed; the reason goes to the log.
pub async fn load(state: &AppState, model_id: &str) -> Result<(), AppError> {
    let _transition = state.transitions.lock().await;
    info!("Loading model: {}", model_id);

    // Waits for in-flight inferences on the previous handle.
    let previous = state.slot.write().await.model.take();

    if let Some(previous) = previous {
        let previous_id = previous.model_id().to_string();
        info!("Unloading previous model: {}", previous_id);
        if let Err(e) = previous.release().await {
            warn!("Could not release previous model {} (ignored): {}", previous_id, e);
        }
    }

    match state.loader.load(model_id, state.placement).await {
        Ok(model) => {
            let mut slot = state.slot.write().await;
            slot.model = Some(model);
            slot.model_id = model_id.to_string();
            info!("Model loaded successfully: {}", model_id);
            Ok(())
        }
        Err(e) => {
            error!("Error loading model {}: {}", model_id, e);
            Err(AppError::LoadFailed)
        }
    }
}

/// Releases the resident model and empties the slot.
pub async fn unload(state: &AppState) -> Result<(), AppError> {
    let _transition = state.transitions.lock().await;

    let Some(model) = state.slot.write().await.model.take() else {
        return Err(AppError::NothingLoaded);
    };

    let model_id = model.model_id().to_string();
    info!("Unloading model: {}", model_id);
    if let Err(e) = model.release().await {
        warn!("Backend failed to release {} (slot cleared anyway): {}", model_id, e);
    }

    Ok(())
}

/// Whether the slot is occupied, and by which model.
pub async fn status(state: &AppState) -> Option<String> {
    state.slot.read().await.loaded_id().map(str::to_string)
}

/// Implicit startup load. Failure is logged and leaves the server in the
/// no-model state; it never aborts startup.
pub async fn bootstrap(state: &AppState, model_id: &str) -> bool {
    info!("Loading model on startup: {}", model_id);
    match load(state, model_id).await {
        Ok(()) => true,
        Err(_) => {
            warn!("Failed to load model {} on startup", model_id);
            warn!("The server will start but a model must be loaded manually");
            false
        }
    }
}
