use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{json, Map, Value};
use service_core::timestamp;

/// Static catalog of the configured models.
pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    let models: Map<String, Value> = state
        .orchestrator
        .catalog()
        .iter()
        .map(|model| {
            (
                model.key.clone(),
                json!({
                    "name": model.display_name,
                    "description": model.description,
                    "capabilities": model.capabilities,
                }),
            )
        })
        .collect();

    Json(json!({
        "status": "success",
        "models": models,
        "available": state.orchestrator.is_initialized(),
        "timestamp": timestamp(),
    }))
}
