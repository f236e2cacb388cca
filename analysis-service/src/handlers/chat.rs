use crate::models::ChatRequest;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use service_core::error::AppError;

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let message = match payload {
        Ok(Json(ChatRequest { message: Some(message) })) => message,
        Ok(_) => return Err(no_message()),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(AppError::PayloadTooLarge(
                state.config.limits.max_upload_megabytes(),
            ));
        }
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Unreadable chat body");
            return Err(no_message());
        }
    };

    tracing::info!(
        message = %message.chars().take(50).collect::<String>(),
        "Received chat request"
    );

    let outcome = state.orchestrator.chat(&message).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "response": outcome.response,
            "timestamp": outcome.timestamp,
        })),
    ))
}

fn no_message() -> AppError {
    AppError::Validation("No message provided".to_string())
}
