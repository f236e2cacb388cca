use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Message returned to callers for any fault that is not otherwise classified.
pub const GENERIC_INTERNAL_ERROR: &str = "Internal server error occurred.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("{0}")]
    NotInitialized(String),

    #[error("{0}")]
    ModelInvocation(String),

    #[error("File too large. Maximum size is {0}MB.")]
    PayloadTooLarge(usize),

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

/// Wire shape shared by every user-visible failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub error: String,
    pub timestamp: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            status: "error",
            error: error.into(),
            timestamp: crate::timestamp(),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::ImageProcessing(_)
            | AppError::NotInitialized(_)
            | AppError::ModelInvocation(_)
            | AppError::InternalError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Unhandled internal error");
            }
            AppError::ConfigError(err) => {
                tracing::error!(error = ?err, "Configuration error");
            }
            err if status.is_server_error() => {
                tracing::error!(error = %err, "Request failed");
            }
            err => {
                tracing::warn!(error = %err, status = %status, "Request rejected");
            }
        }

        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
