//! Hosted inference provider abstraction.
//!
//! The orchestrator only sees [`InferenceProvider`]; the concrete backend
//! (watsonx.ai, or the scripted mock in tests) is chosen at startup.

pub mod mock;
pub mod watsonx;

use crate::models::ModelMessage;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response format from model: {0}")]
    InvalidResponse(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Auth(_) => "auth",
            ProviderError::Api { .. } => "api",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::Network(_) => "network",
            ProviderError::InvalidResponse(_) => "invalid_response",
            ProviderError::Timeout(_) => "timeout",
        }
    }
}

/// One candidate returned by a chat call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choice {
    pub content: Option<String>,
}

/// Raw answer of a chat-style call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatCompletion {
    pub choices: Vec<Choice>,
}

impl ChatCompletion {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                content: Some(text.into()),
            }],
        }
    }

    /// Content of the first choice, when it carries any text.
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.content.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

/// Chat-style inference over text and inline images.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Backend name used in logs and metrics.
    fn name(&self) -> &str;

    /// Whether the provider has what it needs to make calls.
    fn is_available(&self) -> bool;

    async fn chat(
        &self,
        model_id: &str,
        message: &ModelMessage,
        max_tokens: u32,
    ) -> Result<ChatCompletion, ProviderError>;
}
