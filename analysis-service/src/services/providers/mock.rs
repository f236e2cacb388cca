//! Scripted provider for tests and offline development.

use super::{ChatCompletion, InferenceProvider, ProviderError};
use crate::models::ModelMessage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// What the mock does when a given model is called.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Reply(String),
    Fail(String),
    /// Answers with no choices at all.
    Empty,
    /// Sleeps, then replies.
    Slow(Duration, String),
}

/// A call the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model_id: String,
    pub message: ModelMessage,
    pub max_tokens: u32,
}

pub struct MockProvider {
    available: bool,
    behaviors: HashMap<String, MockBehavior>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockProvider {
    /// Available provider that echoes the prompt for any model without a script.
    pub fn new() -> Self {
        Self {
            available: true,
            behaviors: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn with_behavior(mut self, model_id: &str, behavior: MockBehavior) -> Self {
        self.behaviors.insert(model_id.to_string(), behavior);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn chat(
        &self,
        model_id: &str,
        message: &ModelMessage,
        max_tokens: u32,
    ) -> Result<ChatCompletion, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                model_id: model_id.to_string(),
                message: message.clone(),
                max_tokens,
            });
        }

        if !self.available {
            return Err(ProviderError::NotConfigured(
                "Mock provider not enabled".to_string(),
            ));
        }

        match self.behaviors.get(model_id).cloned() {
            Some(MockBehavior::Reply(text)) => Ok(ChatCompletion::from_text(text)),
            Some(MockBehavior::Fail(reason)) => Err(ProviderError::Api {
                status: 500,
                message: reason,
            }),
            Some(MockBehavior::Empty) => Ok(ChatCompletion::default()),
            Some(MockBehavior::Slow(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(ChatCompletion::from_text(text))
            }
            None => Ok(ChatCompletion::from_text(format!(
                "Mock response from {} for: {}",
                model_id,
                message.text()
            ))),
        }
    }
}
