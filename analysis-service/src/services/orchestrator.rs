//! Fans one request out to every requested model and gathers the results.

use crate::config::{AnalysisConfig, ChatConfig};
use crate::models::{AnalysisOutcome, ChatOutcome, ModelDescriptor};
use crate::services::image_normalizer::{self, EncodedImage};
use crate::services::metrics::record_image_normalized;
use crate::services::model_client::ModelClient;
use crate::services::prompt;
use crate::services::providers::InferenceProvider;
use futures::stream::{self, StreamExt};
use service_core::error::AppError;
use service_core::timestamp;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

const NOT_INITIALIZED: &str = "Inference models not initialized";

/// Built once at startup and shared by all requests.
pub struct AnalysisOrchestrator {
    client: ModelClient,
    models: Vec<ModelDescriptor>,
    chat: ChatConfig,
    max_concurrency: usize,
}

impl AnalysisOrchestrator {
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        models: Vec<ModelDescriptor>,
        chat: ChatConfig,
        model_timeout: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            client: ModelClient::new(provider, model_timeout),
            models,
            chat,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn from_config(config: &AnalysisConfig, provider: Arc<dyn InferenceProvider>) -> Self {
        Self::new(
            provider,
            config.models.clone(),
            config.chat.clone(),
            Duration::from_secs(config.limits.model_timeout_secs),
            config.limits.max_concurrent_models,
        )
    }

    pub fn catalog(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider().name()
    }

    /// Whether the inference backend has credentials to make calls.
    pub fn provider_available(&self) -> bool {
        self.client.provider().is_available()
    }

    /// At least one model is configured and the backend can reach it.
    pub fn is_initialized(&self) -> bool {
        !self.models.is_empty() && self.provider_available()
    }

    /// Full analysis across the requested models (all configured when `None`).
    ///
    /// Always yields exactly one result per requested model; individual model
    /// failures are reported inside their result.
    pub async fn analyze_input(
        &self,
        image: Option<Vec<u8>>,
        prompt: &str,
        requested: Option<&[String]>,
    ) -> Result<AnalysisOutcome, AppError> {
        if !self.is_initialized() {
            return Err(AppError::NotInitialized(NOT_INITIALIZED.to_string()));
        }

        let selected = self.select_models(requested)?;

        if image.is_none() && prompt.trim().is_empty() {
            return Err(AppError::Validation(
                "A prompt is required when no image is supplied".to_string(),
            ));
        }

        let encoded = match image {
            Some(raw) => Some(normalize_off_runtime(raw).await?),
            None => None,
        };

        let message = prompt::compose(prompt, encoded.as_ref());

        tracing::info!(
            models = selected.len(),
            has_image = encoded.is_some(),
            "Dispatching analysis"
        );

        // Owned descriptors keep the fanout future Send for axum handlers.
        let client = &self.client;
        let message = &message;
        let results = stream::iter(selected.into_iter().cloned())
            .map(|model| async move { client.invoke(&model, message, model.max_tokens).await })
            .buffered(self.max_concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(AnalysisOutcome {
            results,
            timestamp: timestamp(),
        })
    }

    /// Abbreviated single-model answer, trimmed for brevity. Any present
    /// message is forwarded, including an empty one.
    pub async fn chat(&self, message: &str) -> Result<ChatOutcome, AppError> {
        if !self.is_initialized() {
            return Err(AppError::NotInitialized(NOT_INITIALIZED.to_string()));
        }

        let model = self
            .models
            .iter()
            .find(|m| m.key == self.chat.model_key)
            .ok_or_else(|| {
                AppError::NotInitialized(format!(
                    "Chat model '{}' is not configured",
                    self.chat.model_key
                ))
            })?;

        let descriptor = ModelDescriptor {
            display_name: self.chat.display_name.clone(),
            ..model.clone()
        };

        let result = self
            .client
            .invoke(&descriptor, &prompt::compose_chat(message), self.chat.max_tokens)
            .await;

        match result.response_text {
            Some(text) => Ok(ChatOutcome {
                response: truncate_for_brevity(
                    &text,
                    self.chat.word_limit,
                    self.chat.sentence_limit,
                ),
                timestamp: timestamp(),
            }),
            None => Err(AppError::ModelInvocation(
                result
                    .error_detail
                    .unwrap_or_else(|| "Invalid response format from model".to_string()),
            )),
        }
    }

    fn select_models(&self, requested: Option<&[String]>) -> Result<Vec<&ModelDescriptor>, AppError> {
        let requested: BTreeSet<&str> = match requested {
            Some(keys) if !keys.is_empty() => keys.iter().map(String::as_str).collect(),
            _ => return Ok(self.models.iter().collect()),
        };

        let unknown: Vec<&str> = requested
            .iter()
            .copied()
            .filter(|key| !self.models.iter().any(|m| m.key == *key))
            .collect();

        if !unknown.is_empty() {
            let available: Vec<&str> = self.models.iter().map(|m| m.key.as_str()).collect();
            return Err(AppError::Validation(format!(
                "Unknown model(s): {}. Available: {}",
                unknown.join(", "),
                available.join(", ")
            )));
        }

        Ok(self
            .models
            .iter()
            .filter(|m| requested.contains(m.key.as_str()))
            .collect())
    }
}

async fn normalize_off_runtime(raw: Vec<u8>) -> Result<EncodedImage, AppError> {
    let started = Instant::now();

    let encoded = tokio::task::spawn_blocking(move || image_normalizer::normalize(&raw))
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Image worker failed: {}", e)))??;

    record_image_normalized(started.elapsed().as_secs_f64());
    let (width, height) = encoded.dimensions();
    tracing::info!(width, height, "Image processed successfully");

    Ok(encoded)
}

/// Keep the first `sentence_limit` ". "-separated pieces of replies longer
/// than `word_limit` words. Splitting is literal, not linguistic.
pub fn truncate_for_brevity(text: &str, word_limit: usize, sentence_limit: usize) -> String {
    if text.split_whitespace().count() <= word_limit {
        return text.to_string();
    }

    let kept: Vec<&str> = text.split(". ").take(sentence_limit).collect();
    format!("{}.", kept.join(". "))
}
