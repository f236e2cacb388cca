use crate::models::{ModelDescriptor, ModelMessage, ModelResult};
use crate::services::metrics::record_model_call;
use crate::services::providers::{InferenceProvider, ProviderError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wraps a single hosted model call. Failures come back as data, never as `Err`.
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn InferenceProvider>,
    timeout: Duration,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn InferenceProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn provider(&self) -> &Arc<dyn InferenceProvider> {
        &self.provider
    }

    /// One attempt, bounded by the client timeout. No retries.
    pub async fn invoke(
        &self,
        model: &ModelDescriptor,
        message: &ModelMessage,
        max_tokens: u32,
    ) -> ModelResult {
        tracing::info!(
            model = %model.key,
            model_id = %model.model_id,
            max_tokens,
            "Starting analysis"
        );

        let started = Instant::now();
        let outcome = self.call(model, message, max_tokens).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(text) => {
                record_model_call(&model.key, "success", elapsed.as_secs_f64());
                tracing::info!(
                    model = %model.key,
                    elapsed_ms = elapsed.as_millis() as u64,
                    response_len = text.len(),
                    "Analysis completed"
                );
                ModelResult::success(&model.key, &model.display_name, text)
            }
            Err(e) => {
                record_model_call(&model.key, e.kind(), elapsed.as_secs_f64());
                tracing::warn!(
                    model = %model.key,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "Analysis failed"
                );
                ModelResult::error(&model.key, &model.display_name, e.to_string())
            }
        }
    }

    async fn call(
        &self,
        model: &ModelDescriptor,
        message: &ModelMessage,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let completion = tokio::time::timeout(
            self.timeout,
            self.provider.chat(&model.model_id, message, max_tokens),
        )
        .await
        .map_err(|_| ProviderError::Timeout(self.timeout))??;

        completion
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidResponse("no choice with content".to_string()))
    }
}
