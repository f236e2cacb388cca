//! IBM watsonx.ai chat provider.
//!
//! Exchanges the API key for an IAM bearer token (cached until shortly
//! before expiry) and calls the `/ml/v1/text/chat` endpoint.

use super::{ChatCompletion, Choice, InferenceProvider, ProviderError};
use crate::config::WatsonxConfig;
use crate::models::ModelMessage;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use service_core::observability::TracedRequestExt;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Tokens are refreshed this long before IAM says they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct WatsonxProvider {
    config: WatsonxConfig,
    client: Client,
    token: RwLock<Option<CachedToken>>,
}

impl WatsonxProvider {
    pub fn new(config: WatsonxConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            token: RwLock::new(None),
        })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/ml/v1/text/chat?version={}",
            self.config.url.trim_end_matches('/'),
            self.config.api_version
        )
    }

    fn credentials(&self) -> Result<(&str, &str), ProviderError> {
        match (
            self.config.api_key.as_deref(),
            self.config.project_id.as_deref(),
        ) {
            (Some(key), Some(project)) if !key.is_empty() && !project.is_empty() => {
                Ok((key, project))
            }
            _ => Err(ProviderError::NotConfigured(
                "watsonx.ai API key or project id not configured".to_string(),
            )),
        }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
                return Ok(token.value.clone());
            }
        }

        let mut cached = self.token.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.value.clone());
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<CachedToken, ProviderError> {
        let (api_key, _) = self.credentials()?;

        tracing::debug!(iam_url = %self.config.iam_url, "Requesting IAM access token");

        let response = self
            .client
            .post(&self.config.iam_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", IAM_GRANT_TYPE), ("apikey", api_key)])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth(format!(
                "IAM token request failed with {}: {}",
                status, body
            )));
        }

        let token: IamTokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Auth(format!("Malformed IAM token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in);
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        })
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }
}

#[async_trait]
impl InferenceProvider for WatsonxProvider {
    fn name(&self) -> &str {
        "watsonx"
    }

    fn is_available(&self) -> bool {
        self.config.is_configured()
    }

    async fn chat(
        &self,
        model_id: &str,
        message: &ModelMessage,
        max_tokens: u32,
    ) -> Result<ChatCompletion, ProviderError> {
        let (_, project_id) = self.credentials()?;
        let token = self.access_token().await?;

        let request = TextChatRequest {
            model_id,
            project_id,
            messages: message,
            max_tokens,
        };

        tracing::debug!(model = model_id, max_tokens, "Sending chat request to watsonx.ai");

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(token)
            .json(&request)
            .with_trace_context()
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(Duration::from_secs(self.config.request_timeout_secs))
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED => {
                    self.invalidate_token().await;
                    ProviderError::Auth(body)
                }
                StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
                _ => ProviderError::Api {
                    status: status.as_u16(),
                    message: body,
                },
            });
        }

        let body: TextChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(ChatCompletion {
            choices: body
                .choices
                .into_iter()
                .map(|c| Choice {
                    content: c.message.and_then(|m| m.content),
                })
                .collect(),
        })
    }
}

// ============================================================================
// watsonx.ai Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Serialize)]
struct TextChatRequest<'a> {
    model_id: &'a str,
    project_id: &'a str,
    messages: &'a ModelMessage,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct TextChatResponse {
    #[serde(default)]
    choices: Vec<TextChatChoice>,
}

#[derive(Debug, Deserialize)]
struct TextChatChoice {
    #[serde(default)]
    message: Option<TextChatMessage>,
}

#[derive(Debug, Deserialize)]
struct TextChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> WatsonxConfig {
        WatsonxConfig {
            url: "https://eu-de.ml.cloud.ibm.com/".to_string(),
            api_key: Some("key".to_string()),
            project_id: Some("project".to_string()),
            ..WatsonxConfig::default()
        }
    }

    #[test]
    fn chat_url_includes_version() {
        let provider = WatsonxProvider::new(configured()).unwrap();
        assert_eq!(
            provider.chat_url(),
            "https://eu-de.ml.cloud.ibm.com/ml/v1/text/chat?version=2024-05-01"
        );
    }

    #[tokio::test]
    async fn missing_credentials_fail_without_network() {
        let provider = WatsonxProvider::new(WatsonxConfig::default()).unwrap();
        assert!(!provider.is_available());

        let err = provider
            .chat("mistralai/pixtral-12b", &ModelMessage::user(vec![]), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
