use serde::{Deserialize, Serialize};
use service_core::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Success,
    Error,
}

/// Outcome of one model call within a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResult {
    #[serde(skip)]
    pub model_key: String,
    pub model_name: String,
    pub status: ModelStatus,
    #[serde(rename = "response", skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub timestamp: String,
}

impl ModelResult {
    pub fn success(model_key: &str, model_name: &str, text: String) -> Self {
        Self {
            model_key: model_key.to_string(),
            model_name: model_name.to_string(),
            status: ModelStatus::Success,
            response_text: Some(text),
            error_detail: None,
            timestamp: timestamp(),
        }
    }

    pub fn error(model_key: &str, model_name: &str, detail: impl Into<String>) -> Self {
        Self {
            model_key: model_key.to_string(),
            model_name: model_name.to_string(),
            status: ModelStatus::Error,
            response_text: None,
            error_detail: Some(detail.into()),
            timestamp: timestamp(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ModelStatus::Success
    }
}

/// Per-model results of one analysis, in configured model order.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub results: Vec<ModelResult>,
    pub timestamp: String,
}

impl AnalysisOutcome {
    pub fn get(&self, model_key: &str) -> Option<&ModelResult> {
        self.results.iter().find(|r| r.model_key == model_key)
    }
}

/// Post-processed reply of the abbreviated chat flow.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}
