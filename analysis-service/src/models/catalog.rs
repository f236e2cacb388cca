use serde::{Deserialize, Serialize};

/// Token ceiling for a full analysis call.
pub const DEFAULT_ANALYSIS_MAX_TOKENS: u32 = 300;

/// A hosted model the service can fan out to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Stable key used in request filters and response maps (e.g. `pixtral`).
    pub key: String,
    /// Identifier understood by the inference service.
    pub model_id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    DEFAULT_ANALYSIS_MAX_TOKENS
}

impl ModelDescriptor {
    pub fn new(key: &str, model_id: &str, display_name: &str) -> Self {
        Self {
            key: key.to_string(),
            model_id: model_id.to_string(),
            display_name: display_name.to_string(),
            description: String::new(),
            capabilities: Vec::new(),
            max_tokens: DEFAULT_ANALYSIS_MAX_TOKENS,
        }
    }
}

/// Models used when the configuration does not list any.
pub fn default_catalog() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor {
            key: "pixtral".to_string(),
            model_id: "mistralai/pixtral-12b".to_string(),
            display_name: "Pixtral 12B".to_string(),
            description: "Mistral AI vision model specialized in image analysis".to_string(),
            capabilities: vec![
                "Medical imaging".to_string(),
                "General image analysis".to_string(),
                "Detailed descriptions".to_string(),
            ],
            max_tokens: DEFAULT_ANALYSIS_MAX_TOKENS,
        },
        ModelDescriptor {
            key: "llama_vision".to_string(),
            model_id: "meta-llama/llama-3-2-11b-vision-instruct".to_string(),
            display_name: "Llama 3.2 11B Vision".to_string(),
            description: "Meta's vision-language model for comprehensive analysis".to_string(),
            capabilities: vec![
                "Medical assessment".to_string(),
                "Multi-modal understanding".to_string(),
                "Detailed reasoning".to_string(),
            ],
            max_tokens: DEFAULT_ANALYSIS_MAX_TOKENS,
        },
    ]
}
