use crate::models::{default_catalog, ModelDescriptor};
use config::{Config as Cfg, File};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

/// Default inbound body ceiling (16MB), the only admission control.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub common: core_config::Config,
    pub watsonx: WatsonxConfig,
    pub models: Vec<ModelDescriptor>,
    pub chat: ChatConfig,
    pub limits: LimitsConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone)]
pub struct WatsonxConfig {
    pub url: String,
    pub iam_url: String,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub api_version: String,
    pub request_timeout_secs: u64,
}

impl WatsonxConfig {
    /// Both credentials are present.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.api_key) && present(&self.project_id)
    }
}

impl Default for WatsonxConfig {
    fn default() -> Self {
        Self {
            url: "https://us-south.ml.cloud.ibm.com".to_string(),
            iam_url: "https://iam.cloud.ibm.com/identity/token".to_string(),
            api_key: None,
            project_id: None,
            api_version: "2024-05-01".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model answering the abbreviated chat flow.
    pub model_key: String,
    pub display_name: String,
    pub max_tokens: u32,
    /// Replies longer than this many words get truncated.
    pub word_limit: usize,
    /// Sentences kept when truncating.
    pub sentence_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model_key: "pixtral".to_string(),
            display_name: "HealthMate AI".to_string(),
            max_tokens: 150,
            word_limit: 50,
            sentence_limit: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_upload_bytes: usize,
    pub model_timeout_secs: u64,
    pub max_concurrent_models: usize,
}

impl LimitsConfig {
    pub fn max_upload_megabytes(&self) -> usize {
        self.max_upload_bytes / (1024 * 1024)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            model_timeout_secs: 60,
            max_concurrent_models: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            otlp_endpoint: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            common: core_config::Config::default(),
            watsonx: WatsonxConfig::default(),
            models: default_catalog(),
            chat: ChatConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = core_config::Environment::current().is_prod();
        let defaults = AnalysisConfig::default();

        // The model list is structured, so it only comes from the configuration file.
        let file = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .build()?;
        let models = match file.get::<Vec<ModelDescriptor>>("models") {
            Ok(models) => models,
            Err(config::ConfigError::NotFound(_)) => defaults.models,
            Err(e) => return Err(e.into()),
        };

        let api_key = get_optional_env("WATSONX_API_KEY", is_prod)?;
        let project_id = get_optional_env("WATSONX_PROJECT_ID", is_prod)?;

        let config = AnalysisConfig {
            common: common_config,
            watsonx: WatsonxConfig {
                url: get_env("WATSONX_URL", &defaults.watsonx.url),
                iam_url: get_env("WATSONX_IAM_URL", &defaults.watsonx.iam_url),
                api_key,
                project_id,
                api_version: get_env("WATSONX_API_VERSION", &defaults.watsonx.api_version),
                request_timeout_secs: get_parsed_env(
                    "WATSONX_REQUEST_TIMEOUT_SECS",
                    defaults.watsonx.request_timeout_secs,
                )?,
            },
            models,
            chat: ChatConfig {
                model_key: get_env("CHAT_MODEL_KEY", &defaults.chat.model_key),
                display_name: get_env("CHAT_DISPLAY_NAME", &defaults.chat.display_name),
                max_tokens: get_parsed_env("CHAT_MAX_TOKENS", defaults.chat.max_tokens)?,
                word_limit: get_parsed_env("CHAT_WORD_LIMIT", defaults.chat.word_limit)?,
                sentence_limit: get_parsed_env(
                    "CHAT_SENTENCE_LIMIT",
                    defaults.chat.sentence_limit,
                )?,
            },
            limits: LimitsConfig {
                max_upload_bytes: get_parsed_env(
                    "MAX_UPLOAD_BYTES",
                    defaults.limits.max_upload_bytes,
                )?,
                model_timeout_secs: get_parsed_env(
                    "MODEL_TIMEOUT_SECS",
                    defaults.limits.model_timeout_secs,
                )?,
                max_concurrent_models: get_parsed_env(
                    "MAX_CONCURRENT_MODELS",
                    defaults.limits.max_concurrent_models,
                )?,
            },
            observability: ObservabilityConfig {
                log_level: get_env("LOG_LEVEL", &defaults.observability.log_level),
                otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        let mut seen = std::collections::HashSet::new();
        for model in &self.models {
            if !seen.insert(model.key.as_str()) {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "duplicate model key '{}'",
                    model.key
                )));
            }
        }

        if self.limits.max_concurrent_models == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MAX_CONCURRENT_MODELS must be at least 1"
            )));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_optional_env(key: &str, is_prod: bool) -> Result<Option<String>, AppError> {
    match env::var(key) {
        Ok(val) if !val.is_empty() => Ok(Some(val)),
        _ if is_prod => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is required in production but not set",
            key
        ))),
        _ => Ok(None),
    }
}

fn get_parsed_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
        }),
        Err(_) => Ok(default),
    }
}
