//! Chat-completion providers over HTTP.
//!
//! Concrete backends for OpenAI-compatible endpoints (including local
//! servers that speak the same API) and Anthropic.

use super::{ChatBackend, ChatCompletion, Prompt};
use crate::error::OracleError;
use crate::usage::Usage;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const OPENAI_MODEL_ENV: &str = "OPENAI_MODEL";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_BASE_URL_ENV: &str = "ANTHROPIC_BASE_URL";
pub const ANTHROPIC_MODEL_ENV: &str = "ANTHROPIC_MODEL";

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
}

impl std::str::FromStr for Provider {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(OracleError::NotConfigured(format!(
                "unknown provider {other:?} (expected openai or anthropic)"
            ))),
        }
    }
}

/// Provider settings, usually read from the environment.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    /// Non-zero so repeated samples are actually independent.
    pub temperature: f32,
}

impl LlmConfig {
    /// Settings for `provider` from its environment variables.
    pub fn from_env(provider: Provider) -> Result<Self, OracleError> {
        let (key_env, model_env, url_env, default_model, default_url) = match provider {
            Provider::OpenAI => (
                OPENAI_API_KEY_ENV,
                OPENAI_MODEL_ENV,
                OPENAI_BASE_URL_ENV,
                DEFAULT_OPENAI_MODEL,
                DEFAULT_OPENAI_BASE_URL,
            ),
            Provider::Anthropic => (
                ANTHROPIC_API_KEY_ENV,
                ANTHROPIC_MODEL_ENV,
                ANTHROPIC_BASE_URL_ENV,
                DEFAULT_ANTHROPIC_MODEL,
                DEFAULT_ANTHROPIC_BASE_URL,
            ),
        };

        let api_key = std::env::var(key_env).unwrap_or_default();
        // Local OpenAI-compatible servers commonly run without a key.
        let has_custom_url = std::env::var(url_env).is_ok();
        if api_key.trim().is_empty() && !(provider == Provider::OpenAI && has_custom_url) {
            return Err(OracleError::NotConfigured(format!("set {key_env}")));
        }

        Ok(Self {
            provider,
            api_key: api_key.trim().to_string(),
            model: std::env::var(model_env).unwrap_or_else(|_| default_model.to_string()),
            base_url: normalize_base_url(
                &std::env::var(url_env).unwrap_or_else(|_| default_url.to_string()),
            ),
            timeout_secs: 120,
            max_tokens: 1024,
            temperature: 0.7,
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Build the backend named by `config.provider`.
pub fn create_backend(config: LlmConfig) -> Result<Box<dyn ChatBackend>, OracleError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| OracleError::NotConfigured(format!("HTTP client: {e}")))?;

    match config.provider {
        #[cfg(feature = "openai")]
        Provider::OpenAI => Ok(Box::new(OpenAIBackend { client, config })),
        #[cfg(feature = "anthropic")]
        Provider::Anthropic => Ok(Box::new(AnthropicBackend { client, config })),
        #[allow(unreachable_patterns)]
        other => Err(OracleError::NotConfigured(format!(
            "{other:?} support not compiled in"
        ))),
    }
}

async fn send_json(
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, OracleError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| OracleError::Network(e.to_string()))?;

    if response.status() == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(OracleError::RateLimited {
            retry_after_ms: retry_after * 1000,
        });
    }

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(OracleError::Api(format!("{status}: {text}")));
    }

    response
        .json()
        .await
        .map_err(|e| OracleError::Parse(e.to_string()))
}

// ============================================================================
// OpenAI
// ============================================================================

#[cfg(feature = "openai")]
pub struct OpenAIBackend {
    client: Client,
    config: LlmConfig,
}

#[cfg(feature = "openai")]
#[async_trait]
impl ChatBackend for OpenAIBackend {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatCompletion, OracleError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "response_format": {"type": "json_object"},
        });

        let mut request = self.client.post(&url);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }
        let data = send_json(request, &body).await?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| OracleError::Parse("missing choices[0].message.content".to_string()))?
            .to_string();
        let usage = data.get("usage").map(|u| Usage {
            prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
            completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
        });

        Ok(ChatCompletion { content, usage })
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }
}

// ============================================================================
// Anthropic
// ============================================================================

#[cfg(feature = "anthropic")]
pub struct AnthropicBackend {
    client: Client,
    config: LlmConfig,
}

#[cfg(feature = "anthropic")]
#[async_trait]
impl ChatBackend for AnthropicBackend {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatCompletion, OracleError> {
        let url = format!("{}/v1/messages", self.config.base_url);
        let body = serde_json::json!({
            "model": self.config.model,
            "system": prompt.system,
            "messages": [{"role": "user", "content": prompt.user}],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let data = send_json(request, &body).await?;

        let content = data["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|b| b["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| OracleError::Parse("missing content text".to_string()))?;
        let usage = data.get("usage").map(|u| Usage {
            prompt_tokens: u["input_tokens"].as_u64().unwrap_or(0),
            completion_tokens: u["output_tokens"].as_u64().unwrap_or(0),
        });

        Ok(ChatCompletion { content, usage })
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!(" anthropic ".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert!("ollama".parse::<Provider>().is_err());
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:8000/v1/ "),
            "http://localhost:8000/v1"
        );
    }
}
