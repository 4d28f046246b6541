use crate::config::KeyFromEnv;
use crate::core::{GenerationRequest, LowLevelClient};
use crate::error::{AIError, ClaudeError, ConfigError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClaudeModel {
    Opus4,
    #[default]
    Sonnet4,
    Haiku35,
    Override(String),
}

impl ClaudeModel {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Opus4 => "claude-opus-4-20250514",
            Self::Sonnet4 => "claude-sonnet-4-20250514",
            Self::Haiku35 => "claude-3-5-haiku-20241022",
            Self::Override(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub model: ClaudeModel,
    pub max_tokens: u32,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: ClaudeModel::default(),
            max_tokens: 8192,
        }
    }
}

impl ClaudeConfig {
    #[must_use]
    pub fn new(api_key: String, model: ClaudeModel) -> Self {
        Self { api_key, model, ..Default::default() }
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic messages client. The vignette shape travels as prompt guidance.
#[derive(Clone, Debug)]
pub struct ClaudeClient {
    config: ClaudeConfig,
    client: Client,
}

impl KeyFromEnv for ClaudeClient {
    const KEY_NAME: &'static str = "ANTHROPIC_API_KEY";
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig) -> Self {
        info!(model = %config.model.id(), "Creating new Claude client");
        Self { config, client: Client::new() }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(ClaudeConfig::new(Self::require_key()?, ClaudeModel::default())))
    }
}

#[async_trait]
impl LowLevelClient for ClaudeClient {
    #[instrument(skip(self, request), fields(prompt_len = request.prompt.len(), model = %self.config.model.id()))]
    async fn ask_raw(&self, request: GenerationRequest) -> Result<String, AIError> {
        debug!("Preparing Claude API request");

        let body = ClaudeRequest {
            model: self.config.model.id().to_string(),
            max_tokens: self.config.max_tokens,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: request.prompt_with_guidance(),
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                ClaudeError::Http(e.to_string())
            })?;

        debug!(status = %response.status(), "Received response from Claude API");

        if response.status() == 429 {
            warn!("Claude API rate limit exceeded");
            return Err(ClaudeError::RateLimit.into());
        }

        if response.status() == 401 {
            error!("Claude API authentication failed");
            return Err(ClaudeError::Authentication.into());
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Claude API error");
            return Err(ClaudeError::Api(error_text).into());
        }

        let claude_response: ClaudeResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Claude response JSON");
            ClaudeError::Http(e.to_string())
        })?;

        let text: String = claude_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            error!("No text content in Claude response");
            return Err(ClaudeError::Api("No content in response".to_string()).into());
        }

        info!(response_len = text.len(), "Successfully received Claude response");
        Ok(text)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
