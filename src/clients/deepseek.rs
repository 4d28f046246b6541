use crate::config::KeyFromEnv;
use crate::core::{GenerationRequest, LowLevelClient};
use crate::error::{AIError, ConfigError, DeepSeekError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeepSeekModel {
    #[default]
    Chat,        // "deepseek-chat"
    Reasoner,    // "deepseek-reasoner"
    Override(String),
}

impl DeepSeekModel {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Chat => "deepseek-chat",
            Self::Reasoner => "deepseek-reasoner",
            Self::Override(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DeepSeekRequest {
    model: String,
    messages: Vec<DeepSeekMessage>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct DeepSeekMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct DeepSeekResponse {
    choices: Vec<DeepSeekChoice>,
}

#[derive(Debug, Deserialize)]
struct DeepSeekChoice {
    message: DeepSeekResponseMessage,
}

#[derive(Debug, Deserialize)]
struct DeepSeekResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Configuration for DeepSeek client
#[derive(Debug, Clone)]
pub struct DeepSeekConfig {
    pub api_key: String,
    pub model: DeepSeekModel,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for DeepSeekConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DeepSeekModel::default(),
            max_tokens: 8192,
            temperature: 0.7,
        }
    }
}

/// DeepSeek chat-completions client in JSON-object mode.
#[derive(Clone, Debug)]
pub struct DeepSeekClient {
    config: DeepSeekConfig,
    client: Client,
}

impl KeyFromEnv for DeepSeekClient {
    const KEY_NAME: &'static str = "DEEPSEEK_API_KEY";
}

impl DeepSeekClient {
    pub fn new(config: DeepSeekConfig) -> Self {
        info!(model = %config.model.id(), "Creating new DeepSeek client");
        Self { config, client: Client::new() }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let config = DeepSeekConfig { api_key: Self::require_key()?, ..Default::default() };
        Ok(Self::new(config))
    }
}

#[async_trait]
impl LowLevelClient for DeepSeekClient {
    #[instrument(skip(self, request), fields(prompt_len = request.prompt.len(), model = %self.config.model.id()))]
    async fn ask_raw(&self, request: GenerationRequest) -> Result<String, AIError> {
        debug!("Preparing DeepSeek API request");

        let body = DeepSeekRequest {
            model: self.config.model.id().to_string(),
            messages: vec![DeepSeekMessage {
                role: "user".to_string(),
                content: request.prompt_with_guidance(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: ResponseFormat { format_type: "json_object" },
        };

        let response = self
            .client
            .post("https://api.deepseek.com/v1/chat/completions")
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                DeepSeekError::Http(e.to_string())
            })?;

        debug!(status = %response.status(), "Received response from DeepSeek API");

        if response.status() == 429 {
            warn!("DeepSeek API rate limit exceeded");
            return Err(DeepSeekError::RateLimit.into());
        }

        if response.status() == 401 {
            error!("DeepSeek API authentication failed");
            return Err(DeepSeekError::Authentication.into());
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "DeepSeek API error");
            return Err(DeepSeekError::Api(error_text).into());
        }

        let deepseek_response: DeepSeekResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse DeepSeek response JSON");
            DeepSeekError::Http(e.to_string())
        })?;

        let content = deepseek_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                error!("No content in DeepSeek response");
                DeepSeekError::Api("No choices in response".to_string())
            })?;

        info!(response_len = content.len(), "Successfully received DeepSeek response");
        Ok(content)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
