use crate::config::KeyFromEnv;
use crate::core::{GenerationRequest, LowLevelClient};
use crate::error::{AIError, ConfigError, GeminiError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeminiModel {
    #[default]
    Pro3Preview, // "gemini-3-pro-preview"
    Pro25,       // "gemini-2.5-pro"
    Flash25,     // "gemini-2.5-flash"
    Override(String),
}

impl GeminiModel {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Pro3Preview => "gemini-3-pro-preview",
            Self::Pro25 => "gemini-2.5-pro",
            Self::Flash25 => "gemini-2.5-flash",
            Self::Override(s) => s.as_str(),
        }
    }
}

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: GeminiModel,
    pub temperature: Option<f32>,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: GeminiModel::default(),
            temperature: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl GeminiConfig {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self { api_key, ..Default::default() }
    }

    #[must_use]
    pub fn with_model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String, GeminiError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GeminiError::Api(format!("prompt blocked: {}", reason)));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GeminiError::Api("No candidates in response".to_string()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(GeminiError::Api(format!("empty candidate (finish reason: {})", reason)));
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorStatus,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorStatus {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

/// Map a non-success body to an error. An invalid key comes back as a plain
/// 400 with reason `API_KEY_INVALID`.
fn classify_error(body: &str) -> GeminiError {
    match serde_json::from_str::<GeminiErrorBody>(body) {
        Ok(parsed) if parsed.error.details.iter().any(|d| d.reason.as_deref() == Some("API_KEY_INVALID")) => {
            GeminiError::Authentication
        }
        Ok(parsed) if !parsed.error.message.is_empty() => GeminiError::Api(parsed.error.message),
        _ => GeminiError::Api(body.to_string()),
    }
}

/// Gemini `generateContent` client with native JSON-schema constrained output.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl KeyFromEnv for GeminiClient {
    const KEY_NAME: &'static str = "GEMINI_API_KEY";
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        info!(model = %config.model.id(), "Creating new Gemini client");
        Self { config, client: Client::new() }
    }

    /// Build a client from `GEMINI_API_KEY` (environment or `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(GeminiConfig::new(Self::require_key()?)))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model.id()
        )
    }
}

#[async_trait]
impl LowLevelClient for GeminiClient {
    #[instrument(skip(self, request), fields(prompt_len = request.prompt.len(), model = %self.config.model.id()))]
    async fn ask_raw(&self, request: GenerationRequest) -> Result<String, AIError> {
        debug!("Preparing Gemini API request");

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: Some(request.prompt) }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.response_schema,
                temperature: self.config.temperature,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                GeminiError::Http(e.to_string())
            })?;

        let status = response.status();
        debug!(status = %status, "Received response from Gemini API");

        if status == 429 {
            warn!("Gemini API rate limit exceeded");
            return Err(GeminiError::RateLimit.into());
        }

        if status == 401 || status == 403 {
            error!("Gemini API authentication failed");
            return Err(GeminiError::Authentication.into());
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Gemini API error");
            return Err(classify_error(&error_text).into());
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Gemini response JSON");
            GeminiError::Http(e.to_string())
        })?;

        debug!(candidates = gemini_response.candidates.len(), "Parsed Gemini response");

        let result = gemini_response.into_text();
        match &result {
            Ok(text) => info!(response_len = text.len(), "Successfully received Gemini response"),
            Err(e) => error!(error = %e, "Failed to extract content from Gemini response"),
        }

        Ok(result?)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
