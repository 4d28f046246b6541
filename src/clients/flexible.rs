use crate::clients::{
    ClaudeClient, ClaudeConfig, DeepSeekClient, DeepSeekConfig, GeminiClient, GeminiConfig, MockClient,
    MockHandle,
};
use crate::config::{key_available, KeyFromEnv};
use crate::core::{GenerationRequest, LowLevelClient};
use crate::error::{AIError, ConfigError};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which provider to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    Gemini,
    Claude,
    DeepSeek,
    Mock,
}

impl Default for ClientType {
    /// Pick the first provider with a key available, in order of preference.
    fn default() -> Self {
        if key_available(GeminiClient::KEY_NAME) {
            Self::Gemini
        } else if key_available(ClaudeClient::KEY_NAME) {
            Self::Claude
        } else if key_available(DeepSeekClient::KEY_NAME) {
            Self::DeepSeek
        } else {
            Self::Mock
        }
    }
}

impl FromStr for ClientType {
    type Err = String;

    /// Parse client type from string (case insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "claude" => Ok(Self::Claude),
            "deepseek" => Ok(Self::DeepSeek),
            "mock" => Ok(Self::Mock),
            _ => Err(format!(
                "Unknown client type: '{}'. Supported: gemini, claude, deepseek, mock",
                s
            )),
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientType::Gemini => write!(f, "Gemini"),
            ClientType::Claude => write!(f, "Claude"),
            ClientType::DeepSeek => write!(f, "DeepSeek"),
            ClientType::Mock => write!(f, "Mock"),
        }
    }
}

impl ClientType {
    /// Build the client, asking on the terminal for a missing key.
    ///
    /// A mock built this way has no reachable handle and fails every call.
    pub fn into_client(self) -> Result<Box<dyn LowLevelClient>, ConfigError> {
        let client: Box<dyn LowLevelClient> = match self {
            ClientType::Gemini => {
                let key = GeminiClient::find_key_with_user()?;
                Box::new(GeminiClient::new(GeminiConfig::new(key)))
            }
            ClientType::Claude => {
                let key = ClaudeClient::find_key_with_user()?;
                Box::new(ClaudeClient::new(ClaudeConfig::new(
                    key,
                    Default::default(),
                )))
            }
            ClientType::DeepSeek => {
                let key = DeepSeekClient::find_key_with_user()?;
                Box::new(DeepSeekClient::new(DeepSeekConfig {
                    api_key: key,
                    ..Default::default()
                }))
            }
            ClientType::Mock => Box::new(MockClient::new().0),
        };
        Ok(client)
    }
}

/// Client chosen at runtime, cheap to clone.
#[derive(Debug, Clone)]
pub struct FlexibleClient {
    inner: Arc<dyn LowLevelClient>,
}

impl FlexibleClient {
    pub fn new(client: Box<dyn LowLevelClient>) -> Self {
        Self { inner: Arc::from(client) }
    }

    pub fn from_type(client_type: ClientType) -> Result<Self, ConfigError> {
        Ok(Self::new(client_type.into_client()?))
    }

    pub fn gemini(config: GeminiConfig) -> Self {
        Self::new(Box::new(GeminiClient::new(config)))
    }

    pub fn claude(config: ClaudeConfig) -> Self {
        Self::new(Box::new(ClaudeClient::new(config)))
    }

    pub fn deepseek(config: DeepSeekConfig) -> Self {
        Self::new(Box::new(DeepSeekClient::new(config)))
    }

    /// Create a FlexibleClient with a mock and return the handle for configuration
    pub fn mock() -> (Self, Arc<MockHandle>) {
        let (mock_client, handle) = MockClient::new();
        (Self::new(Box::new(mock_client)), handle)
    }
}

#[async_trait]
impl LowLevelClient for FlexibleClient {
    async fn ask_raw(&self, request: GenerationRequest) -> Result<String, AIError> {
        self.inner.ask_raw(request).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
