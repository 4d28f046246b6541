//! The seam between the generator and the model providers.

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AIError;
use crate::schema::guidance_schema;

/// One outbound generation call: the instruction plus the shape the answer
/// has to follow.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Declared output schema, in the service's schema dialect.
    pub response_schema: Value,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, response_schema: Value) -> Self {
        Self { prompt: prompt.into(), response_schema }
    }

    /// Prompt with JSON Schema guidance appended, for providers that cannot
    /// constrain their output natively.
    pub fn prompt_with_guidance(&self) -> String {
        format!(
            "{}\n\n## Response Format\nRespond with a single JSON object matching this schema and nothing else:\n```json\n{}\n```",
            self.prompt,
            guidance_schema()
        )
    }
}

/// Low-level model client abstraction.
///
/// Implementors execute one request and hand back the raw payload text.
/// Parsing, sanitizing and validation happen in the generator.
#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    async fn ask_raw(&self, request: GenerationRequest) -> Result<String, AIError>;

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn LowLevelClient>;
}

impl Clone for Box<dyn LowLevelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl LowLevelClient for Box<dyn LowLevelClient> {
    async fn ask_raw(&self, request: GenerationRequest) -> Result<String, AIError> {
        self.as_ref().ask_raw(request).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        self.as_ref().clone_box()
    }
}
