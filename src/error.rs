use thiserror::Error;

/// The single failure kind the generator reports to its callers.
///
/// The underlying cause is kept as the error source for logging only; callers
/// are expected to treat every variant of the cause the same way.
#[derive(Error, Debug)]
#[error("vignette generation failed")]
pub struct GenerationFailure {
    #[source]
    cause: GenerationCause,
}

impl GenerationFailure {
    pub fn new(cause: impl Into<GenerationCause>) -> Self {
        Self { cause: cause.into() }
    }

    /// Diagnostic access to what went wrong underneath.
    pub fn cause(&self) -> &GenerationCause {
        &self.cause
    }
}

#[derive(Error, Debug)]
pub enum GenerationCause {
    #[error("AI error: {0}")]
    Ai(#[from] AIError),
    #[error("JSON deserialization error: {0}. Raw response: {1}")]
    JsonDeserialization(#[source] serde_json::Error, String),
    #[error("no JSON object found in response")]
    NoJsonFound,
    #[error("schema violation: {0}")]
    Schema(#[from] SchemaViolation),
}

/// Ways a well-formed JSON payload can still break the vignette contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("payload does not match the vignette shape: {0}")]
    Shape(String),
    #[error("expected exactly {expected} questions, got {actual}")]
    QuestionCount { expected: usize, actual: usize },
    #[error("field `{0}` is empty")]
    EmptyField(String),
    #[error("duplicate question id `{0}`")]
    DuplicateQuestionId(String),
}

#[derive(Error, Debug)]
pub enum AIError {
    #[error("Gemini API error: {0}")]
    Gemini(#[from] GeminiError),
    #[error("Claude API error: {0}")]
    Claude(#[from] ClaudeError),
    #[error("DeepSeek API error: {0}")]
    DeepSeek(#[from] DeepSeekError),
    #[error("Mock error: {0}")]
    Mock(String),
}

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug)]
pub enum ClaudeError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug)]
pub enum DeepSeekError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

/// Rejected quiz transitions. The quiz state is left untouched when one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: &'static str },
    #[error("no active session")]
    NoActiveSession,
    #[error("answers are frozen after submission")]
    AnswersFrozen,
    #[error("unknown question id `{0}`")]
    UnknownQuestion(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingKey(&'static str),
    #[error("no input received for {0}")]
    NoInput(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
