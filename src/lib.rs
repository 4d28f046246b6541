pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod generator;
pub mod interceptors;
pub mod json_utils;
pub mod sanitizer;
pub mod schema;
pub mod session;
pub mod telemetry;

// Convenient re-exports
pub use error::{GenerationFailure, SessionError};
pub use generator::VignetteGenerator;
pub use sanitizer::sanitize;
pub use schema::{OptionKey, Question, Topic, Vignette};
pub use session::{Quiz, QuizState, Score, Session};
