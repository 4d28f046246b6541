use async_trait::async_trait;
use std::fmt::Debug;

use crate::schema::Topic;

/// Observer for generation exchanges, used for diagnostics.
///
/// Failures to record are logged by the caller and never fail a generation.
#[async_trait]
pub trait Interceptor: Send + Sync + Debug {
    async fn save(&self, topic: Topic, prompt: &str, response: &str) -> std::io::Result<()>;
}

pub mod file;
pub use file::FileInterceptor;
