use super::Interceptor;
use crate::schema::Topic;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Writes each prompt/response pair to its own markdown file.
#[derive(Debug, Clone)]
pub struct FileInterceptor {
    base_path: PathBuf,
}

impl FileInterceptor {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl Interceptor for FileInterceptor {
    async fn save(&self, topic: Topic, prompt: &str, response: &str) -> std::io::Result<()> {
        let timestamp = Utc::now();
        let filename = format!(
            "vignette_{}_{}.md",
            topic.key(),
            timestamp.format("%Y%m%d_%H%M%S_%3f")
        );
        let file_path = self.base_path.join(filename);

        fs::create_dir_all(&self.base_path).await?;

        let content = format!(
            "# Topic\n\n{}\n\n# Prompt\n\n{}\n\n# Response\n\n{}\n",
            topic, prompt, response
        );

        let mut file = fs::File::create(&file_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}
