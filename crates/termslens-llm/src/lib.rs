//! Generative-text boundary: send a prompt, receive text or fail.

use async_trait::async_trait;
use thiserror::Error;

#[cfg(feature = "http")]
pub mod gemini;

#[cfg(feature = "http")]
pub use gemini::{GeminiClient, GenerationConfig};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("empty response: {0}")]
    EmptyResponse(&'static str),
    #[error("no API key configured")]
    MissingApiKey,
}

/// Anything that turns a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, for logs and reports.
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}
