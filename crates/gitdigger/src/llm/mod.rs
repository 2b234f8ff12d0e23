//! Language-model backed organization name extraction.

pub mod extractor;
pub mod gemini;
pub mod parse;

use async_trait::async_trait;
use thiserror::Error;

pub use extractor::{LlmNameExtractor, DEFAULT_MAX_PROMPT_CHARS};
pub use gemini::GeminiClient;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Language model API key is not configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("Language model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Language model returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Language model returned no text")]
    EmptyResponse,
}

/// A text-completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Finds candidate GitHub organization identifiers in document text.
///
/// Total by contract: failures are logged and reported as an empty list.
#[async_trait]
pub trait OrganizationNameExtractor: Send + Sync {
    async fn extract_names(&self, text: &str) -> Vec<String>;
}
