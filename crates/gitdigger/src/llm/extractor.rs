use std::sync::Arc;

use async_trait::async_trait;

use crate::sanitize::truncate_for_log;

use super::parse::{clean_names, parse_org_list};
use super::{LanguageModel, OrganizationNameExtractor};

/// Default number of document characters sent to the model.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 10_000;

const PROMPT_HEADER: &str = "Extract all GitHub organization usernames of tech companies \
mentioned in this text. Include organizations that are referenced by name even when no \
GitHub link is given, using their well-known GitHub handle. \
Return ONLY a Python list of lowercase usernames without explanation. \
Example response: ['google', 'microsoft', 'facebook']";

/// Finds organization handles in document text with a language model.
pub struct LlmNameExtractor {
    model: Arc<dyn LanguageModel>,
    max_prompt_chars: usize,
}

impl LlmNameExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
        }
    }

    pub fn with_max_prompt_chars(mut self, max_prompt_chars: usize) -> Self {
        self.max_prompt_chars = max_prompt_chars;
        self
    }

    fn build_prompt(&self, text: &str) -> String {
        let excerpt = match text.char_indices().nth(self.max_prompt_chars) {
            Some((cut, _)) => &text[..cut],
            None => text,
        };
        format!("{}\n\nText:\n{}", PROMPT_HEADER, excerpt)
    }
}

#[async_trait]
impl OrganizationNameExtractor for LlmNameExtractor {
    async fn extract_names(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let prompt = self.build_prompt(text);
        match self.model.complete(&prompt).await {
            Ok(response) => {
                tracing::debug!(response = %truncate_for_log(&response, 500), "Model response");
                clean_names(parse_org_list(&response))
            }
            Err(e) => {
                tracing::warn!("Organization name extraction failed: {}", e);
                Vec::new()
            }
        }
    }
}
