//! Commit message generation with a deterministic fallback.

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::prompt::{PromptInput, build_prompt};
use crate::error::GenerationError;

/// A service that turns a prompt into text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Where a commit message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSource {
    Generated,
    Fallback,
}

impl fmt::Display for MessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSource::Generated => f.write_str("generated"),
            MessageSource::Fallback => f.write_str("fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMessage {
    pub text: String,
    pub source: MessageSource,
}

/// Message used whenever generation fails.
pub fn fallback_message(file_count: usize) -> String {
    format!("Changes in {} files", file_count)
}

/// Wraps a [`TextGenerator`] so that message generation never fails.
pub struct MessageGenerator<G> {
    generator: G,
}

impl<G: TextGenerator> MessageGenerator<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn inner(&self) -> &G {
        &self.generator
    }

    /// Generate a message for `input`, falling back to
    /// [`fallback_message`] on any failure.
    ///
    /// `changed_count` is the size of the changed-file set, which the
    /// fallback reports. It can exceed `input.files` when some changes
    /// could not be staged.
    pub async fn generate(
        &self,
        input: &PromptInput<'_>,
        changed_count: usize,
    ) -> GeneratedMessage {
        let prompt = build_prompt(input);
        debug!(prompt_len = prompt.len(), "Requesting commit message");

        let fallback = || GeneratedMessage {
            text: fallback_message(changed_count),
            source: MessageSource::Fallback,
        };

        match self.generator.generate(&prompt).await {
            Ok(raw) => {
                let text = clean_response(&raw);
                if text.is_empty() {
                    warn!("Generated message was empty after cleanup, using fallback");
                    return fallback();
                }
                GeneratedMessage {
                    text,
                    source: MessageSource::Generated,
                }
            }
            Err(e) => {
                warn!("Message generation failed: {}", e);
                fallback()
            }
        }
    }
}

/// Trim a model response and strip surrounding code fences and quotes.
pub fn clean_response(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string line, e.g. ```text
        let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        text = rest.strip_suffix("```").unwrap_or(rest).trim();
    }

    loop {
        let stripped = ['"', '\'', '`'].iter().find_map(|q| {
            text.strip_prefix(*q)
                .and_then(|t| t.strip_suffix(*q))
                .map(str::trim)
        });
        match stripped {
            Some(inner) => text = inner,
            None => break,
        }
    }

    text.to_string()
}
