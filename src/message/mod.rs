//! Commit message generation.

pub mod gemini;
pub mod generator;
pub mod prompt;
pub mod sanitize;

pub use gemini::GeminiClient;
pub use generator::{
    GeneratedMessage, MessageGenerator, MessageSource, TextGenerator, clean_response,
    fallback_message,
};
pub use prompt::{PromptInput, build_prompt, strip_timestamp_prefix};
pub use sanitize::sanitize_diff;
