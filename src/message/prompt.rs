//! Prompt construction for journal commit messages.

use std::path::Path;

use chrono::DateTime;

use super::sanitize::{sanitize_diff, truncate};
use crate::vcs::{DiffMap, MAX_TOTAL_DIFF_LENGTH};

/// Maximum length kept from the previous commit message.
const MAX_PREVIOUS_MESSAGE_LENGTH: usize = 500;

/// What the generator knows about one commit cycle.
#[derive(Debug, Clone, Default)]
pub struct PromptInput<'a> {
    /// Repository-relative paths of the committed files.
    pub files: &'a [String],
    /// Per-file diffs, when diff collection is enabled.
    pub diffs: Option<&'a DiffMap>,
    /// Message of the previous journal commit, timestamp prefix included.
    pub previous_message: Option<&'a str>,
    /// Interval length in minutes.
    pub interval_minutes: u64,
}

/// Build the prompt for one commit cycle.
///
/// Without diffs only file basenames are sent.
pub fn build_prompt(input: &PromptInput<'_>) -> String {
    let changes = match input.diffs {
        Some(diffs) if !diffs.is_empty() => diff_section(diffs),
        _ => files_section(input.files),
    };

    let previous = input
        .previous_message
        .map(strip_timestamp_prefix)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|m| {
            let mut m = sanitize_diff(m, MAX_PREVIOUS_MESSAGE_LENGTH);
            truncate(&mut m, MAX_PREVIOUS_MESSAGE_LENGTH);
            format!("\n## Previous Commit Message\n{m}\n")
        })
        .unwrap_or_default();

    let minutes = input.interval_minutes.max(1);
    let unit = if minutes == 1 { "minute" } else { "minutes" };

    format!(
        r#"You are writing a commit message for a work journal.

## Changes
{changes}
{previous}
## Instructions
Summarize the work done in the last {minutes} {unit} and give the most suitable commit message for it.
Describe the work in the best and shortest way possible. No jargon, no preamble.
Respond with ONLY the commit message."#
    )
}

fn files_section(files: &[String]) -> String {
    files
        .iter()
        .map(|f| {
            let name = Path::new(f)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| f.clone());
            format!("- {name}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn diff_section(diffs: &DiffMap) -> String {
    let mut section = String::new();
    for (path, diff) in diffs {
        section.push_str(&format!("### {path}\n```\n{}\n```\n", diff.trim_end()));
    }
    sanitize_diff(&section, MAX_TOTAL_DIFF_LENGTH)
}

/// Strip a leading `<RFC 3339 timestamp> - ` from a journal message.
pub fn strip_timestamp_prefix(message: &str) -> &str {
    match message.split_once(" - ") {
        Some((stamp, rest)) if DateTime::parse_from_rfc3339(stamp.trim()).is_ok() => rest,
        _ => message,
    }
}
