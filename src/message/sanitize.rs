//! Sanitization of workspace text before it reaches the text generator.

use std::sync::LazyLock;

use regex_lite::Regex;

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b\][^\x07]*\x07").expect("Invalid regex")
});

static INJECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(ignore|disregard|forget)\s+(all\s+)?(the\s+)?(previous|prior|above)\s+(instructions|prompts?|messages?)|you\s+are\s+now\s+|system\s+prompt:",
    )
    .expect("Invalid regex")
});

static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid regex"));

/// Remove control characters except newlines and tabs.
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\x1b')
        .collect()
}

/// Remove ANSI escape sequences, then any stray escape bytes.
pub fn remove_ansi_escapes(text: &str) -> String {
    ANSI_RE.replace_all(text, "").replace('\x1b', "")
}

/// Replace known prompt-injection phrases.
pub fn filter_injection_patterns(text: &str) -> String {
    INJECTION_RE.replace_all(text, "[filtered]").into_owned()
}

/// Trim trailing whitespace per line and collapse runs of blank lines.
pub fn normalize_whitespace(text: &str) -> String {
    let trimmed: String = text
        .replace("\r\n", "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_LINES_RE.replace_all(&trimmed, "\n\n").into_owned()
}

/// Truncate to at most `max_len` bytes on a char boundary.
pub fn truncate(text: &mut String, max_len: usize) {
    if text.len() > max_len {
        let mut end = max_len;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
}

/// Sanitize diff text for inclusion in a prompt.
///
/// Keeps `+`/`-` markers and markdown-looking lines intact; diffs need them.
pub fn sanitize_diff(text: &str, max_len: usize) -> String {
    let mut result = remove_control_chars(text);
    result = remove_ansi_escapes(&result);
    result = filter_injection_patterns(&result);
    result = normalize_whitespace(&result);
    truncate(&mut result, max_len);
    result
}
