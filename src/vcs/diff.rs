//! Per-file diff collection using git2.

use std::collections::BTreeMap;

use git2::{Diff, DiffFormat, ErrorCode, Repository, Tree};
use tracing::warn;

use crate::error::GitError;

/// Maximum characters kept per file.
pub const MAX_FILE_DIFF_LENGTH: usize = 4_000;

/// Maximum characters across all files.
pub const MAX_TOTAL_DIFF_LENGTH: usize = 30_000;

/// Repository-relative path → unified diff text.
pub type DiffMap = BTreeMap<String, String>;

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found),
/// `Ok(Some(tree))` for repos with a valid HEAD, or `Err(GitError::DiffFailed)`
/// for real errors (corrupt HEAD, permission issues, missing objects).
pub fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, GitError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(GitError::DiffFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(GitError::DiffFailed)?;
    Ok(Some(tree))
}

/// Diff between HEAD and the index, split per file.
pub fn staged_diff(repo: &Repository) -> Result<DiffMap, GitError> {
    let head_tree = resolve_head_tree(repo)?;
    let diff = repo
        .diff_tree_to_index(head_tree.as_ref(), None, None)
        .map_err(GitError::DiffFailed)?;
    Ok(split_by_file(&diff))
}

/// Split a diff into one patch text per file, respecting the length limits.
///
/// Files that would push the total over [`MAX_TOTAL_DIFF_LENGTH`] are kept
/// with a placeholder so the prompt still names them.
fn split_by_file(diff: &Diff<'_>) -> DiffMap {
    let mut map: DiffMap = BTreeMap::new();
    let mut total = 0usize;

    let result = diff.print(DiffFormat::Patch, |delta, _hunk, line| {
        let Some(path) = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().replace('\\', "/"))
        else {
            return true;
        };

        let text = map.entry(path).or_default();
        if text.len() >= MAX_FILE_DIFF_LENGTH || total >= MAX_TOTAL_DIFF_LENGTH {
            return true;
        }

        let content = std::str::from_utf8(line.content()).unwrap_or("");
        let origin = line.origin();
        let mut rendered = String::with_capacity(content.len() + 1);
        if origin == '+' || origin == '-' || origin == ' ' {
            rendered.push(origin);
        }
        rendered.push_str(content);

        let room = (MAX_FILE_DIFF_LENGTH - text.len()).min(MAX_TOTAL_DIFF_LENGTH - total);
        if rendered.len() > room {
            let mut end = room;
            while end > 0 && !rendered.is_char_boundary(end) {
                end -= 1;
            }
            rendered.truncate(end);
            rendered.push_str("\n[... truncated]\n");
        }

        total += rendered.len();
        text.push_str(&rendered);
        true
    });

    if let Err(e) = result {
        warn!("Failed to collect diff text: {e}");
    }

    // Binary files, pure renames and files past the budget have no text
    for delta in diff.deltas() {
        if let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) {
            let key = path.to_string_lossy().replace('\\', "/");
            let text = map.entry(key).or_default();
            if text.is_empty() {
                text.push_str("[no textual diff]");
            }
        }
    }

    map
}
