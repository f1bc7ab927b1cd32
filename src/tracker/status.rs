//! Status-based tracking: ask the workspace repository what changed.

use std::path::{Path, PathBuf};

use git2::{Repository, Status, StatusEntry, StatusOptions};

use crate::error::TrackerError;
use crate::tracker::changes::{ChangeKind, FileChange};
use crate::tracker::rules::IgnoreRules;

/// Query staged, unstaged, untracked, deleted and renamed files.
///
/// The workspace root (`rules.root()`) may be a subdirectory of the
/// repository. Entries outside it are dropped, and the returned paths are
/// relative to the workspace root. Entries matched by `rules` are dropped;
/// git's own `.gitignore` handling already applies.
pub fn status_changes(
    repo: &Repository,
    rules: &IgnoreRules,
) -> Result<Vec<FileChange>, TrackerError> {
    let workdir = repo.workdir().ok_or_else(|| {
        TrackerError::StatusFailed(git2::Error::from_str("repository has no working directory"))
    })?;
    let workdir = canonical(workdir);
    let root = canonical(rules.root());

    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .renames_head_to_index(true)
        .renames_index_to_workdir(true);

    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(TrackerError::StatusFailed)?;

    let mut changes = Vec::new();
    for entry in statuses.iter() {
        // Nested repositories show up as a single directory entry
        if entry.path().is_some_and(|p| p.ends_with('/')) {
            continue;
        }
        let Some(change) = classify_entry(&entry) else {
            continue;
        };
        let Some(path) = workspace_relative(&workdir, &root, &change.path) else {
            continue;
        };
        if rules.is_ignored(&path, false) {
            continue;
        }
        let kind = match change.kind {
            // A rename from outside the workspace is an addition inside it
            ChangeKind::Renamed { from } => match workspace_relative(&workdir, &root, &from) {
                Some(from) => ChangeKind::Renamed { from },
                None => ChangeKind::Added,
            },
            kind => kind,
        };
        changes.push(FileChange { path, kind });
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes.dedup_by(|a, b| a.path == b.path);
    Ok(changes)
}

/// Open the repository containing `root` and list the changes under `root`
/// as absolute paths.
///
/// Renames contribute both the new and the old path so the old one is
/// removed from the journal.
pub fn changed_paths(root: &Path, rules: &IgnoreRules) -> Result<Vec<PathBuf>, TrackerError> {
    let repo = Repository::discover(root).map_err(TrackerError::StatusFailed)?;
    let changes = status_changes(&repo, rules)?;

    let mut paths = Vec::with_capacity(changes.len());
    for change in changes {
        if let ChangeKind::Renamed { from } = &change.kind
            && !rules.is_ignored(from, false)
        {
            paths.push(root.join(from));
        }
        paths.push(root.join(&change.path));
    }
    Ok(paths)
}

/// Map a workdir-relative status path to a workspace-relative one.
fn workspace_relative(workdir: &Path, root: &Path, path: &Path) -> Option<PathBuf> {
    workdir
        .join(path)
        .strip_prefix(root)
        .ok()
        .map(Path::to_path_buf)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn classify_entry(entry: &StatusEntry<'_>) -> Option<FileChange> {
    let status = entry.status();

    if status.intersects(Status::INDEX_RENAMED | Status::WT_RENAMED) {
        let delta = if status.contains(Status::WT_RENAMED) {
            entry.index_to_workdir()
        } else {
            entry.head_to_index()
        }?;
        let new_path = delta.new_file().path()?.to_path_buf();
        let old_path = delta.old_file().path()?.to_path_buf();
        return Some(FileChange {
            path: new_path,
            kind: ChangeKind::Renamed { from: old_path },
        });
    }

    let kind = if status.intersects(Status::INDEX_DELETED | Status::WT_DELETED) {
        ChangeKind::Deleted
    } else if status.intersects(Status::INDEX_NEW | Status::WT_NEW) {
        ChangeKind::Added
    } else if status.intersects(
        Status::INDEX_MODIFIED
            | Status::WT_MODIFIED
            | Status::INDEX_TYPECHANGE
            | Status::WT_TYPECHANGE
            | Status::CONFLICTED,
    ) {
        ChangeKind::Modified
    } else {
        return None;
    };

    let path = PathBuf::from(entry.path()?);
    Some(FileChange { path, kind })
}
