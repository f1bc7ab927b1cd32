//! One-shot rescan of a workspace against its shadow copy.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::warn;

use crate::tracker::rules::IgnoreRules;

/// List workspace files whose shadow copy is missing, stale, or orphaned.
///
/// Walks the workspace with `rules` applied and compares every file byte for
/// byte with `<shadow_root>/<relative path>`. Files present only in the
/// shadow copy are reported at their (now missing) workspace path so the
/// next cycle removes them. Unreadable entries are logged and skipped.
pub fn rescan(root: &Path, shadow_root: &Path, rules: &IgnoreRules) -> Vec<PathBuf> {
    let mut changed = Vec::new();

    for path in walk_files(root, rules) {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if differs(&path, &shadow_root.join(relative)) {
            changed.push(path);
        }
    }

    if shadow_root.is_dir() {
        for shadow_path in walk_shadow(shadow_root) {
            let Ok(relative) = shadow_path.strip_prefix(shadow_root) else {
                continue;
            };
            let workspace_path = root.join(relative);
            if !workspace_path.exists() && !rules.is_ignored(&workspace_path, false) {
                changed.push(workspace_path);
            }
        }
    }

    changed.sort();
    changed.dedup();
    changed
}

fn walk_files(root: &Path, rules: &IgnoreRules) -> Vec<PathBuf> {
    let filter_rules = rules.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !filter_rules.is_ignored(entry.path(), is_dir)
        })
        .build();

    collect_files(walker)
}

fn walk_shadow(shadow_root: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(shadow_root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(|entry| entry.file_name() != OsStr::new(".git"))
        .build();

    collect_files(walker)
}

fn collect_files(walker: ignore::Walk) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for result in walker {
        match result {
            Ok(entry) => {
                if entry.file_type().is_some_and(|t| t.is_file()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => warn!("Skipping unreadable entry during rescan: {}", e),
        }
    }
    files
}

fn differs(workspace_file: &Path, shadow_file: &Path) -> bool {
    match (fs::metadata(workspace_file), fs::metadata(shadow_file)) {
        (Ok(current), Ok(copy)) if current.len() != copy.len() => true,
        (Ok(_), Ok(_)) => match (fs::read(workspace_file), fs::read(shadow_file)) {
            (Ok(a), Ok(b)) => a != b,
            _ => true,
        },
        _ => true,
    }
}
