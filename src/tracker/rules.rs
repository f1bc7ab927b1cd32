//! Ignore rules: built-in defaults, the project's `.gitignore`, and extras.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, warn};

use crate::error::TrackerError;

/// Patterns that are never journaled, in gitignore syntax.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".git/",
    "node_modules/",
    "__pycache__/",
    "venv/",
    "env/",
    "dist/",
    "build/",
    "target/",
    ".vs/",
    ".vscode/",
    ".idea/",
    "*.log",
    ".DS_Store",
    "coverage/",
    "tmp/",
    "temp/",
    ".next/",
    ".cache/",
    "*.pyc",
    "*.pyo",
    "*.pyd",
    "*.so",
    "*.dll",
    "*.dylib",
    "bin/",
    "obj/",
];

/// Compiled ignore matcher for one workspace root.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    root: PathBuf,
    matcher: Gitignore,
}

impl IgnoreRules {
    /// Build the matcher for `root`.
    ///
    /// `shadow_dir` is anchored at the root so a nested shadow repository is
    /// never reported as a workspace change. Problems in `.gitignore` are
    /// logged and the valid lines are kept; invalid `extra` patterns are errors.
    pub fn new(
        root: &Path,
        shadow_dir: Option<&str>,
        extra: &[String],
    ) -> Result<Self, TrackerError> {
        let mut builder = GitignoreBuilder::new(root);

        for pattern in DEFAULT_IGNORES {
            add_pattern(&mut builder, pattern)?;
        }

        if let Some(dir) = shadow_dir {
            let dir = dir.trim_matches('/');
            if !dir.is_empty() {
                add_pattern(&mut builder, &format!("/{dir}/"))?;
            }
        }

        let gitignore = root.join(".gitignore");
        if gitignore.is_file() {
            if let Some(e) = builder.add(&gitignore) {
                warn!("Problem reading {}: {}", gitignore.display(), e);
            } else {
                debug!("Merged ignore rules from {}", gitignore.display());
            }
        }

        for pattern in extra {
            add_pattern(&mut builder, pattern)?;
        }

        let matcher = builder
            .build()
            .map_err(|source| TrackerError::InvalidPattern {
                pattern: gitignore.display().to_string(),
                source,
            })?;

        Ok(Self {
            root: root.to_path_buf(),
            matcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` (absolute, or relative to the root) should be ignored.
    ///
    /// Absolute paths outside the root are always ignored.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.root) {
                Ok(relative) => relative,
                Err(_) => return true,
            }
        } else {
            path
        };

        if relative.as_os_str().is_empty() {
            return false;
        }

        self.matcher
            .matched_path_or_any_parents(relative, is_dir)
            .is_ignore()
    }
}

fn add_pattern(builder: &mut GitignoreBuilder, pattern: &str) -> Result<(), TrackerError> {
    builder
        .add_line(None, pattern)
        .map_err(|source| TrackerError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
    Ok(())
}
