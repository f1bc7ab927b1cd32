//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use git2::{Repository, Signature};

use worklog::config::{CommitTarget, Config, TrackingMode};
use worklog::driver::Session;
use worklog::error::GenerationError;
use worklog::message::{MessageGenerator, TextGenerator};
use worklog::vcs::GitRepository;

/// Regex for a journal commit message: `<RFC 3339 millis UTC> - <text>`.
pub const JOURNAL_MESSAGE_PATTERN: &str =
    r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z - .+$";

/// A workspace directory in a temp dir, with a canonical root path.
pub struct TestWorkspace {
    pub dir: tempfile::TempDir,
    pub root: PathBuf,
}

impl TestWorkspace {
    /// Create an empty workspace (not a git repository).
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let root = dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp directory");
        Self { dir, root }
    }

    /// Create a workspace that is also a git repository.
    pub fn with_repo() -> Self {
        let workspace = Self::new();
        Repository::init(&workspace.root).expect("Failed to init git repo");
        workspace
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write a file, creating parent directories. Returns its absolute path.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn remove(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        std::fs::remove_file(&path).expect("Failed to remove file");
        path
    }

    /// Commit everything in the workspace repository (outside of worklog).
    pub fn commit_all(&self, message: &str) {
        let repo = Repository::open(&self.root).expect("Failed to open repo");
        let mut index = repo.index().expect("Failed to get index");
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .expect("Failed to add files");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = repo.find_tree(tree_id).expect("Failed to find tree");
        let sig = Signature::now("Test User", "test@example.com").expect("signature");
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit");
    }

    pub fn shadow_root(&self) -> PathBuf {
        self.root.join(".code-tracking")
    }

    /// Messages of all commits in `repo_root`, newest first.
    pub fn messages_in(repo_root: &Path) -> Vec<String> {
        let Ok(repo) = Repository::open(repo_root) else {
            return Vec::new();
        };
        let Ok(mut revwalk) = repo.revwalk() else {
            return Vec::new();
        };
        if revwalk.push_head().is_err() {
            return Vec::new();
        }
        revwalk
            .set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)
            .expect("Failed to sort revwalk");
        revwalk
            .map(|oid| {
                let commit = repo.find_commit(oid.expect("oid")).expect("commit");
                commit.message().unwrap_or("").to_string()
            })
            .collect()
    }

    /// Journal commit messages in the shadow repository, newest first.
    pub fn shadow_messages(&self) -> Vec<String> {
        Self::messages_in(&self.shadow_root())
    }

    /// Paths in the HEAD tree of `repo_root`.
    pub fn head_files(repo_root: &Path) -> Vec<String> {
        let repo = Repository::open(repo_root).expect("Failed to open repo");
        let tree = repo
            .head()
            .expect("head")
            .peel_to_tree()
            .expect("tree");
        let mut files = Vec::new();
        tree.walk(git2::TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(git2::ObjectType::Blob) {
                files.push(format!("{}{}", dir, entry.name().unwrap_or("")));
            }
            git2::TreeWalkResult::Ok
        })
        .expect("Failed to walk tree");
        files.sort();
        files
    }
}

/// Scripted text generator. Replies are consumed in order; once exhausted
/// every call fails with `EmptyResponse`. Every prompt is recorded.
#[derive(Clone, Default)]
pub struct FakeGenerator {
    replies: Arc<Mutex<VecDeque<Result<String, GenerationError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeGenerator {
    pub fn replying(replies: &[&str]) -> Self {
        let fake = Self::default();
        {
            let mut queue = fake.replies.lock().expect("lock");
            for reply in replies {
                queue.push_back(Ok(reply.to_string()));
            }
        }
        fake
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn push_error(&self, error: GenerationError) {
        self.replies.lock().expect("lock").push_back(Err(error));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        self.replies
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyResponse))
    }
}

/// Default configuration with the given modes.
pub fn config(tracking: TrackingMode, target: CommitTarget) -> Config {
    Config {
        tracking,
        target,
        ..Config::default()
    }
}

/// Open a session for `workspace` with a fake generator.
pub fn open_session(
    workspace: &TestWorkspace,
    config: &Config,
    fake: &FakeGenerator,
) -> Session<GitRepository, FakeGenerator> {
    open_session_at(&workspace.root, config, fake)
}

/// Open a session rooted at `root`, which may be a subdirectory of a repository.
pub fn open_session_at(
    root: &Path,
    config: &Config,
    fake: &FakeGenerator,
) -> Session<GitRepository, FakeGenerator> {
    let generator = Arc::new(MessageGenerator::new(fake.clone()));
    Session::open(root, config, generator).expect("Failed to open session")
}
