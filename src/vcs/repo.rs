//! git2-backed repository used for journaling commits.

use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use git2::{Commit, ErrorCode, Repository, Signature, Sort};
use tracing::{debug, info, warn};

use crate::error::GitError;

use super::{DiffMap, JournalEntry, Vcs, diff};

const FALLBACK_NAME: &str = "worklog";
const FALLBACK_EMAIL: &str = "worklog@localhost";

pub struct GitRepository {
    repo: Repository,
    workdir: PathBuf,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("workdir", &self.workdir)
            .finish()
    }
}

impl GitRepository {
    /// Open the repository containing `path`, searching parent directories.
    pub fn discover(path: &Path) -> Result<Self, GitError> {
        let repo = Repository::discover(path).map_err(|source| GitError::OpenRepository {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_repo(repo, path)
    }

    /// Open the repository rooted exactly at `path`, creating it if absent.
    pub fn open_or_init(path: &Path) -> Result<Self, GitError> {
        let repo = match Repository::open(path) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                info!("Initializing journal repository at {}", path.display());
                Repository::init(path).map_err(|source| GitError::InitRepository {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(source) => {
                return Err(GitError::OpenRepository {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_repo(repo, path)
    }

    fn from_repo(repo: Repository, path: &Path) -> Result<Self, GitError> {
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::BareRepository(path.to_path_buf()))?;
        // Canonical so it can be compared with watcher paths
        let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
        Ok(Self { repo, workdir })
    }

    fn head_commit(&self) -> Result<Option<Commit<'_>>, GitError> {
        match self.repo.head() {
            Ok(head) => head.peel_to_commit().map(Some).map_err(GitError::CommitFailed),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(GitError::CommitFailed(e)),
        }
    }

    /// Signature from git config, or a fixed identity when none is configured.
    fn signature(&self) -> Result<Signature<'static>, GitError> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(e) => {
                debug!("No git identity configured ({}), using {}", e, FALLBACK_NAME);
                Signature::now(FALLBACK_NAME, FALLBACK_EMAIL).map_err(GitError::CommitFailed)
            }
        }
    }
}

impl Vcs for GitRepository {
    fn workdir(&self) -> PathBuf {
        self.workdir.clone()
    }

    fn stage(&mut self, paths: &[String]) -> Result<(), GitError> {
        let mut index = self.repo.index().map_err(GitError::StagingFailed)?;

        for path in paths {
            let relative = Path::new(path);
            if self.workdir.join(relative).is_file() {
                if let Err(e) = index.add_path(relative) {
                    warn!("Could not stage {}: {}", path, e);
                }
            } else {
                index
                    .remove_path(relative)
                    .map_err(GitError::StagingFailed)?;
                // A deleted directory leaves entries beneath it
                index
                    .remove_dir(relative, 0)
                    .map_err(GitError::StagingFailed)?;
            }
        }

        index.write().map_err(GitError::StagingFailed)
    }

    fn has_staged_changes(&self) -> Result<bool, GitError> {
        let mut index = self.repo.index().map_err(GitError::StagingFailed)?;
        let tree_id = index.write_tree().map_err(GitError::StagingFailed)?;
        match self.head_commit()? {
            Some(head) => Ok(head.tree_id() != tree_id),
            None => {
                let tree = self.repo.find_tree(tree_id).map_err(GitError::CommitFailed)?;
                Ok(!tree.is_empty())
            }
        }
    }

    fn staged_diff(&self) -> Result<DiffMap, GitError> {
        diff::staged_diff(&self.repo)
    }

    fn commit(&mut self, message: &str) -> Result<String, GitError> {
        let mut index = self.repo.index().map_err(GitError::StagingFailed)?;
        let tree_id = index.write_tree().map_err(GitError::StagingFailed)?;
        let tree = self.repo.find_tree(tree_id).map_err(GitError::CommitFailed)?;

        let parent = self.head_commit()?;
        match &parent {
            Some(parent) if parent.tree_id() == tree_id => return Err(GitError::NothingToCommit),
            None if tree.is_empty() => return Err(GitError::NothingToCommit),
            _ => {}
        }

        let sig = self.signature()?;
        let parents: Vec<&Commit> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .map_err(GitError::CommitFailed)?;

        Ok(oid.to_string())
    }

    fn last_message(&self) -> Result<Option<String>, GitError> {
        Ok(self
            .head_commit()?
            .and_then(|c| c.message().map(|m| m.trim().to_string())))
    }

    fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>, GitError> {
        if self.head_commit()?.is_none() {
            return Ok(Vec::new());
        }

        let mut revwalk = self.repo.revwalk().map_err(GitError::RevwalkError)?;
        revwalk.push_head().map_err(GitError::RevwalkError)?;
        revwalk
            .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .map_err(GitError::RevwalkError)?;

        let mut entries = Vec::new();
        for oid in revwalk.take(limit) {
            let oid = oid.map_err(GitError::RevwalkError)?;
            let commit = self.repo.find_commit(oid).map_err(GitError::RevwalkError)?;
            let time = Utc
                .timestamp_opt(commit.time().seconds(), 0)
                .single()
                .unwrap_or_else(Utc::now);
            entries.push(JournalEntry {
                id: oid.to_string(),
                time,
                message: commit.message().unwrap_or("").trim().to_string(),
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() -> (tempfile::TempDir, GitRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = GitRepository::open_or_init(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_open_or_init_creates_repository() {
        let dir = tempfile::tempdir().unwrap();
        let shadow = dir.path().join(".code-tracking");
        std::fs::create_dir_all(&shadow).unwrap();

        GitRepository::open_or_init(&shadow).unwrap();
        assert!(shadow.join(".git").is_dir());

        // Second open reuses it
        GitRepository::open_or_init(&shadow).unwrap();
    }

    #[test]
    fn test_open_or_init_does_not_adopt_parent_repository() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let shadow = dir.path().join("shadow");
        std::fs::create_dir_all(&shadow).unwrap();

        let repo = GitRepository::open_or_init(&shadow).unwrap();
        assert_eq!(repo.workdir(), shadow.canonicalize().unwrap());
    }

    #[test]
    fn test_first_commit_has_no_parent() {
        let (dir, mut repo) = init();
        std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();

        repo.stage(&["a.txt".to_string()]).unwrap();
        let id = repo.commit("first").unwrap();

        let commit = repo
            .repo
            .find_commit(git2::Oid::from_str(&id).unwrap())
            .unwrap();
        assert_eq!(commit.parent_count(), 0);
        assert_eq!(repo.last_message().unwrap().as_deref(), Some("first"));
    }

    #[test]
    fn test_commit_without_changes_is_rejected() {
        let (dir, mut repo) = init();
        std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        repo.stage(&["a.txt".to_string()]).unwrap();
        repo.commit("first").unwrap();

        repo.stage(&["a.txt".to_string()]).unwrap();
        assert!(matches!(repo.commit("again"), Err(GitError::NothingToCommit)));
    }

    #[test]
    fn test_commit_on_empty_index_is_rejected() {
        let (_dir, mut repo) = init();
        assert!(matches!(repo.commit("empty"), Err(GitError::NothingToCommit)));
    }

    #[test]
    fn test_stage_removes_deleted_files() {
        let (dir, mut repo) = init();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), "b\n").unwrap();
        repo.stage(&["a.txt".to_string(), "sub/b.txt".to_string()])
            .unwrap();
        repo.commit("first").unwrap();

        std::fs::remove_file(dir.path().join("a.txt")).unwrap();
        std::fs::remove_dir_all(dir.path().join("sub")).unwrap();
        repo.stage(&["a.txt".to_string(), "sub".to_string()]).unwrap();
        repo.commit("second").unwrap();

        let head = repo.head_commit().unwrap().unwrap();
        assert!(head.tree().unwrap().is_empty());
    }

    #[test]
    fn test_stage_missing_never_tracked_file_is_noop() {
        let (_dir, mut repo) = init();
        repo.stage(&["ghost.txt".to_string()]).unwrap();
        assert!(!repo.has_staged_changes().unwrap());
    }

    #[test]
    fn test_has_staged_changes_tracks_head() {
        let (dir, mut repo) = init();
        std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        repo.stage(&["a.txt".to_string()]).unwrap();
        assert!(repo.has_staged_changes().unwrap());

        repo.commit("first").unwrap();
        assert!(!repo.has_staged_changes().unwrap());

        std::fs::write(dir.path().join("a.txt"), "b\n").unwrap();
        repo.stage(&["a.txt".to_string()]).unwrap();
        assert!(repo.has_staged_changes().unwrap());
    }

    #[test]
    fn test_staged_diff_reflects_stage() {
        let (dir, mut repo) = init();
        std::fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
        repo.stage(&["a.txt".to_string()]).unwrap();

        let diff = repo.staged_diff().unwrap();
        assert!(diff["a.txt"].contains("+hello"));
    }

    #[test]
    fn test_recent_lists_newest_first() {
        let (dir, mut repo) = init();
        for (i, msg) in ["one", "two", "three"].iter().enumerate() {
            std::fs::write(dir.path().join("a.txt"), format!("{i}\n")).unwrap();
            repo.stage(&["a.txt".to_string()]).unwrap();
            repo.commit(msg).unwrap();
        }

        let entries = repo.recent(2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "three");
        assert_eq!(entries[1].message, "two");
        assert_eq!(entries[0].short_id().len(), 7);
    }

    #[test]
    fn test_recent_on_unborn_repository_is_empty() {
        let (_dir, repo) = init();
        assert!(repo.recent(10).unwrap().is_empty());
        assert_eq!(repo.last_message().unwrap(), None);
    }
}
