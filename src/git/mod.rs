//! Git access for ticket linking and touch analysis.
//!
//! The labeling engine talks to repositories through [`CommitSource`] only.
//! [`GitRepo`] implements it on top of gix (history, commit lookup) and the
//! `git` CLI (line-level diffs).

mod log;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use gix::Repository;
use parking_lot::Mutex;

use crate::core::{Error, Result};

pub use log::{parse_unified_diff, CommitInfo, EditRange, FileEdits};

/// Repository collaborator used by the linker, touch analyzer and labeler.
pub trait CommitSource {
    /// Resolve a commit hash.
    fn resolve_commit(&self, hash: &str) -> Result<CommitInfo>;

    /// Commits whose message contains `needle` (case-sensitive), in history order.
    fn commits_with_message(&self, needle: &str) -> Result<Vec<CommitInfo>>;

    /// Commits whose author date lies in `[from, to]`.
    fn commits_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CommitInfo>>;

    /// Diff of `commit` against its first parent, renames detected.
    ///
    /// Root commits yield no entries.
    fn file_edits(&self, commit: &CommitInfo) -> Result<Vec<FileEdits>>;

    /// New-side paths touched by `commit`. Deleted files are not included.
    fn touched_files(&self, commit: &CommitInfo) -> Result<BTreeSet<String>> {
        Ok(self
            .file_edits(commit)?
            .into_iter()
            .map(|f| f.path)
            .collect())
    }
}

/// Commits reachable from HEAD plus a sha lookup into them.
#[derive(Clone)]
struct History {
    commits: Arc<Vec<CommitInfo>>,
    by_sha: Arc<HashMap<String, usize>>,
}

impl History {
    fn new(commits: Vec<CommitInfo>) -> Self {
        let by_sha = commits
            .iter()
            .enumerate()
            .map(|(i, c)| (c.sha.clone(), i))
            .collect();
        Self {
            commits: Arc::new(commits),
            by_sha: Arc::new(by_sha),
        }
    }

    fn get(&self, sha: &str) -> Option<&CommitInfo> {
        self.by_sha.get(sha).map(|&i| &self.commits[i])
    }
}

/// Git repository wrapper with memoized history and diffs.
///
/// One instance per cloned project. The caches are behind locks so the
/// handle can be shared by reference, but diff computation against one
/// clone is serialized.
pub struct GitRepo {
    /// The gix repository handle.
    repo: Repository,
    /// Directory passed to `git -C`.
    root: PathBuf,
    history: Mutex<Option<History>>,
    diffs: Mutex<HashMap<String, Arc<Vec<FileEdits>>>>,
}

impl GitRepo {
    /// Open a git repository at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo =
            gix::open(path).map_err(|e| Error::git(format!("Failed to open repository: {e}")))?;
        let root = repo
            .work_dir()
            .unwrap_or_else(|| repo.git_dir())
            .to_path_buf();

        Ok(Self {
            repo,
            root,
            history: Mutex::new(None),
            diffs: Mutex::new(HashMap::new()),
        })
    }

    /// Get the repository root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the HEAD commit SHA.
    pub fn head_sha(&self) -> Result<String> {
        let head = self
            .repo
            .head_id()
            .map_err(|e| Error::git(format!("Failed to get HEAD: {e}")))?;
        Ok(head.to_string())
    }

    /// All commits reachable from HEAD, newest first. Loaded once.
    pub fn history(&self) -> Result<Arc<Vec<CommitInfo>>> {
        Ok(self.load_history()?.commits)
    }

    fn load_history(&self) -> Result<History> {
        let mut cached = self.history.lock();
        if let Some(history) = cached.as_ref() {
            return Ok(history.clone());
        }

        let history = History::new(log::walk_history(&self.repo)?);
        tracing::debug!(commits = history.commits.len(), "loaded commit history");
        *cached = Some(history.clone());
        Ok(history)
    }
}

impl CommitSource for GitRepo {
    fn resolve_commit(&self, hash: &str) -> Result<CommitInfo> {
        // Full shas hit the index; abbreviations and refs go through rev-parse
        if let Some(commit) = self.load_history()?.get(hash) {
            return Ok(commit.clone());
        }
        log::find_commit(&self.repo, hash)
    }

    fn commits_with_message(&self, needle: &str) -> Result<Vec<CommitInfo>> {
        Ok(self
            .history()?
            .iter()
            .filter(|c| c.message.contains(needle))
            .cloned()
            .collect())
    }

    fn commits_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CommitInfo>> {
        Ok(self
            .history()?
            .iter()
            .filter(|c| c.author_date().is_some_and(|d| d >= from && d <= to))
            .cloned()
            .collect())
    }

    fn file_edits(&self, commit: &CommitInfo) -> Result<Vec<FileEdits>> {
        let Some(parent) = commit.first_parent() else {
            return Ok(Vec::new());
        };

        let mut diffs = self.diffs.lock();
        if let Some(edits) = diffs.get(&commit.sha) {
            return Ok(edits.as_ref().clone());
        }

        let edits = Arc::new(log::diff_against_parent(&self.root, parent, &commit.sha)?);
        diffs.insert(commit.sha.clone(), Arc::clone(&edits));
        Ok(edits.as_ref().clone())
    }
}
