//! Commit history and line-level diffs.

use std::path::Path;
use std::process::Command;

use bstr::ByteSlice;
use chrono::{NaiveDate, TimeZone, Utc};
use gix::Repository;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// A git commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Commit SHA.
    pub sha: String,
    /// Author name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// Author timestamp (seconds since the epoch).
    pub timestamp: i64,
    /// Full commit message.
    pub message: String,
    /// Parent SHAs, first parent first.
    pub parents: Vec<String>,
}

impl CommitInfo {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    /// Author date in UTC.
    pub fn author_date(&self) -> Option<NaiveDate> {
        Utc.timestamp_opt(self.timestamp, 0)
            .single()
            .map(|dt| dt.date_naive())
    }
}

/// An edited block of lines in the new version of a file.
///
/// 0-based and half-open. A pure deletion has `begin == end`, placed where
/// the removed lines used to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRange {
    pub begin: u32,
    pub end: u32,
}

impl EditRange {
    pub fn new(begin: u32, end: u32) -> Self {
        Self { begin, end }
    }

    /// Half-open overlap test against a method span `[start, end)`.
    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        self.end > start && self.begin < end
    }
}

/// Edits of one file in a commit-vs-parent diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEdits {
    /// Path in the new tree.
    pub path: String,
    /// Source path when the file was renamed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub edits: Vec<EditRange>,
}

/// Walk the history reachable from HEAD, newest commit first.
pub fn walk_history(repo: &Repository) -> Result<Vec<CommitInfo>> {
    let head = repo
        .head_id()
        .map_err(|e| Error::git(format!("Failed to get HEAD: {e}")))?
        .detach();

    let walk = repo
        .rev_walk([head])
        .sorting(gix::revision::walk::Sorting::ByCommitTime(
            gix::traverse::commit::simple::CommitTimeOrder::NewestFirst,
        ))
        .all()
        .map_err(|e| Error::git(format!("Failed to start revision walk: {e}")))?;

    let mut commits = Vec::new();
    for info in walk {
        let info = info.map_err(|e| Error::git(format!("Revision walk failed: {e}")))?;
        let commit = repo
            .find_commit(info.id)
            .map_err(|e| Error::git(format!("Failed to read commit {}: {e}", info.id)))?;
        commits.push(to_commit_info(&commit)?);
    }

    Ok(commits)
}

/// Resolve a (possibly abbreviated) hash to a commit.
pub fn find_commit(repo: &Repository, hash: &str) -> Result<CommitInfo> {
    let id = repo
        .rev_parse_single(hash)
        .map_err(|e| Error::git(format!("Cannot resolve commit {hash}: {e}")))?;
    let commit = repo
        .find_commit(id.detach())
        .map_err(|e| Error::git(format!("{hash} is not a commit: {e}")))?;
    to_commit_info(&commit)
}

fn to_commit_info(commit: &gix::Commit<'_>) -> Result<CommitInfo> {
    let author = commit
        .author()
        .map_err(|e| Error::git(format!("Invalid author in {}: {e}", commit.id)))?;
    let message = commit
        .message_raw()
        .map_err(|e| Error::git(format!("Invalid message in {}: {e}", commit.id)))?
        .to_str_lossy()
        .into_owned();

    Ok(CommitInfo {
        sha: commit.id.to_string(),
        author: author.name.to_string(),
        email: author.email.to_string(),
        timestamp: author.seconds(),
        message,
        parents: commit.parent_ids().map(|id| id.to_string()).collect(),
    })
}

/// Diff `commit` against `parent` with rename detection and zero context.
pub fn diff_against_parent(git_dir: &Path, parent: &str, commit: &str) -> Result<Vec<FileEdits>> {
    let output = Command::new("git")
        .arg("-C")
        .arg(git_dir)
        .args([
            "-c",
            "core.quotepath=false",
            "diff",
            "--no-color",
            "--no-ext-diff",
            "--find-renames",
            "--unified=0",
            "--src-prefix=a/",
            "--dst-prefix=b/",
            parent,
            commit,
        ])
        .output()?;

    if !output.status.success() {
        return Err(Error::git(format!(
            "git diff {parent} {commit} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(parse_unified_diff(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `git diff --unified=0` output into per-file edit ranges.
///
/// Deleted files are dropped: they have no new-side path.
pub fn parse_unified_diff(output: &str) -> Vec<FileEdits> {
    let mut files = Vec::new();
    let mut current: Option<PendingFile> = None;

    for line in output.lines() {
        if let Some(header) = line.strip_prefix("diff --git ") {
            if let Some(done) = current.take() {
                files.extend(done.finish());
            }
            current = Some(PendingFile::from_header(header));
            continue;
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if file.in_header {
            if line.starts_with("deleted file mode") {
                file.deleted = true;
            } else if let Some(from) = line.strip_prefix("rename from ") {
                file.old_path = Some(from.to_string());
            } else if let Some(to) = line.strip_prefix("rename to ") {
                file.path = Some(to.to_string());
            } else if let Some(new) = line.strip_prefix("+++ ") {
                // git terminates paths containing spaces with a TAB here
                match new.trim_end_matches('\t').strip_prefix("b/") {
                    Some(path) => file.path = Some(path.to_string()),
                    None => file.deleted = true,
                }
            }
        }

        if line.starts_with("@@") {
            file.in_header = false;
            if let Some(edit) = parse_hunk_header(line) {
                file.edits.push(edit);
            }
        }
    }

    if let Some(done) = current {
        files.extend(done.finish());
    }

    files
}

/// Parse the new-side range of a hunk header `@@ -a,b +c,d @@`.
fn parse_hunk_header(line: &str) -> Option<EditRange> {
    let new_side = line
        .split_whitespace()
        .find(|part| part.starts_with('+'))?
        .trim_start_matches('+');

    let (start, count) = match new_side.split_once(',') {
        Some((s, c)) => (s.parse::<u32>().ok()?, c.parse::<u32>().ok()?),
        None => (new_side.parse::<u32>().ok()?, 1),
    };

    if count == 0 {
        Some(EditRange::new(start, start))
    } else {
        let begin = start.saturating_sub(1);
        Some(EditRange::new(begin, begin + count))
    }
}

struct PendingFile {
    path: Option<String>,
    old_path: Option<String>,
    deleted: bool,
    in_header: bool,
    edits: Vec<EditRange>,
}

impl PendingFile {
    fn from_header(header: &str) -> Self {
        let path = header
            .rfind(" b/")
            .map(|pos| header[pos + 3..].to_string());
        Self {
            path,
            old_path: None,
            deleted: false,
            in_header: true,
            edits: Vec::new(),
        }
    }

    fn finish(self) -> Option<FileEdits> {
        if self.deleted {
            return None;
        }
        Some(FileEdits {
            path: self.path?,
            old_path: self.old_path,
            edits: self.edits,
        })
    }
}
