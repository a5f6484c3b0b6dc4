//! Ticket to fix-commit linking.
//!
//! Commits are linked when their message mentions the ticket id. A second,
//! heuristic pass recovers fix commits that do not mention the id: same
//! author as an already linked commit, authored while the ticket was open,
//! and touching a file the ticket already fixed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::git::{CommitInfo, CommitSource};
use crate::model::Ticket;

/// Which touched files count as fixed files of a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileFilter {
    /// Accepted file extensions, including the dot.
    pub extensions: Vec<String>,
    /// Paths containing any of these fragments are ignored.
    pub exclude_path_fragments: Vec<String>,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            extensions: vec![".java".to_string()],
            exclude_path_fragments: vec!["/test/".to_string(), "/target/".to_string()],
        }
    }
}

impl FileFilter {
    pub fn accepts(&self, path: &str) -> bool {
        self.extensions.iter().any(|ext| path.ends_with(ext.as_str()))
            && !self
                .exclude_path_fragments
                .iter()
                .any(|frag| path.contains(frag.as_str()))
    }
}

/// Counts from one linking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    /// Tickets that gained at least one commit.
    pub tickets: usize,
    /// Newly linked commits (a commit linked to two tickets counts twice).
    pub commits: usize,
    /// Newly added fixed files.
    pub files: usize,
}

impl LinkSummary {
    fn merge(&mut self, other: LinkSummary) {
        self.tickets += other.tickets;
        self.commits += other.commits;
        self.files += other.files;
    }
}

/// Links tickets to commits of one repository.
pub struct CommitLinker<'a> {
    repo: &'a dyn CommitSource,
    filter: FileFilter,
}

impl<'a> CommitLinker<'a> {
    pub fn new(repo: &'a dyn CommitSource, filter: FileFilter) -> Self {
        Self { repo, filter }
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    /// Link every commit whose message contains the ticket id.
    ///
    /// The match is a case-sensitive substring search. Touched files of
    /// each newly linked commit are added to the ticket's fixed files.
    /// Repository errors abort the pass as [`Error::Linkage`].
    pub fn link_commits_to_tickets(
        &self,
        tickets: &mut BTreeMap<String, Ticket>,
    ) -> Result<LinkSummary> {
        let mut summary = LinkSummary::default();

        for (id, ticket) in tickets.iter_mut() {
            let commits = self
                .repo
                .commits_with_message(id)
                .map_err(|e| Error::linkage(format!("searching commits for {id}"), e))?;

            let mut linked = LinkSummary::default();
            for commit in commits {
                linked.merge(self.link(ticket, &commit)?);
            }

            if linked.commits > 0 {
                tracing::debug!(ticket = %id, commits = linked.commits, files = linked.files, "linked by message");
                linked.tickets = 1;
            }
            summary.merge(linked);
        }

        tracing::info!(
            tickets = summary.tickets,
            commits = summary.commits,
            "linked commits by message"
        );
        Ok(summary)
    }

    /// Recover unlinked fix commits.
    ///
    /// For each ticket with a fix date, a commit authored within
    /// `[opening, fix]` (inclusive) is linked when its author wrote one of
    /// the ticket's linked commits and it touches a file already in the
    /// ticket's fixed files. Links are only ever added.
    pub fn apply_missing_commit_linkage_heuristic(
        &self,
        tickets: &mut BTreeMap<String, Ticket>,
    ) -> Result<LinkSummary> {
        let mut summary = LinkSummary::default();

        for (id, ticket) in tickets.iter_mut() {
            let Some(fix_date) = ticket.fix_date() else {
                continue;
            };

            let mut authors = self.linked_authors(ticket);
            if authors.is_empty() {
                continue;
            }

            let candidates = self
                .repo
                .commits_between(ticket.opening_date, fix_date)
                .map_err(|e| Error::linkage(format!("listing commits for {id}"), e))?;

            let mut linked = LinkSummary::default();
            for commit in candidates {
                if ticket.is_linked(&commit.sha) || !authors.contains(&commit.author) {
                    continue;
                }

                let files = self.fixed_files_of(&commit)?;
                if files.iter().any(|f| ticket.fixed_files().contains(f)) {
                    tracing::debug!(ticket = %id, commit = %commit.sha, author = %commit.author, "linked by heuristic");
                    linked.merge(self.link_files(ticket, &commit.sha, files));
                    authors.insert(commit.author);
                }
            }

            if linked.commits > 0 {
                linked.tickets = 1;
            }
            summary.merge(linked);
        }

        tracing::info!(
            tickets = summary.tickets,
            commits = summary.commits,
            "linked commits by heuristic"
        );
        Ok(summary)
    }

    /// Authors of the commits already linked to a ticket.
    ///
    /// Linked hashes that no longer resolve are ignored.
    fn linked_authors(&self, ticket: &Ticket) -> BTreeSet<String> {
        ticket
            .commit_ids()
            .iter()
            .filter_map(|sha| match self.repo.resolve_commit(sha) {
                Ok(commit) => Some(commit.author),
                Err(e) => {
                    tracing::warn!(ticket = %ticket.id, commit = %sha, "cannot resolve linked commit: {e}");
                    None
                }
            })
            .collect()
    }

    fn link(&self, ticket: &mut Ticket, commit: &CommitInfo) -> Result<LinkSummary> {
        if ticket.is_linked(&commit.sha) {
            return Ok(LinkSummary::default());
        }
        let files = self.fixed_files_of(commit)?;
        Ok(self.link_files(ticket, &commit.sha, files))
    }

    fn link_files(&self, ticket: &mut Ticket, sha: &str, files: BTreeSet<String>) -> LinkSummary {
        let mut summary = LinkSummary::default();
        if ticket.add_commit_id(sha) {
            summary.commits = 1;
        }
        for file in files {
            if ticket.add_fixed_file(file) {
                summary.files += 1;
            }
        }
        summary
    }

    fn fixed_files_of(&self, commit: &CommitInfo) -> Result<BTreeSet<String>> {
        let touched = self
            .repo
            .touched_files(commit)
            .map_err(|e| Error::linkage(format!("reading files of {}", commit.sha), e))?;
        Ok(touched
            .into_iter()
            .filter(|path| self.filter.accepts(path))
            .collect())
    }
}
