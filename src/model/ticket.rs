//! Issue-tracker tickets.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A fix version: release name and release date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixVersion {
    pub name: String,
    pub date: NaiveDate,
}

impl FixVersion {
    pub fn new(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            date,
        }
    }

    /// Pick the earliest-dated fix version; the first one wins on ties.
    pub fn earliest(candidates: impl IntoIterator<Item = FixVersion>) -> Option<FixVersion> {
        candidates.into_iter().fold(None, |best, fv| match best {
            Some(b) if b.date <= fv.date => Some(b),
            _ => Some(fv),
        })
    }
}

/// A bug ticket.
///
/// Affected versions, fixed files and linked commits only ever grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub id: String,
    pub opening_date: NaiveDate,
    pub fix_version: Option<FixVersion>,
    affected_versions: Vec<String>,
    fixed_files: BTreeSet<String>,
    commit_ids: Vec<String>,
    /// Set when the ticket enters the proportion working set.
    ///
    /// Holds the opening date, not an injected release; see
    /// `injected_version_name` for the estimated release.
    pub injected_version: Option<NaiveDate>,
    /// Release name produced by injected-version estimation.
    pub injected_version_name: Option<String>,
}

impl Ticket {
    pub fn new(id: impl Into<String>, opening_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            opening_date,
            fix_version: None,
            affected_versions: Vec::new(),
            fixed_files: BTreeSet::new(),
            commit_ids: Vec::new(),
            injected_version: None,
            injected_version_name: None,
        }
    }

    /// Build a ticket from every fix version the tracker lists, keeping the earliest.
    pub fn from_fix_versions(
        id: impl Into<String>,
        opening_date: NaiveDate,
        fix_versions: impl IntoIterator<Item = FixVersion>,
    ) -> Self {
        let mut ticket = Self::new(id, opening_date);
        ticket.fix_version = FixVersion::earliest(fix_versions);
        ticket
    }

    pub fn with_fix_version(mut self, fix_version: FixVersion) -> Self {
        self.fix_version = Some(fix_version);
        self
    }

    pub fn with_affected_versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for v in versions {
            self.add_affected_version(v);
        }
        self
    }

    pub fn fix_version_name(&self) -> Option<&str> {
        self.fix_version.as_ref().map(|fv| fv.name.as_str())
    }

    pub fn fix_date(&self) -> Option<NaiveDate> {
        self.fix_version.as_ref().map(|fv| fv.date)
    }

    pub fn affected_versions(&self) -> &[String] {
        &self.affected_versions
    }

    pub fn has_affected_versions(&self) -> bool {
        !self.affected_versions.is_empty()
    }

    /// Returns `false` if the version was already present.
    pub fn add_affected_version(&mut self, version: impl Into<String>) -> bool {
        let version = version.into();
        if self.affected_versions.contains(&version) {
            return false;
        }
        self.affected_versions.push(version);
        true
    }

    pub fn fixed_files(&self) -> &BTreeSet<String> {
        &self.fixed_files
    }

    pub fn add_fixed_file(&mut self, path: impl Into<String>) -> bool {
        self.fixed_files.insert(path.into())
    }

    pub fn commit_ids(&self) -> &[String] {
        &self.commit_ids
    }

    pub fn is_linked(&self, sha: &str) -> bool {
        self.commit_ids.iter().any(|c| c == sha)
    }

    /// Returns `false` if the commit was already linked.
    pub fn add_commit_id(&mut self, sha: impl Into<String>) -> bool {
        let sha = sha.into();
        if self.is_linked(&sha) {
            return false;
        }
        self.commit_ids.push(sha);
        true
    }
}
