//! Project metadata and method datasets.
//!
//! Releases and tickets come from the issue tracker. They are read here from
//! JSON exports, one file per project key.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::model::{order_releases, FixVersion, MethodRecord, Release, ReleaseEntry, Ticket};

/// Releases and bug tickets of one project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Project key, e.g. `AVRO`.
    pub project: String,
    #[serde(default)]
    pub releases: Vec<ReleaseEntry>,
    #[serde(default)]
    pub tickets: Vec<TicketEntry>,
}

/// A bug ticket as exported from the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketEntry {
    pub id: String,
    /// Creation (opening) date.
    pub created: NaiveDate,
    #[serde(default)]
    pub fix_versions: Vec<FixVersion>,
    #[serde(default)]
    pub affected_versions: Vec<String>,
}

impl ProjectMetadata {
    /// Read metadata from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let metadata: Self = serde_json::from_str(&content)?;
        tracing::debug!(
            project = %metadata.project,
            releases = metadata.releases.len(),
            tickets = metadata.tickets.len(),
            "loaded project metadata from {}",
            path.display()
        );
        Ok(metadata)
    }

    /// Split into chronologically ordered releases and a ticket map keyed by id.
    ///
    /// Tickets keep only their earliest fix version. Duplicate ids merge
    /// their affected versions into the first occurrence.
    pub fn into_parts(self) -> (Vec<Release>, BTreeMap<String, Ticket>) {
        let releases = order_releases(self.releases);

        let mut tickets: BTreeMap<String, Ticket> = BTreeMap::new();
        for entry in self.tickets {
            match tickets.get_mut(&entry.id) {
                Some(existing) => {
                    for av in entry.affected_versions {
                        existing.add_affected_version(av);
                    }
                }
                None => {
                    let ticket =
                        Ticket::from_fix_versions(entry.id.clone(), entry.created, entry.fix_versions)
                            .with_affected_versions(entry.affected_versions);
                    tickets.insert(entry.id, ticket);
                }
            }
        }

        (releases, tickets)
    }
}

/// Provider of project metadata by project key.
pub trait ProjectSource: Send + Sync {
    fn load(&self, project: &str) -> Result<ProjectMetadata>;
}

/// Reads `<dir>/<KEY>.json`.
#[derive(Debug, Clone)]
pub struct JsonProjectSource {
    dir: PathBuf,
}

impl JsonProjectSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ProjectSource for JsonProjectSource {
    fn load(&self, project: &str) -> Result<ProjectMetadata> {
        let path = self.dir.join(format!("{project}.json"));
        if !path.exists() {
            return Err(Error::unavailable(format!(
                "metadata for {project} ({})",
                path.display()
            )));
        }
        ProjectMetadata::from_file(path)
    }
}

/// Load a method dataset (JSON array of method records).
pub fn load_methods(path: impl AsRef<Path>) -> Result<Vec<MethodRecord>> {
    let content = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a method dataset, preserving record order.
pub fn write_methods(path: impl AsRef<Path>, methods: &[MethodRecord]) -> Result<()> {
    let content = serde_json::to_string_pretty(methods)?;
    fs::write(path.as_ref(), content)?;
    Ok(())
}
