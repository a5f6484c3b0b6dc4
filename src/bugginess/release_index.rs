//! Dense chronological release indices.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{normalize_version_name, Release};

/// Maps release names to their chronological index and back.
///
/// Names are normalized (`X.Y` to `X.Y.0`) when indexed and on every
/// lookup, so `index("1.2") == index("1.2.0")`.
#[derive(Debug, Clone, Default)]
pub struct ReleaseIndexMapper {
    names: Vec<String>,
    dates: Vec<NaiveDate>,
    by_name: BTreeMap<String, usize>,
}

impl ReleaseIndexMapper {
    /// Build from releases already sorted by date.
    pub fn new(releases: &[Release]) -> Self {
        let mut mapper = Self::default();
        for (index, release) in releases.iter().enumerate() {
            let name = normalize_version_name(&release.name);
            mapper.by_name.insert(name.clone(), index);
            mapper.names.push(name);
            mapper.dates.push(release.date);
        }
        mapper
    }

    pub fn index(&self, name: &str) -> Option<usize> {
        self.by_name.get(&normalize_version_name(name)).copied()
    }

    pub fn release_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of the latest release dated on or before `date`.
    ///
    /// Among releases sharing that date the last one wins.
    pub fn opening_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.iter().rposition(|d| *d <= date)
    }
}
