//! Releases and version-name normalization.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A release as delivered by the issue tracker: a name and a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    pub name: String,
    pub date: NaiveDate,
}

impl ReleaseEntry {
    pub fn new(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            date,
        }
    }
}

/// A release with its dense chronological index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Normalized `X.Y.Z` name.
    pub name: String,
    pub date: NaiveDate,
    /// Chronological rank, starting at 0.
    pub index: usize,
}

/// Rewrite a two-component version `X.Y` to `X.Y.0`.
///
/// Every other name is returned unchanged.
pub fn normalize_version_name(name: &str) -> String {
    static TWO_COMPONENTS: OnceLock<Regex> = OnceLock::new();
    let re = TWO_COMPONENTS.get_or_init(|| Regex::new(r"^\d+\.\d+$").expect("valid regex"));

    if re.is_match(name) {
        format!("{name}.0")
    } else {
        name.to_string()
    }
}

/// Order releases by date and assign indices.
///
/// The sort is stable, so releases sharing a date keep their input order.
pub fn order_releases(entries: Vec<ReleaseEntry>) -> Vec<Release> {
    let mut entries = entries;
    entries.sort_by_key(|e| e.date);

    entries
        .into_iter()
        .enumerate()
        .map(|(index, e)| Release {
            name: normalize_version_name(&e.name),
            date: e.date,
            index,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_two_components() {
        assert_eq!(normalize_version_name("1.2"), "1.2.0");
        assert_eq!(normalize_version_name("10.20"), "10.20.0");
    }

    #[test]
    fn test_normalize_leaves_others() {
        assert_eq!(normalize_version_name("1.2.3"), "1.2.3");
        assert_eq!(normalize_version_name("1"), "1");
        assert_eq!(normalize_version_name("1.2-beta"), "1.2-beta");
        assert_eq!(normalize_version_name(""), "");
    }

    #[test]
    fn test_order_releases_by_date() {
        let releases = order_releases(vec![
            ReleaseEntry::new("1.2.0", date(2020, 6, 1)),
            ReleaseEntry::new("1.0", date(2020, 1, 1)),
            ReleaseEntry::new("1.1.0", date(2020, 3, 1)),
        ]);

        let names: Vec<_> = releases.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["1.0.0", "1.1.0", "1.2.0"]);
        let indices: Vec<_> = releases.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_order_releases_ties_keep_input_order() {
        let releases = order_releases(vec![
            ReleaseEntry::new("2.0.0", date(2021, 1, 1)),
            ReleaseEntry::new("1.9.9", date(2021, 1, 1)),
        ]);
        assert_eq!(releases[0].name, "2.0.0");
        assert_eq!(releases[1].name, "1.9.9");
    }
}
