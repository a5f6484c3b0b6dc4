//! Method records of the dataset being labeled.

use serde::{Deserialize, Serialize};

/// One method of one release.
///
/// `(file, release, start_line, end_line)` identifies the record. The
/// labeling engine only ever flips `buggy` from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    /// Qualified method name, for reporting only.
    #[serde(default)]
    pub name: String,
    pub file: String,
    pub release: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default)]
    buggy: bool,
}

impl MethodRecord {
    pub fn new(
        name: impl Into<String>,
        file: impl Into<String>,
        release: impl Into<String>,
        start_line: u32,
        end_line: u32,
    ) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            release: release.into(),
            start_line,
            end_line,
            buggy: false,
        }
    }

    pub fn is_buggy(&self) -> bool {
        self.buggy
    }

    /// Mark the method buggy. Returns `true` only on the first call.
    pub fn mark_buggy(&mut self) -> bool {
        !std::mem::replace(&mut self.buggy, true)
    }
}
