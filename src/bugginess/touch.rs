//! Which methods a commit touched.

use std::collections::BTreeSet;

use crate::core::Result;
use crate::git::{CommitInfo, CommitSource};
use crate::model::MethodRecord;

/// Matches commit diffs against method line ranges.
pub struct MethodTouchAnalyzer<'a> {
    repo: &'a dyn CommitSource,
}

impl<'a> MethodTouchAnalyzer<'a> {
    pub fn new(repo: &'a dyn CommitSource) -> Self {
        Self { repo }
    }

    /// Indices (into `methods`) of the candidates touched by `commit` in `file`.
    ///
    /// The commit is diffed against its first parent with rename detection.
    /// A method `[start_line, end_line)` is touched when any edit on the new
    /// side of a diff entry for `file` overlaps it. Root commits touch
    /// nothing.
    pub fn touched_methods(
        &self,
        commit: &CommitInfo,
        file: &str,
        methods: &[MethodRecord],
        candidates: &[usize],
    ) -> Result<BTreeSet<usize>> {
        let mut touched = BTreeSet::new();
        if commit.is_root() {
            return Ok(touched);
        }

        for entry in self.repo.file_edits(commit)? {
            if entry.path != file {
                continue;
            }

            for &idx in candidates {
                let Some(method) = methods.get(idx) else {
                    continue;
                };
                if entry
                    .edits
                    .iter()
                    .any(|edit| edit.overlaps(method.start_line, method.end_line))
                {
                    touched.insert(idx);
                }
            }
        }

        Ok(touched)
    }
}
