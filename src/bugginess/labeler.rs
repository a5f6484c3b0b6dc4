//! Method bugginess labeling.
//!
//! For every ticket the buggy releases are computed, restricted to releases
//! present in the method dataset, and each linked fix commit is diffed to
//! find the methods it touched in those releases. Labels only ever go from
//! clean to buggy, so repeated passes are no-ops.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::proportion::{LabelSource, ProportionEstimator, ProportionSource};
use super::touch::MethodTouchAnalyzer;
use crate::core::ProgressTracker;
use crate::git::CommitSource;
use crate::model::{normalize_version_name, MethodRecord, Ticket};

/// Why a ticket did not contribute labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoFixVersion,
    NoCommits,
    /// No affected versions and the injected version could not be estimated,
    /// or the interval is empty.
    NoBuggyReleases,
    /// None of the buggy releases has methods in the dataset.
    NoReleasesInDataset,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoFixVersion => "no fix version",
            Self::NoCommits => "no linked commits",
            Self::NoBuggyReleases => "no buggy releases",
            Self::NoReleasesInDataset => "buggy releases not in dataset",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTicket {
    pub ticket: String,
    pub reason: SkipReason,
}

/// A method flipped to buggy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelEvent {
    pub ticket: String,
    pub commit: String,
    pub method: String,
    pub file: String,
    pub release: String,
    pub source: LabelSource,
}

/// Result of one labeling pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelingReport {
    pub labeled_from_affected_versions: usize,
    pub labeled_from_proportion: usize,
    pub processed_tickets: usize,
    pub skipped: Vec<SkippedTicket>,
    /// Empty unless event recording is enabled.
    pub events: Vec<LabelEvent>,
    pub proportion: f64,
    pub proportion_source: ProportionSource,
    pub valid_tickets: usize,
}

impl LabelingReport {
    /// Methods newly labeled in this pass.
    pub fn labeled(&self) -> usize {
        self.labeled_from_affected_versions + self.labeled_from_proportion
    }
}

/// Method index grouped by file, then normalized release name.
type MethodIndex = BTreeMap<String, BTreeMap<String, Vec<usize>>>;

fn group_methods(methods: &[MethodRecord]) -> MethodIndex {
    let mut index: MethodIndex = BTreeMap::new();
    for (i, m) in methods.iter().enumerate() {
        index
            .entry(m.file.clone())
            .or_default()
            .entry(normalize_version_name(&m.release))
            .or_default()
            .push(i);
    }
    index
}

/// Labels methods touched by the fix commits of bug tickets.
pub struct BugLabeler<'a> {
    repo: &'a dyn CommitSource,
    touch: MethodTouchAnalyzer<'a>,
    progress: Option<ProgressTracker>,
    record_events: bool,
}

impl<'a> BugLabeler<'a> {
    pub fn new(repo: &'a dyn CommitSource) -> Self {
        Self {
            repo,
            touch: MethodTouchAnalyzer::new(repo),
            progress: None,
            record_events: true,
        }
    }

    /// Report per-ticket progress.
    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Keep one [`LabelEvent`] per flipped method in the report.
    pub fn with_events(mut self, record: bool) -> Self {
        self.record_events = record;
        self
    }

    /// Label `methods` from `tickets`.
    ///
    /// Tickets with affected versions are first registered with the
    /// estimator, so the Proportion is fixed for the whole pass. Failures to
    /// resolve a commit or read its diff skip that commit with a warning.
    pub fn label_methods(
        &self,
        methods: &mut [MethodRecord],
        tickets: &mut BTreeMap<String, Ticket>,
        estimator: &mut ProportionEstimator,
    ) -> LabelingReport {
        let index = group_methods(methods);
        let available: BTreeSet<String> = methods
            .iter()
            .map(|m| normalize_version_name(&m.release))
            .collect();

        for ticket in tickets.values_mut() {
            if ticket.has_affected_versions() {
                estimator.register_valid_ticket(ticket);
            }
        }
        let (proportion, proportion_source) = estimator.proportion();
        tracing::info!(
            valid_tickets = estimator.valid_ticket_count(),
            proportion,
            source = ?proportion_source,
            "labeling {} methods from {} tickets",
            methods.len(),
            tickets.len()
        );

        let mut report = LabelingReport {
            labeled_from_affected_versions: 0,
            labeled_from_proportion: 0,
            processed_tickets: 0,
            skipped: Vec::new(),
            events: Vec::new(),
            proportion,
            proportion_source,
            valid_tickets: estimator.valid_ticket_count(),
        };

        for (position, (id, ticket)) in tickets.iter_mut().enumerate() {
            if let Some(progress) = &self.progress {
                progress.set_message(id.clone());
                progress.set_position(position + 1);
            }

            let buggy = estimator.buggy_releases(ticket);
            let releases: BTreeSet<String> =
                buggy.releases.intersection(&available).cloned().collect();

            let reason = if ticket.fix_version.is_none() {
                Some(SkipReason::NoFixVersion)
            } else if ticket.commit_ids().is_empty() {
                Some(SkipReason::NoCommits)
            } else if buggy.is_empty() {
                Some(SkipReason::NoBuggyReleases)
            } else if releases.is_empty() {
                Some(SkipReason::NoReleasesInDataset)
            } else {
                None
            };

            if let Some(reason) = reason {
                tracing::debug!(ticket = %id, %reason, "ticket skipped");
                report.skipped.push(SkippedTicket {
                    ticket: id.clone(),
                    reason,
                });
                continue;
            }

            tracing::debug!(ticket = %id, source = ?buggy.source, ?releases, "buggy releases");
            report.processed_tickets += 1;
            self.label_ticket(ticket, buggy.source, &releases, &index, methods, &mut report);
        }

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        tracing::info!(
            labeled = report.labeled(),
            from_affected_versions = report.labeled_from_affected_versions,
            from_proportion = report.labeled_from_proportion,
            processed = report.processed_tickets,
            skipped = report.skipped.len(),
            "labeling finished"
        );
        report
    }

    fn label_ticket(
        &self,
        ticket: &Ticket,
        source: LabelSource,
        releases: &BTreeSet<String>,
        index: &MethodIndex,
        methods: &mut [MethodRecord],
        report: &mut LabelingReport,
    ) {
        for sha in ticket.commit_ids() {
            let commit = match self.repo.resolve_commit(sha) {
                Ok(commit) => commit,
                Err(e) => {
                    tracing::warn!(ticket = %ticket.id, commit = %sha, "skipping commit: {e}");
                    continue;
                }
            };

            for file in ticket.fixed_files() {
                let Some(by_release) = index.get(file) else {
                    continue;
                };

                for release in releases {
                    let Some(candidates) = by_release.get(release) else {
                        continue;
                    };

                    let touched = match self.touch.touched_methods(&commit, file, methods, candidates) {
                        Ok(touched) => touched,
                        Err(e) => {
                            tracing::warn!(ticket = %ticket.id, commit = %sha, file = %file, "skipping diff: {e}");
                            continue;
                        }
                    };

                    for idx in touched {
                        let method = &mut methods[idx];
                        if !method.mark_buggy() {
                            continue;
                        }

                        match source {
                            LabelSource::AffectedVersions => report.labeled_from_affected_versions += 1,
                            LabelSource::Proportion => report.labeled_from_proportion += 1,
                        }
                        if self.record_events {
                            report.events.push(LabelEvent {
                                ticket: ticket.id.clone(),
                                commit: commit.sha.clone(),
                                method: method.name.clone(),
                                file: method.file.clone(),
                                release: method.release.clone(),
                                source,
                            });
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bugginess::cold_start::ColdStartEstimator;
    use crate::bugginess::test_support::{commit, date, edits, FakeRepo};
    use crate::core::ProgressTracker;
    use crate::model::{order_releases, FixVersion, Release, ReleaseEntry};

    const RELEASES: [&str; 3] = ["1.0.0", "1.1.0", "1.2.0"];

    fn releases() -> Vec<Release> {
        order_releases(vec![
            ReleaseEntry::new("1.0.0", date(2020, 1, 1)),
            ReleaseEntry::new("1.1.0", date(2020, 3, 1)),
            ReleaseEntry::new("1.2.0", date(2020, 6, 1)),
        ])
    }

    fn estimator(p: f64) -> ProportionEstimator {
        ProportionEstimator::new(&releases(), ColdStartEstimator::fixed(p))
    }

    /// `run` is `[10, 20)` and `stop` is `[25, 30)` in every release.
    fn methods() -> Vec<MethodRecord> {
        let mut methods = Vec::new();
        for release in RELEASES {
            methods.push(MethodRecord::new("A.run()", "src/A.java", release, 10, 20));
            methods.push(MethodRecord::new("A.stop()", "src/A.java", release, 25, 30));
        }
        methods
    }

    fn buggy(methods: &[MethodRecord]) -> Vec<String> {
        methods
            .iter()
            .filter(|m| m.is_buggy())
            .map(|m| format!("{}@{}", m.name, m.release))
            .collect()
    }

    fn repo() -> FakeRepo {
        let mut repo = FakeRepo::new();
        repo.push(commit("c0", "alice", date(2020, 1, 1), "init", None), Vec::new())
            .push(
                commit("c1", "alice", date(2020, 5, 1), "AVRO-1 fix run", Some("c0")),
                vec![edits("src/A.java", &[(15, 18)])],
            )
            .push(
                commit("c2", "bob", date(2020, 5, 2), "AVRO-2 fix stop", Some("c1")),
                vec![edits("src/A.java", &[(26, 27)])],
            );
        repo
    }

    fn fixed_ticket(id: &str, opened: chrono::NaiveDate, commits: &[&str]) -> Ticket {
        let mut t = Ticket::new(id, opened).with_fix_version(FixVersion::new("1.2.0", date(2020, 6, 1)));
        for c in commits {
            t.add_commit_id(*c);
        }
        t.add_fixed_file("src/A.java");
        t
    }

    fn tickets(list: Vec<Ticket>) -> BTreeMap<String, Ticket> {
        list.into_iter().map(|t| (t.id.clone(), t)).collect()
    }

    #[test]
    fn test_labels_from_affected_versions() {
        let repo = repo();
        let labeler = BugLabeler::new(&repo);
        let mut methods = methods();
        let mut tickets = tickets(vec![
            fixed_ticket("AVRO-1", date(2020, 2, 1), &["c1"]).with_affected_versions(["1.0.0"]),
        ]);

        let report = labeler.label_methods(&mut methods, &mut tickets, &mut estimator(0.5));

        assert_eq!(buggy(&methods), vec!["A.run()@1.0.0", "A.run()@1.1.0"]);
        assert_eq!(report.labeled_from_affected_versions, 2);
        assert_eq!(report.labeled_from_proportion, 0);
        assert_eq!(report.processed_tickets, 1);
        assert_eq!(report.events.len(), 2);
        assert_eq!(report.events[0].source, LabelSource::AffectedVersions);
        assert_eq!(report.events[0].commit, "c1");
    }

    #[test]
    fn test_labels_from_proportion() {
        let repo = repo();
        let labeler = BugLabeler::new(&repo);
        let mut methods = methods();
        let mut tickets = tickets(vec![fixed_ticket("AVRO-2", date(2020, 2, 1), &["c2"])]);

        let report = labeler.label_methods(&mut methods, &mut tickets, &mut estimator(0.5));

        assert_eq!(buggy(&methods), vec!["A.stop()@1.1.0"]);
        assert_eq!(report.labeled_from_proportion, 1);
        assert_eq!(report.proportion_source, ProportionSource::ColdStart);
        assert_eq!(report.proportion, 0.5);
        assert_eq!(tickets["AVRO-2"].injected_version_name.as_deref(), Some("1.1.0"));
    }

    #[test]
    fn test_ticket_without_commits_is_skipped() {
        let repo = repo();
        let labeler = BugLabeler::new(&repo);
        let mut methods = methods();
        let mut tickets = tickets(vec![
            fixed_ticket("AVRO-3", date(2020, 2, 1), &[]).with_affected_versions(["1.0.0"]),
        ]);

        let report = labeler.label_methods(&mut methods, &mut tickets, &mut estimator(0.5));

        assert!(buggy(&methods).is_empty());
        assert_eq!(
            report.skipped,
            vec![SkippedTicket {
                ticket: "AVRO-3".into(),
                reason: SkipReason::NoCommits
            }]
        );
    }

    #[test]
    fn test_skip_reasons() {
        let repo = repo();
        let labeler = BugLabeler::new(&repo);
        let mut methods = methods();

        let mut no_fix = Ticket::new("X-1", date(2020, 2, 1)).with_affected_versions(["1.0.0"]);
        no_fix.add_commit_id("c1");
        // opened before the first release: nothing to estimate
        let no_buggy = fixed_ticket("X-2", date(2019, 1, 1), &["c1"]);
        let outside = fixed_ticket("X-3", date(2020, 2, 1), &["c1"]).with_affected_versions(["0.9.0"]);

        let mut tickets = tickets(vec![no_fix, no_buggy, outside]);
        let report = labeler.label_methods(&mut methods, &mut tickets, &mut estimator(0.5));

        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::NoFixVersion,
                SkipReason::NoBuggyReleases,
                SkipReason::NoReleasesInDataset
            ]
        );
        assert_eq!(report.processed_tickets, 0);
        assert!(buggy(&methods).is_empty());
    }

    #[test]
    fn test_touched_method_scenario() {
        let repo = repo();
        let labeler = BugLabeler::new(&repo);
        let mut methods = vec![
            MethodRecord::new("A.run()", "src/A.java", "1.0.0", 10, 20),
            MethodRecord::new("A.stop()", "src/A.java", "1.0.0", 25, 30),
        ];
        let mut tickets = tickets(vec![
            fixed_ticket("AVRO-1", date(2020, 2, 1), &["c1"]).with_affected_versions(["1.0.0"]),
        ]);

        labeler.label_methods(&mut methods, &mut tickets, &mut estimator(0.5));

        assert!(methods[0].is_buggy());
        assert!(!methods[1].is_buggy());
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let repo = repo();
        let labeler = BugLabeler::new(&repo);
        let mut methods = methods();
        let mut tickets = tickets(vec![
            fixed_ticket("AVRO-1", date(2020, 2, 1), &["c1"]).with_affected_versions(["1.0.0"]),
            fixed_ticket("AVRO-2", date(2020, 2, 1), &["c2"]),
        ]);
        let mut est = estimator(0.5);

        let first = labeler.label_methods(&mut methods, &mut tickets, &mut est);
        let after_first = buggy(&methods);
        let second = labeler.label_methods(&mut methods, &mut tickets, &mut est);

        assert_eq!(first.labeled(), 3);
        assert_eq!(buggy(&methods), after_first);
        assert_eq!(second.labeled(), 0);
        assert!(second.events.is_empty());
        assert_eq!(second.valid_tickets, 1);
    }

    #[test]
    fn test_shared_method_labeled_once() {
        let repo = repo();
        let labeler = BugLabeler::new(&repo);
        let mut methods = methods();
        let mut tickets = tickets(vec![
            fixed_ticket("AVRO-1", date(2020, 2, 1), &["c1"]).with_affected_versions(["1.0.0"]),
            fixed_ticket("AVRO-9", date(2020, 2, 1), &["c1"]).with_affected_versions(["1.0.0"]),
        ]);

        let report = labeler.label_methods(&mut methods, &mut tickets, &mut estimator(0.5));
        assert_eq!(report.processed_tickets, 2);
        assert_eq!(report.labeled(), 2);
    }

    #[test]
    fn test_unresolvable_commit_is_skipped() {
        let repo = repo();
        let labeler = BugLabeler::new(&repo);
        let mut methods = methods();
        let mut tickets = tickets(vec![
            fixed_ticket("AVRO-1", date(2020, 2, 1), &["deadbeef", "c1"]).with_affected_versions(["1.0.0"]),
        ]);

        let report = labeler.label_methods(&mut methods, &mut tickets, &mut estimator(0.5));
        assert_eq!(report.labeled(), 2);
    }

    #[test]
    fn test_diff_failure_is_skipped() {
        let mut repo = repo();
        repo.break_diff("c1");
        let labeler = BugLabeler::new(&repo);
        let mut methods = methods();
        let mut tickets = tickets(vec![
            fixed_ticket("AVRO-1", date(2020, 2, 1), &["c1", "c2"]).with_affected_versions(["1.0.0"]),
        ]);

        let report = labeler.label_methods(&mut methods, &mut tickets, &mut estimator(0.5));
        assert_eq!(buggy(&methods), vec!["A.stop()@1.0.0", "A.stop()@1.1.0"]);
        assert_eq!(report.processed_tickets, 1);
    }

    #[test]
    fn test_events_can_be_disabled() {
        let repo = repo();
        let labeler = BugLabeler::new(&repo)
            .with_events(false)
            .with_progress(ProgressTracker::hidden(1));
        let mut methods = methods();
        let mut tickets = tickets(vec![
            fixed_ticket("AVRO-1", date(2020, 2, 1), &["c1"]).with_affected_versions(["1.0.0"]),
        ]);

        let report = labeler.label_methods(&mut methods, &mut tickets, &mut estimator(0.5));
        assert_eq!(report.labeled(), 2);
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_group_methods() {
        let index = group_methods(&methods());
        assert_eq!(index["src/A.java"]["1.1.0"], vec![2, 3]);
        assert_eq!(index["src/A.java"].len(), 3);
    }

    #[test]
    fn test_two_component_dataset_releases_match() {
        let releases = order_releases(vec![
            ReleaseEntry::new("1.0", date(2020, 1, 1)),
            ReleaseEntry::new("1.1", date(2020, 3, 1)),
            ReleaseEntry::new("1.2", date(2020, 6, 1)),
        ]);
        let mut estimator = ProportionEstimator::new(&releases, ColdStartEstimator::fixed(1.0));
        let mut methods: Vec<MethodRecord> = ["1.0", "1.1", "1.2"]
            .into_iter()
            .map(|r| MethodRecord::new("A.run()", "src/A.java", r, 10, 20))
            .collect();

        let mut t = Ticket::new("AVRO-1", date(2020, 2, 1))
            .with_fix_version(FixVersion::new("1.2", date(2020, 6, 1)))
            .with_affected_versions(["1.0"]);
        t.add_commit_id("c1");
        t.add_fixed_file("src/A.java");
        let mut tickets = tickets(vec![t]);

        let repo = repo();
        let report = BugLabeler::new(&repo).label_methods(&mut methods, &mut tickets, &mut estimator);

        assert!(report.skipped.is_empty());
        assert_eq!(buggy(&methods), vec!["A.run()@1.0", "A.run()@1.1"]);
        assert_eq!(report.events[0].release, "1.0");
    }

    #[test]
    fn test_group_methods_normalizes_release_names() {
        let methods = vec![
            MethodRecord::new("A.run()", "src/A.java", "2.1", 1, 5),
            MethodRecord::new("A.run()", "src/A.java", "2.1.0", 1, 5),
        ];
        let index = group_methods(&methods);
        assert_eq!(index["src/A.java"]["2.1.0"], vec![0, 1]);
    }
}
