//! SZZ-style bugginess labeling.
//!
//! Tickets are linked to fix commits, their buggy releases are derived from
//! explicit affected versions or estimated with the Proportion method, and
//! the label is propagated to every method a fix commit touched in those
//! releases.

pub mod cold_start;
pub mod labeler;
pub mod linker;
pub mod proportion;
pub mod release_index;
pub mod touch;

pub use cold_start::{ColdStart, ColdStartEstimator, ProjectSample, DEFAULT_PROJECTS};
pub use labeler::{BugLabeler, LabelEvent, LabelingReport, SkipReason, SkippedTicket};
pub use linker::{CommitLinker, FileFilter, LinkSummary};
pub use proportion::{
    BuggyReleases, LabelSource, ProportionEstimator, ProportionSource, MIN_VALID_TICKETS,
};
pub use release_index::ReleaseIndexMapper;
pub use touch::MethodTouchAnalyzer;
