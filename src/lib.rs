//! szz - SZZ-style defect labeling for method datasets.
//!
//! Bug tickets from an issue tracker are linked to their fix commits, the
//! releases each bug affected are taken from the ticket or estimated with
//! the Proportion method, and every method a fix commit touched in those
//! releases is labeled buggy.
//!
//! # Example
//!
//! ```no_run
//! use szz::bugginess::{BugLabeler, ColdStartEstimator, CommitLinker, FileFilter, ProportionEstimator};
//! use szz::git::GitRepo;
//! use szz::metadata::{self, JsonProjectSource, ProjectMetadata};
//!
//! let repo = GitRepo::open(".").unwrap();
//! let (releases, mut tickets) = ProjectMetadata::from_file("AVRO.json").unwrap().into_parts();
//! CommitLinker::new(&repo, FileFilter::default())
//!     .link_commits_to_tickets(&mut tickets)
//!     .unwrap();
//!
//! let cold_start = ColdStartEstimator::with_default_projects(Box::new(JsonProjectSource::new("metadata")));
//! let mut estimator = ProportionEstimator::new(&releases, cold_start);
//! let mut methods = metadata::load_methods("methods.json").unwrap();
//! let report = BugLabeler::new(&repo).label_methods(&mut methods, &mut tickets, &mut estimator);
//! println!("Labeled {} methods", report.labeled());
//! ```

pub mod bugginess;
pub mod cli;
pub mod config;
pub mod core;
pub mod git;
pub mod metadata;
pub mod model;
pub mod output;

pub use core::{Error, Result};
