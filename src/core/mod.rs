//! Core types shared by the labeling pipeline.

mod error;
pub mod progress;

pub use error::{Error, Result};
pub use progress::ProgressTracker;
