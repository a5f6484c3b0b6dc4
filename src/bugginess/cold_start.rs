//! Cold-start Proportion from reference projects.
//!
//! When a project has too few tickets with known injected versions, the
//! Proportion constant is borrowed from other projects: the mean of the
//! per-ticket proportions of every reference project, keeping only values
//! in `(0, 1.5]`.

use std::sync::OnceLock;

use serde::Serialize;

use super::release_index::ReleaseIndexMapper;
use crate::core::Result;
use crate::metadata::ProjectSource;

/// Reference projects sampled when none are configured.
pub const DEFAULT_PROJECTS: [&str; 4] = ["AVRO", "ZOOKEEPER", "SYNCOPE", "TAJO"];

/// Proportion used when no reference ticket qualifies.
pub const FALLBACK_PROPORTION: f64 = 1.0;

/// Upper bound of a plausible per-ticket proportion.
const MAX_PROPORTION: f64 = 1.5;

/// Per-ticket proportion `(fv - iv) / (fv - ov)`.
///
/// When the ticket was opened in its fix release (`fv == ov`) the
/// denominator is dropped and the result is `fv - iv`.
pub fn ticket_proportion(iv: usize, fv: usize, ov: usize) -> f64 {
    let (iv, fv, ov) = (iv as f64, fv as f64, ov as f64);
    if fv == ov {
        fv - iv
    } else {
        (fv - iv) / (fv - ov)
    }
}

/// Outcome of sampling one reference project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSample {
    pub project: String,
    /// Proportions kept after outlier filtering.
    pub kept: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    /// Load failure, when the project was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cold-start result for one session.
#[derive(Debug, Clone, Serialize)]
pub struct ColdStart {
    pub proportion: f64,
    pub projects: Vec<ProjectSample>,
}

/// Lazily computed cold-start Proportion.
///
/// The value is computed on first use and reused for the lifetime of the
/// estimator. Each project's estimation session owns its own instance.
pub struct ColdStartEstimator {
    source: Option<Box<dyn ProjectSource>>,
    projects: Vec<String>,
    result: OnceLock<ColdStart>,
}

impl ColdStartEstimator {
    pub fn new(source: Box<dyn ProjectSource>, projects: Vec<String>) -> Self {
        Self {
            source: Some(source),
            projects,
            result: OnceLock::new(),
        }
    }

    /// Sample the default reference projects.
    pub fn with_default_projects(source: Box<dyn ProjectSource>) -> Self {
        Self::new(source, DEFAULT_PROJECTS.iter().map(|p| p.to_string()).collect())
    }

    /// A pre-known Proportion; nothing is sampled.
    pub fn fixed(proportion: f64) -> Self {
        let result = OnceLock::new();
        let _ = result.set(ColdStart {
            proportion,
            projects: Vec::new(),
        });
        Self {
            source: None,
            projects: Vec::new(),
            result,
        }
    }

    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    /// The cold-start Proportion, computed once.
    pub fn default_proportion(&self) -> f64 {
        self.summary().proportion
    }

    /// Full sampling result, computed once.
    pub fn summary(&self) -> &ColdStart {
        self.result.get_or_init(|| self.compute())
    }

    fn compute(&self) -> ColdStart {
        let Some(source) = self.source.as_deref() else {
            return ColdStart {
                proportion: FALLBACK_PROPORTION,
                projects: Vec::new(),
            };
        };

        let mut all = Vec::new();
        let mut samples = Vec::with_capacity(self.projects.len());

        for project in &self.projects {
            match project_proportions(source, project) {
                Ok(values) => {
                    let mean = mean(&values);
                    tracing::info!(project = %project, kept = values.len(), ?mean, "sampled reference project");
                    samples.push(ProjectSample {
                        project: project.clone(),
                        kept: values.len(),
                        mean,
                        error: None,
                    });
                    all.extend(values);
                }
                Err(e) => {
                    tracing::warn!(project = %project, "skipping reference project: {e}");
                    samples.push(ProjectSample {
                        project: project.clone(),
                        kept: 0,
                        mean: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let proportion = mean(&all).unwrap_or(FALLBACK_PROPORTION);
        tracing::info!(proportion, samples = all.len(), "cold-start proportion");

        ColdStart {
            proportion,
            projects: samples,
        }
    }
}

/// Plausible per-ticket proportions of one reference project.
///
/// Uses the first listed affected version as the injected version. Tickets
/// with any unresolved index are skipped.
pub fn project_proportions(source: &dyn ProjectSource, project: &str) -> Result<Vec<f64>> {
    let (releases, tickets) = source.load(project)?.into_parts();
    let mapper = ReleaseIndexMapper::new(&releases);

    let values = tickets
        .values()
        .filter_map(|ticket| {
            let iv = mapper.index(ticket.affected_versions().first()?)?;
            let fv = mapper.index(ticket.fix_version_name()?)?;
            let ov = mapper.opening_index(ticket.opening_date)?;
            Some(ticket_proportion(iv, fv, ov))
        })
        .filter(|p| *p > 0.0 && *p <= MAX_PROPORTION)
        .collect();

    Ok(values)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
