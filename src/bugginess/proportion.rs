//! Injected-version estimation with the Proportion method.
//!
//! For a ticket with fix index `fv` and opening index `ov`, the injected
//! index is `fv - (fv - ov) * P`, where P is learned from tickets whose
//! injected version is known (their earliest affected version). Until
//! [`MIN_VALID_TICKETS`] such tickets are registered, P comes from the
//! cold-start estimator.

use std::collections::BTreeSet;

use serde::Serialize;

use super::cold_start::{ticket_proportion, ColdStartEstimator};
use super::release_index::ReleaseIndexMapper;
use crate::core::{Error, Result};
use crate::model::{normalize_version_name, Release, Ticket};

/// Local tickets needed before the locally learned Proportion is used.
pub const MIN_VALID_TICKETS: usize = 5;

/// Where a Proportion value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProportionSource {
    /// Mean over the project's own registered tickets.
    Local,
    /// Cold-start default from reference projects.
    ColdStart,
}

/// How a ticket's buggy releases were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    AffectedVersions,
    Proportion,
}

/// Buggy releases of one ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuggyReleases {
    pub releases: BTreeSet<String>,
    pub source: LabelSource,
    /// Estimated injected version (proportion path only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injected_version: Option<String>,
}

impl BuggyReleases {
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}

/// A registered ticket with all three indices resolved.
#[derive(Debug, Clone)]
struct ValidTicket {
    id: String,
    iv: usize,
    fv: usize,
    ov: usize,
}

impl ValidTicket {
    fn proportion(&self) -> f64 {
        ticket_proportion(self.iv, self.fv, self.ov)
    }
}

/// Injected index for fix index `fv`, opening index `ov` and Proportion `p`.
///
/// Rounds half away from zero and clamps at 0.
pub fn injected_index(fv: usize, ov: usize, p: f64) -> usize {
    let (fv_f, ov_f) = (fv as f64, ov as f64);
    let raw = if fv == ov {
        fv_f - p
    } else {
        fv_f - (fv_f - ov_f) * p
    };
    raw.round().max(0.0) as usize
}

/// Per-project estimation session.
///
/// Holds the project's release mapper, the growing set of valid tickets and
/// the cold-start fallback. Never share one session between projects.
pub struct ProportionEstimator {
    mapper: ReleaseIndexMapper,
    valid: Vec<ValidTicket>,
    cold_start: ColdStartEstimator,
}

impl ProportionEstimator {
    pub fn new(releases: &[Release], cold_start: ColdStartEstimator) -> Self {
        Self {
            mapper: ReleaseIndexMapper::new(releases),
            valid: Vec::new(),
            cold_start,
        }
    }

    pub fn mapper(&self) -> &ReleaseIndexMapper {
        &self.mapper
    }

    pub fn valid_ticket_count(&self) -> usize {
        self.valid.len()
    }

    /// Add a ticket with known affected versions to the working set.
    ///
    /// The injected index is the earliest affected version (by release order) that
    /// resolves. Returns `false` if the ticket has no affected version, no
    /// fix version, or any of the three indices is unresolved. On success
    /// the ticket's `injected_version` is set to its opening date.
    /// Registering the same ticket id twice keeps a single entry.
    pub fn register_valid_ticket(&mut self, ticket: &mut Ticket) -> bool {
        if !ticket.has_affected_versions() {
            return false;
        }
        let Some(fix) = ticket.fix_version_name() else {
            return false;
        };

        let iv = ticket
            .affected_versions()
            .iter()
            .filter_map(|av| self.mapper.index(av))
            .min();
        let fv = self.mapper.index(fix);
        let ov = self.mapper.opening_index(ticket.opening_date);

        let (Some(iv), Some(fv), Some(ov)) = (iv, fv, ov) else {
            tracing::debug!(ticket = %ticket.id, ?iv, ?fv, ?ov, "ticket not usable for proportion");
            return false;
        };

        ticket.injected_version = Some(ticket.opening_date);

        if !self.valid.iter().any(|v| v.id == ticket.id) {
            self.valid.push(ValidTicket {
                id: ticket.id.clone(),
                iv,
                fv,
                ov,
            });
        }
        true
    }

    /// Current Proportion and its source.
    pub fn proportion(&self) -> (f64, ProportionSource) {
        if self.valid.len() >= MIN_VALID_TICKETS {
            let sum: f64 = self.valid.iter().map(ValidTicket::proportion).sum();
            (sum / self.valid.len() as f64, ProportionSource::Local)
        } else {
            (
                self.cold_start.default_proportion(),
                ProportionSource::ColdStart,
            )
        }
    }

    /// Estimate the injected release of a ticket.
    ///
    /// Fails with [`Error::Estimation`] when the fix or opening release
    /// cannot be resolved, or the estimate falls past the last release. On
    /// success the name is also stored in `ticket.injected_version_name`.
    pub fn estimate_iv(&self, ticket: &mut Ticket) -> Result<String> {
        let unresolved = || Error::Estimation {
            ticket: ticket.id.clone(),
        };

        let Some(ov) = self.mapper.opening_index(ticket.opening_date) else {
            tracing::debug!(ticket = %ticket.id, opened = %ticket.opening_date, "no release before opening date");
            return Err(unresolved());
        };
        let Some(fv) = ticket.fix_version_name().and_then(|f| self.mapper.index(f)) else {
            tracing::debug!(ticket = %ticket.id, fix = ?ticket.fix_version_name(), "fix version not found");
            return Err(unresolved());
        };

        let (p, source) = self.proportion();
        let iv = injected_index(fv, ov, p);
        let name = self
            .mapper
            .release_name(iv)
            .ok_or_else(unresolved)?
            .to_string();

        tracing::debug!(ticket = %ticket.id, fv, ov, p, ?source, iv = %name, "estimated injected version");
        ticket.injected_version_name = Some(name.clone());
        Ok(name)
    }

    /// Releases in which the ticket's bug was present.
    ///
    /// Explicit affected versions are used as given, completed with every
    /// release in `[earliest affected, fix)`. Without affected versions the
    /// injected version is estimated and the result is `[injected, fix)`.
    /// The fix release is never included by the interval.
    pub fn buggy_releases(&self, ticket: &mut Ticket) -> BuggyReleases {
        let fv = ticket.fix_version_name().and_then(|f| self.mapper.index(f));

        if ticket.has_affected_versions() {
            let mut releases: BTreeSet<String> = ticket
                .affected_versions()
                .iter()
                .map(|av| normalize_version_name(av))
                .collect();

            let iv = ticket
                .affected_versions()
                .iter()
                .filter_map(|av| self.mapper.index(av))
                .min();
            if let (Some(iv), Some(fv)) = (iv, fv) {
                releases.extend(self.interval(iv, fv));
            }

            return BuggyReleases {
                releases,
                source: LabelSource::AffectedVersions,
                injected_version: None,
            };
        }

        let injected = self.estimate_iv(ticket).ok();
        let releases = match (injected.as_deref().and_then(|iv| self.mapper.index(iv)), fv) {
            (Some(iv), Some(fv)) => self.interval(iv, fv).collect(),
            _ => BTreeSet::new(),
        };

        BuggyReleases {
            releases,
            source: LabelSource::Proportion,
            injected_version: injected,
        }
    }

    /// Release names with index in `[from, to)`.
    fn interval(&self, from: usize, to: usize) -> impl Iterator<Item = String> + '_ {
        (from..to).filter_map(|i| self.mapper.release_name(i).map(str::to_string))
    }
}
