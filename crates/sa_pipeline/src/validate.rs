//! crates/sa_pipeline/src/validate.rs
//! Structural & semantic validation before any computation.
//!
//! Errors block the run; warnings are advisory (logged, kept in the report).
//! Issue order is stable: severity, then location, then code, then message.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use sa_algo::effort::{unit_issues, PROBABILITY_ZERO};
use sa_core::variables::validate_domains;
use sa_core::{FieldObservation, Params, SurveyUnit, UnitId, UpdateRecord};

use crate::PipelineError;

/// Issue severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

/// Where the issue occurred.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntityRef {
    Root,
    Param(&'static str),
    Unit(UnitId),
    Observation(UnitId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Root => f.write_str("input"),
            EntityRef::Param(p) => write!(f, "param {p}"),
            EntityRef::Unit(u) => write!(f, "unit {u}"),
            EntityRef::Observation(u) => write!(f, "observation {u}"),
        }
    }
}

/// One validation finding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub where_: EntityRef,
}

impl ValidationIssue {
    fn error(code: &'static str, where_: EntityRef, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, code, message: message.into(), where_ }
    }

    fn warning(code: &'static str, where_: EntityRef, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, code, message: message.into(), where_ }
    }
}

/// Deterministic report: pass = no Error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub pass: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn from_issues(mut issues: Vec<ValidationIssue>) -> Self {
        sort_issues_stably(&mut issues);
        Self { pass: !issues.iter().any(|i| i.severity == Severity::Error), issues }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Merge two reports (re-sorted).
    pub fn merge(self, other: ValidationReport) -> Self {
        let mut issues = self.issues;
        issues.extend(other.issues);
        Self::from_issues(issues)
    }

    /// Log warnings; fail with the report when any error is present.
    pub fn into_result(self) -> Result<ValidationReport, PipelineError> {
        for w in self.warnings() {
            tracing::warn!(code = w.code, at = %w.where_, "{}", w.message);
        }
        if self.pass {
            Ok(self)
        } else {
            Err(PipelineError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors: Vec<&ValidationIssue> = self.errors().collect();
        write!(f, "{} error(s)", errors.len())?;
        for e in errors {
            write!(f, "; [{}] {}: {}", e.code, e.where_, e.message)?;
        }
        Ok(())
    }
}

/// Checks on a prior unit set; with `params`, the parameters are
/// domain-checked too. Probability 0 passes: the update path produces it and
/// the allocator drops such units itself.
pub fn validate_priors(units: &[SurveyUnit], params: Option<&Params>) -> ValidationReport {
    let mut issues = Vec::new();

    if units.is_empty() {
        issues.push(ValidationIssue::error("empty_unit_set", EntityRef::Root, "no survey units"));
    }

    if let Some(p) = params {
        if validate_domains(p).is_err() {
            if !p.total_effort.is_finite() {
                issues.push(ValidationIssue::error(
                    "total_effort_non_finite",
                    EntityRef::Param("total_effort"),
                    format!("total effort must be finite, got {}", p.total_effort),
                ));
            } else {
                issues.push(ValidationIssue::error(
                    "max_iters_out_of_range",
                    EntityRef::Param("max_iters"),
                    format!("max_iters too large: {}", p.max_iters),
                ));
            }
        }
    }

    for i in unit_issues(units) {
        if i.code == PROBABILITY_ZERO {
            continue;
        }
        let where_ = i.unit_id.map_or(EntityRef::Root, EntityRef::Unit);
        issues.push(ValidationIssue::error(i.code, where_, i.message));
    }

    ValidationReport::from_issues(issues)
}

/// Checks on field observations against the (deduplicated) prior units:
/// duplicates and bad lengths are errors; unknown units are warnings.
pub fn validate_observations(obs: &[FieldObservation], units: &[SurveyUnit]) -> ValidationReport {
    let known: BTreeSet<&UnitId> = units.iter().map(|u| &u.unit_id).collect();
    let mut counts: BTreeMap<&UnitId, usize> = BTreeMap::new();
    let mut issues = Vec::new();

    for o in obs {
        *counts.entry(&o.unit_id).or_insert(0) += 1;

        if !o.l_walked_today.is_finite() || o.l_walked_today < 0.0 {
            issues.push(ValidationIssue::error(
                "l_walked_today_invalid",
                EntityRef::Observation(o.unit_id.clone()),
                format!("l_walked_today must be finite and >= 0, got {}", o.l_walked_today),
            ));
        }
        if !known.contains(&o.unit_id) {
            issues.push(ValidationIssue::warning(
                "observation_unknown_unit",
                EntityRef::Observation(o.unit_id.clone()),
                "observation refers to a unit absent from the priors; ignored",
            ));
        }
    }

    for (id, n) in counts.into_iter().filter(|(_, n)| *n > 1) {
        issues.push(ValidationIssue::error(
            "duplicate_observation",
            EntityRef::Observation(id.clone()),
            format!("{n} observations for one unit in one cycle"),
        ));
    }

    ValidationReport::from_issues(issues)
}

/// Checks on an already-merged update table: the prior fields get the
/// `validate_priors` rules (duplicate ids included), walked lengths must be
/// finite and non-negative.
pub fn validate_update_records(records: &[UpdateRecord]) -> ValidationReport {
    let units: Vec<SurveyUnit> = records.iter().map(UpdateRecord::to_survey_unit).collect();
    let mut issues = validate_priors(&units, None).issues;

    for r in records {
        if let Some(l) = r.l_walked_today {
            if !l.is_finite() || l < 0.0 {
                issues.push(ValidationIssue::error(
                    "l_walked_today_invalid",
                    EntityRef::Observation(r.unit_id.clone()),
                    format!("l_walked_today must be finite and >= 0, got {l}"),
                ));
            }
        }
    }

    ValidationReport::from_issues(issues)
}

/// Deterministic sort of issues for byte-identical reports.
fn sort_issues_stably(issues: &mut [ValidationIssue]) {
    issues.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.where_.cmp(&b.where_))
            .then_with(|| a.code.cmp(b.code))
            .then_with(|| a.message.cmp(&b.message))
    });
}
