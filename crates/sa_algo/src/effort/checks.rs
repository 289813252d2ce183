//! Precondition checks for the allocation math.
//!
//! Every violated rule is collected (not just the first one) so the caller can
//! report all offending units at once. Issues are ordered by unit id, then by
//! code; set-level issues (empty set, bad `L`) come first.

use core::fmt;
use std::collections::BTreeSet;

use sa_core::{SurveyUnit, UnitId};

/// One violated precondition.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationIssue {
    /// Stable machine code, e.g. `probability_zero`.
    pub code: &'static str,
    /// Offending unit, `None` for set-level issues.
    pub unit_id: Option<UnitId>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    fn single(code: &'static str, message: impl Into<String>) -> Self {
        Self { issues: vec![ValidationIssue { code, unit_id: None, message: message.into() }] }
    }

    /// Distinct offending unit ids, ascending.
    pub fn unit_ids(&self) -> Vec<&UnitId> {
        let set: BTreeSet<&UnitId> = self.issues.iter().filter_map(|i| i.unit_id.as_ref()).collect();
        set.into_iter().collect()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation issue(s)", self.issues.len())?;
        let ids = self.unit_ids();
        if !ids.is_empty() {
            let ids: Vec<&str> = ids.into_iter().map(UnitId::as_str).collect();
            write!(f, " in unit(s) {}", ids.join(", "))?;
        }
        for issue in &self.issues {
            match &issue.unit_id {
                Some(u) => write!(f, "; [{}] {}: {}", issue.code, u, issue.message)?,
                None => write!(f, "; [{}] {}", issue.code, issue.message)?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Check the unit set and total effort against the allocation preconditions.
pub fn validate_units(units: &[SurveyUnit], total_effort: f64) -> Result<(), ValidationError> {
    if units.is_empty() {
        return Err(ValidationError::single("empty_unit_set", "at least one survey unit is required"));
    }

    let mut issues = Vec::new();
    if !total_effort.is_finite() {
        issues.push(ValidationIssue {
            code: "total_effort_non_finite",
            unit_id: None,
            message: format!("total effort must be finite, got {total_effort}"),
        });
    }
    issues.extend(unit_issues(units));

    if issues.is_empty() { Ok(()) } else { Err(ValidationError { issues }) }
}

/// Code raised for a unit whose probability is exactly 0.
pub const PROBABILITY_ZERO: &str = "probability_zero";

/// As `validate_units`, minus `probability_zero`: the iterated allocator
/// removes such units before its first pass instead of rejecting the set.
pub fn validate_iterated_units(units: &[SurveyUnit], total_effort: f64) -> Result<(), ValidationError> {
    match validate_units(units, total_effort) {
        Ok(()) => Ok(()),
        Err(mut e) => {
            e.issues.retain(|i| i.code != PROBABILITY_ZERO);
            if e.issues.is_empty() { Ok(()) } else { Err(e) }
        }
    }
}

/// Per-unit rule violations, ascending by unit id (rule order kept per id).
pub fn unit_issues(units: &[SurveyUnit]) -> Vec<ValidationIssue> {
    let mut seen = BTreeSet::new();
    let mut issues = Vec::new();
    for u in units {
        let mut push = |code: &'static str, message: String| {
            issues.push(ValidationIssue { code, unit_id: Some(u.unit_id.clone()), message });
        };

        if !seen.insert(&u.unit_id) {
            push("duplicate_unit_id", "unit_id appears more than once".into());
        }

        if !u.area.is_finite() {
            push("area_non_finite", format!("area must be finite, got {}", u.area));
        } else if u.area <= 0.0 {
            push("area_not_positive", format!("area must be > 0, got {}", u.area));
        }

        if !u.probability.is_finite() {
            push("probability_non_finite", format!("probability must be finite, got {}", u.probability));
        } else if !(0.0..=1.0).contains(&u.probability) {
            push("probability_out_of_range", format!("probability must be in [0, 1], got {}", u.probability));
        } else if u.probability == 0.0 {
            push(PROBABILITY_ZERO, "probability 0 has no finite log-density".into());
        }

        if !u.sweep_width.is_finite() {
            push("sweep_width_non_finite", format!("sweep_width must be finite, got {}", u.sweep_width));
        } else if u.sweep_width < 0.0 {
            push("sweep_width_negative", format!("sweep_width must be >= 0, got {}", u.sweep_width));
        }
    }

    // stable sort
    issues.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));
    issues
}
