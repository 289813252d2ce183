//! Drop-and-rerun loop around `compute_preconstraint_columns`.
//!
//! Each pass N (1-based) recomputes the full table over the working set, then:
//! 1) no drop candidates (negative or undefined length) → done;
//! 2) every row is a drop candidate → `AllocateError::AllDropped { iteration: N }`;
//! 3) N > `max_iters` → stop with `IterationCapWarning`, keeping this pass's table;
//! 4) otherwise log the candidates, rebuild the working set from the original
//!    unit attributes of the kept ids, and run pass N + 1.
//!
//! Zero-probability units are removed before pass 1 and logged against it.
//! At most `max_iters + 1` passes. The dropped log is an explicit accumulator
//! returned in `AllocationOutcome`; nothing is logged or written here.

use core::fmt;
use std::collections::BTreeMap;

use sa_core::{SurveyUnit, UnitId};

use super::checks::{validate_iterated_units, ValidationError};
use super::columns::{compute_preconstraint_columns, AllocationRow, AllocationTable};

/// A unit removed from the working set, with the pass that removed it.
#[derive(Clone, Debug, PartialEq)]
pub struct DroppedUnit {
    /// Original attributes of the unit.
    pub unit: SurveyUnit,
    pub iteration: u32,
    pub drop_reason: String,
    /// Offending value (`None` when the length was undefined).
    pub recommended_transect_length: Option<f64>,
}

/// Audit entry for one pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IterationRound {
    pub iteration: u32,
    /// Units in the working set at the start of the pass.
    pub working_set: usize,
    /// Units dropped at the end of the pass (ascending).
    pub dropped: Vec<UnitId>,
}

/// Non-fatal: the cap was hit while drop candidates remained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IterationCapWarning {
    pub max_iters: u32,
    /// Pass whose table is returned as final.
    pub iteration: u32,
    /// Units still carrying a negative or undefined length.
    pub remaining: Vec<UnitId>,
}

impl fmt::Display for IterationCapWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.remaining.iter().map(UnitId::as_str).collect();
        write!(
            f,
            "iteration cap {} reached at pass {}; {} unit(s) still have negative or undefined \
             recommended_transect_length: {}",
            self.max_iters,
            self.iteration,
            ids.len(),
            ids.join(", ")
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AllocationOutcome {
    pub final_allocation: AllocationTable,
    pub dropped_log: Vec<DroppedUnit>,
    pub rounds: Vec<IterationRound>,
    pub warning: Option<IterationCapWarning>,
}

impl AllocationOutcome {
    /// Number of passes executed.
    pub fn passes(&self) -> u32 {
        self.rounds.last().map_or(0, |r| r.iteration)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AllocateError {
    Validation(ValidationError),
    /// Every remaining unit was a drop candidate at pass `iteration`.
    AllDropped { iteration: u32, units: Vec<UnitId> },
}

impl fmt::Display for AllocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocateError::Validation(e) => write!(f, "invalid survey units: {e}"),
            AllocateError::AllDropped { iteration, units } => {
                let ids: Vec<&str> = units.iter().map(UnitId::as_str).collect();
                write!(
                    f,
                    "all allocations dropped at iteration {iteration} (units: {})",
                    ids.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for AllocateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AllocateError::Validation(e) => Some(e),
            AllocateError::AllDropped { .. } => None,
        }
    }
}

impl From<ValidationError> for AllocateError {
    fn from(e: ValidationError) -> Self {
        AllocateError::Validation(e)
    }
}

fn drop_reason(row: &AllocationRow, iteration: u32) -> String {
    match row.recommended_transect_length {
        Some(_) => format!("negative recommended_transect_length (iteration {iteration})"),
        None => format!(
            "undefined recommended_transect_length: zero sweep_width (iteration {iteration})"
        ),
    }
}

/// Allocate `total_effort` across `units`, dropping units with negative (or
/// undefined) recommended length and re-optimizing, up to `max_iters` reruns.
///
/// Units with probability 0 (a fully searched, empty unit) carry no finite
/// log-density; they leave the working set before pass 1 and are logged
/// against iteration 1.
pub fn run_allocation(
    units: &[SurveyUnit],
    total_effort: f64,
    max_iters: u32,
) -> Result<AllocationOutcome, AllocateError> {
    // Validation covers the full input (duplicates included), so the id map
    // below is total over every later working set.
    validate_iterated_units(units, total_effort)?;
    let originals: BTreeMap<&UnitId, &SurveyUnit> = units.iter().map(|u| (&u.unit_id, u)).collect();

    let (zero, live): (Vec<&SurveyUnit>, Vec<&SurveyUnit>) =
        units.iter().partition(|u| u.probability == 0.0);

    let mut dropped_log: Vec<DroppedUnit> = Vec::new();
    let mut rounds: Vec<IterationRound> = Vec::new();
    let mut iteration: u32 = 1;

    // Ids removed before the current pass ran; reported with that pass.
    let mut pending: Vec<UnitId> = zero.iter().map(|u| u.unit_id.clone()).collect();
    pending.sort();
    for u in &zero {
        dropped_log.push(DroppedUnit {
            unit: (*u).clone(),
            iteration,
            drop_reason: format!("zero probability (iteration {iteration})"),
            recommended_transect_length: None,
        });
    }
    dropped_log.sort_by(|a, b| a.unit.unit_id.cmp(&b.unit.unit_id));

    if live.is_empty() {
        return Err(AllocateError::AllDropped { iteration, units: pending });
    }

    let live: Vec<SurveyUnit> = live.into_iter().cloned().collect();
    let mut table = compute_preconstraint_columns(&live, total_effort)?;

    loop {
        let working_set = table.len() + pending.len();
        let (candidates, kept): (Vec<&AllocationRow>, Vec<&AllocationRow>) =
            table.rows.iter().partition(|r| r.is_drop_candidate());

        if candidates.is_empty() {
            rounds.push(IterationRound { iteration, working_set, dropped: std::mem::take(&mut pending) });
            return Ok(AllocationOutcome { final_allocation: table, dropped_log, rounds, warning: None });
        }

        let candidate_ids: Vec<UnitId> = candidates.iter().map(|r| r.unit_id.clone()).collect();

        if kept.is_empty() {
            let mut all = std::mem::take(&mut pending);
            all.extend(candidate_ids);
            all.sort();
            return Err(AllocateError::AllDropped { iteration, units: all });
        }

        if iteration > max_iters {
            rounds.push(IterationRound { iteration, working_set, dropped: std::mem::take(&mut pending) });
            let warning = IterationCapWarning { max_iters, iteration, remaining: candidate_ids };
            return Ok(AllocationOutcome {
                final_allocation: table,
                dropped_log,
                rounds,
                warning: Some(warning),
            });
        }

        for row in &candidates {
            if let Some(unit) = originals.get(&row.unit_id) {
                dropped_log.push(DroppedUnit {
                    unit: (*unit).clone(),
                    iteration,
                    drop_reason: drop_reason(row, iteration),
                    recommended_transect_length: row.recommended_transect_length,
                });
            }
        }
        let mut dropped = std::mem::take(&mut pending);
        dropped.extend(candidate_ids);
        dropped.sort();
        rounds.push(IterationRound { iteration, working_set, dropped });

        let next: Vec<SurveyUnit> = kept
            .iter()
            .filter_map(|r| originals.get(&r.unit_id).map(|u| (*u).clone()))
            .collect();

        table = compute_preconstraint_columns(&next, total_effort)?;
        iteration += 1;
    }
}
