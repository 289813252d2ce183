//! crates/sa_pipeline/src/update_table.rs
//! Left outer join of prior units with this cycle's field observations.
//!
//! - priors deduplicated by `unit_id`, first occurrence kept (warned);
//! - more than one observation for a unit is a validation error;
//! - observations for unknown units are warned about and ignored;
//! - every prior appears exactly once, ascending by `unit_id`.

use std::collections::BTreeMap;

use sa_core::determinism::{dedup_keep_first, sort_by_unit_id};
use sa_core::{FieldObservation, RecordTable, SurveyUnit, UnitId, UpdateRecord};

use crate::load::{observations_from_table, units_from_table};
use crate::validate::{validate_observations, validate_priors};
use crate::PipelineError;

/// Typed tables in, joined records out.
pub fn build_update_table(
    priors: &RecordTable,
    observations: &RecordTable,
) -> Result<Vec<UpdateRecord>, PipelineError> {
    let units = units_from_table(priors)?;
    let obs = observations_from_table(observations)?;

    let (units, dup_ids) = dedup_keep_first(units);
    for id in &dup_ids {
        tracing::warn!(unit_id = %id, "duplicate prior row; keeping the first occurrence");
    }

    validate_priors(&units, None)
        .merge(validate_observations(&obs, &units))
        .into_result()?;

    Ok(join_update_records(&units, &obs))
}

/// Join already-validated records. Units must be unique; for a unit with
/// several observations the first one wins.
pub fn join_update_records(units: &[SurveyUnit], obs: &[FieldObservation]) -> Vec<UpdateRecord> {
    let mut by_unit: BTreeMap<&UnitId, &FieldObservation> = BTreeMap::new();
    for o in obs {
        by_unit.entry(&o.unit_id).or_insert(o);
    }

    let mut out: Vec<UpdateRecord> = units
        .iter()
        .map(|u| match by_unit.get(&u.unit_id) {
            Some(o) => UpdateRecord::observed(u, o),
            None => UpdateRecord::unobserved(u),
        })
        .collect();
    sort_by_unit_id(&mut out);
    out
}
