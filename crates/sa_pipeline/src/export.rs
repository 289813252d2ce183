//! Export tables: typed outcomes → `RecordTable`s ready for `sa_io` writers.
//!
//! Table aggregates are broadcast onto every allocation row. Undefined values
//! (`None`) export as empty cells; booleans export as 0/1.

use sa_algo::effort::{AllocationTable, DroppedUnit};
use sa_core::{Cell, CoreError, PosteriorResult, RecordTable, SurveyUnit};

pub const ALLOCATION_COLUMNS: [&str; 18] = [
    "unit_id",
    "area",
    "probability",
    "sweep_width",
    "visibility",
    "prob_density",
    "log_prob_density",
    "area_weighted_log_density",
    "sum_area_weighted_log_density",
    "sum_probability",
    "sum_area",
    "density_ratio",
    "normalized_log_density",
    "total_effort",
    "effort_density",
    "recommended_coverage",
    "constraint_term",
    "recommended_transect_length",
];

pub const DROPPED_COLUMNS: [&str; 8] = [
    "unit_id",
    "area",
    "probability",
    "sweep_width",
    "visibility",
    "iteration",
    "drop_reason",
    "recommended_transect_length",
];

pub const POSTERIOR_COLUMNS: [&str; 5] = ["unit_id", "prior_prob", "coverage", "post_prob", "updated"];

pub const PRIOR_COLUMNS: [&str; 5] = ["unit_id", "area", "probability", "sweep_width", "visibility"];

fn id(u: &sa_core::UnitId) -> Cell {
    Cell::Text(u.to_string())
}

fn flag(b: bool) -> Cell {
    Cell::Number(if b { 1.0 } else { 0.0 })
}

pub fn allocation_table(t: &AllocationTable) -> Result<RecordTable, CoreError> {
    let agg = &t.aggregates;
    let mut out = RecordTable::new(ALLOCATION_COLUMNS);
    for r in &t.rows {
        out.push_row(vec![
            id(&r.unit_id),
            r.area.into(),
            r.probability.into(),
            r.sweep_width.into(),
            r.visibility.as_deref().into(),
            r.prob_density.into(),
            r.log_prob_density.into(),
            r.area_weighted_log_density.into(),
            agg.sum_area_weighted_log_density.into(),
            agg.sum_probability.into(),
            agg.sum_area.into(),
            agg.density_ratio.into(),
            r.normalized_log_density.into(),
            agg.total_effort.into(),
            r.effort_density.into(),
            r.recommended_coverage.into(),
            r.constraint_term.into(),
            r.recommended_transect_length.into(),
        ])?;
    }
    Ok(out)
}

pub fn dropped_table(log: &[DroppedUnit]) -> Result<RecordTable, CoreError> {
    let mut out = RecordTable::new(DROPPED_COLUMNS);
    for d in log {
        out.push_row(vec![
            id(&d.unit.unit_id),
            d.unit.area.into(),
            d.unit.probability.into(),
            d.unit.sweep_width.into(),
            d.unit.visibility.as_deref().into(),
            Cell::Number(f64::from(d.iteration)),
            Cell::Text(d.drop_reason.clone()),
            d.recommended_transect_length.into(),
        ])?;
    }
    Ok(out)
}

pub fn posterior_table(posteriors: &[PosteriorResult]) -> Result<RecordTable, CoreError> {
    let mut out = RecordTable::new(POSTERIOR_COLUMNS);
    for p in posteriors {
        out.push_row(vec![
            id(&p.unit_id),
            p.prior_prob.into(),
            p.coverage.into(),
            p.post_prob.into(),
            flag(p.updated),
        ])?;
    }
    Ok(out)
}

/// Priors layout; readable back as next cycle's input.
pub fn priors_table(units: &[SurveyUnit]) -> Result<RecordTable, CoreError> {
    let mut out = RecordTable::new(PRIOR_COLUMNS);
    for u in units {
        out.push_row(vec![
            id(&u.unit_id),
            u.area.into(),
            u.probability.into(),
            u.sweep_width.into(),
            u.visibility.as_deref().into(),
        ])?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_algo::effort::run_allocation;

    #[test]
    fn aggregates_broadcast_onto_every_row() {
        let units = [
            SurveyUnit::new("A".parse().unwrap(), 100.0, 0.5, 10.0),
            SurveyUnit::new("B".parse().unwrap(), 50.0, 0.4, 10.0),
        ];
        let out = run_allocation(&units, 30.0, 10).unwrap();
        let t = allocation_table(&out.final_allocation).unwrap();
        let c = t.column_index("sum_area").unwrap();
        for r in 0..t.len() {
            assert_eq!(t.cell(r, c), &Cell::Number(out.final_allocation.aggregates.sum_area));
        }
        assert_eq!(t.columns().len(), ALLOCATION_COLUMNS.len());
    }

    #[test]
    fn undefined_values_export_empty() {
        let units = [
            SurveyUnit::new("A".parse().unwrap(), 10.0, 0.5, 1.0),
            SurveyUnit::new("Z".parse().unwrap(), 10.0, 0.5, 0.0),
        ];
        let out = run_allocation(&units, 5.0, 10).unwrap();
        let t = dropped_table(&out.dropped_log).unwrap();
        let c = t.column_index("recommended_transect_length").unwrap();
        assert!(t.cell(0, c).is_null());
        assert_eq!(t.cell(0, t.column_index("iteration").unwrap()), &Cell::Number(1.0));
    }
}
