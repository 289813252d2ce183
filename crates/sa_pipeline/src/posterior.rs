//! POSTERIOR stage and the next-cycle priors.

use std::collections::BTreeMap;

use sa_algo::posterior::compute_posterior;
use sa_core::determinism::sort_by_unit_id;
use sa_core::{PosteriorResult, RecordTable, SurveyUnit, UnitId, UpdateRecord};

use crate::load::update_records_from_table;
use crate::validate::validate_update_records;
use crate::PipelineError;

/// Posterior per record, ascending by `unit_id`.
pub fn compute_posteriors(records: &[UpdateRecord]) -> Vec<PosteriorResult> {
    let mut out: Vec<PosteriorResult> = records.iter().map(compute_posterior).collect();
    sort_by_unit_id(&mut out);
    tracing::debug!(
        records = out.len(),
        updated = out.iter().filter(|r| r.updated).count(),
        "posteriors computed"
    );
    out
}

/// Same, from an already-merged table; missing columns are reported by name
/// and the rows are validated before any posterior is computed.
pub fn compute_posteriors_from_table(table: &RecordTable) -> Result<Vec<PosteriorResult>, PipelineError> {
    let records = update_records_from_table(table)?;
    validate_update_records(&records).into_result()?;
    Ok(compute_posteriors(&records))
}

/// Units for the next cycle: `probability := post_prob`. Units without a
/// posterior keep their prior.
pub fn next_cycle_priors(units: &[SurveyUnit], posteriors: &[PosteriorResult]) -> Vec<SurveyUnit> {
    let post: BTreeMap<&UnitId, f64> = posteriors.iter().map(|p| (&p.unit_id, p.post_prob)).collect();
    let mut out: Vec<SurveyUnit> = units
        .iter()
        .map(|u| match post.get(&u.unit_id) {
            Some(&p) => u.with_probability(p),
            None => u.clone(),
        })
        .collect();
    sort_by_unit_id(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::{Cell, FieldObservation};

    fn unit(id: &str, area: f64, p: f64, sw: f64) -> SurveyUnit {
        SurveyUnit::new(id.parse().unwrap(), area, p, sw)
    }

    #[test]
    fn results_are_sorted_and_flag_updates() {
        let a = unit("A", 100.0, 0.8, 10.0);
        let b = unit("B", 100.0, 0.3, 10.0);
        let recs = [
            UpdateRecord::unobserved(&b),
            UpdateRecord::observed(&a, &FieldObservation::new(a.unit_id.clone(), 20.0, false)),
        ];
        let post = compute_posteriors(&recs);
        assert_eq!(post[0].unit_id.as_str(), "A");
        assert_eq!(post[0].post_prob, 0.0);
        assert!(post[0].updated);
        assert_eq!(post[1].post_prob, 0.3);
        assert!(!post[1].updated);
    }

    #[test]
    fn table_form_requires_all_update_columns() {
        let t = RecordTable::new(["unit_id", "probability", "sweep_width", "area"]);
        match compute_posteriors_from_table(&t) {
            Err(PipelineError::MissingColumns(e)) => {
                assert_eq!(e.missing, vec!["l_walked_today", "success"])
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn table_form_computes_success() {
        let t = RecordTable::new([
            "unit_id", "probability", "sweep_width", "area", "l_walked_today", "success",
        ])
        .with_row(vec!["A".into(), 0.4.into(), 10.0.into(), 100.0.into(), 5.0.into(), "1".into()])
        .unwrap()
        .with_row(vec!["B".into(), 0.4.into(), 10.0.into(), 100.0.into(), Cell::Null, Cell::Null])
        .unwrap();
        let post = compute_posteriors_from_table(&t).unwrap();
        assert_eq!(post[0].post_prob, 1.0);
        assert_eq!(post[1].post_prob, 0.4);
    }

    #[test]
    fn next_priors_carry_posteriors() {
        let units = [unit("B", 1.0, 0.5, 1.0), unit("A", 1.0, 0.5, 1.0)];
        let posts = [PosteriorResult {
            unit_id: "B".parse().unwrap(),
            prior_prob: 0.5,
            post_prob: 0.25,
            coverage: 0.5,
            updated: true,
        }];
        let next = next_cycle_priors(&units, &posts);
        assert_eq!(next[0].unit_id.as_str(), "A");
        assert_eq!(next[0].probability, 0.5);
        assert_eq!(next[1].probability, 0.25);
        assert_eq!(next[1].area, 1.0);
    }

    #[test]
    fn table_form_rejects_invalid_rows() {
        let t = RecordTable::new([
            "unit_id", "probability", "sweep_width", "area", "l_walked_today", "success",
        ])
        .with_row(vec!["A".into(), 1.5.into(), 10.0.into(), 0.0.into(), Cell::Null, Cell::Null])
        .unwrap()
        .with_row(vec!["A".into(), 0.4.into(), 10.0.into(), 100.0.into(), (-5.0).into(), "0".into()])
        .unwrap();
        match compute_posteriors_from_table(&t) {
            Err(PipelineError::Validation(r)) => {
                let codes: Vec<&str> = r.errors().map(|i| i.code).collect();
                assert!(codes.contains(&"probability_out_of_range"));
                assert!(codes.contains(&"area_not_positive"));
                assert!(codes.contains(&"duplicate_unit_id"));
                assert!(codes.contains(&"l_walked_today_invalid"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
