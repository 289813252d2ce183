//! End-to-end survey cycle through the pipeline: allocate, observe, update,
//! and allocate again on the next-cycle priors.

use sa_algo::effort::AllocateError;
use sa_core::{Cell, Params, RecordTable};
use sa_pipeline::export::{allocation_table, posterior_table, priors_table};
use sa_pipeline::{run_allocate, run_update, PipelineError};

fn priors() -> RecordTable {
    let mut t = RecordTable::new(["unit_id", "probability", "sweep_width", "area"]);
    t.push_row(vec!["A".into(), 0.9.into(), 10.0.into(), 100.0.into()]).unwrap();
    t.push_row(vec!["B".into(), 0.01.into(), 10.0.into(), 100.0.into()]).unwrap();
    t
}

#[test]
fn allocate_then_update_then_reallocate() {
    let run = run_allocate(&priors(), &Params::new(10.0)).unwrap();
    assert_eq!(run.outcome.dropped_log.len(), 1);
    assert_eq!(run.outcome.final_allocation.len(), 1);
    let alloc = allocation_table(&run.outcome.final_allocation).unwrap();
    assert_eq!(alloc.len(), 1);

    // walk A fully, find nothing
    let obs = RecordTable::new(["unit_id", "l_walked_today", "success"])
        .with_row(vec!["A".into(), 10.0.into(), 0.0.into()])
        .unwrap();
    let upd = run_update(&priors(), &obs).unwrap();
    assert_eq!(upd.records.len(), 2);
    assert_eq!(upd.posteriors[0].post_prob, 0.0);
    assert_eq!(upd.posteriors[1].post_prob, 0.01);
    assert_eq!(posterior_table(&upd.posteriors).unwrap().len(), 2);

    // A now has probability 0: it leaves the next allocation, B takes all of L
    let next = priors_table(&upd.next_priors).unwrap();
    let again = run_allocate(&next, &Params::new(10.0)).unwrap();
    let dropped = &again.outcome.dropped_log;
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].unit.unit_id.as_str(), "A");
    assert_eq!(dropped[0].drop_reason, "zero probability (iteration 1)");
    let kept = &again.outcome.final_allocation;
    assert_eq!(kept.len(), 1);
    assert_eq!(kept.rows[0].unit_id.as_str(), "B");
    assert!((kept.total_recommended_length() - 10.0).abs() < 1e-9);
}

#[test]
fn partial_search_feeds_next_cycle() {
    let obs = RecordTable::new(["unit_id", "l_walked_today", "success"])
        .with_row(vec!["A".into(), 5.0.into(), Cell::text("0")])
        .unwrap();
    let upd = run_update(&priors(), &obs).unwrap();
    assert!((upd.next_priors[0].probability - 0.45).abs() < 1e-12);

    let next = priors_table(&upd.next_priors).unwrap();
    let run = run_allocate(&next, &Params::new(10.0)).unwrap();
    assert!(run.outcome.warning.is_none());
}

#[test]
fn negative_effort_drops_everything() {
    match run_allocate(&priors(), &Params::new(-50.0)) {
        Err(PipelineError::Allocate(AllocateError::AllDropped { iteration, .. })) => {
            assert_eq!(iteration, 1)
        }
        other => panic!("unexpected: {other:?}"),
    }
}
