//! ALLOCATE stage: drop-and-rerun allocation with structured logging.
//!
//! The numeric loop lives in `sa_algo`; this stage only narrates it: one
//! `info` event per dropped unit, a `warn` on the iteration cap, an `error`
//! when every unit was dropped.

use sa_algo::effort::{run_allocation, AllocateError, AllocationOutcome};
use sa_core::{Params, SurveyUnit};

use crate::PipelineError;

pub fn allocate(units: &[SurveyUnit], params: &Params) -> Result<AllocationOutcome, PipelineError> {
    let _span = tracing::info_span!(
        "allocate",
        units = units.len(),
        total_effort = params.total_effort,
        max_iters = params.max_iters
    )
    .entered();

    let outcome = match run_allocation(units, params.total_effort, params.max_iters) {
        Ok(o) => o,
        Err(e) => {
            if let AllocateError::AllDropped { iteration, units } = &e {
                tracing::error!(iteration, units = units.len(), "all allocations dropped");
            }
            return Err(e.into());
        }
    };

    for d in &outcome.dropped_log {
        tracing::info!(
            unit_id = %d.unit.unit_id,
            iteration = d.iteration,
            recommended_transect_length = ?d.recommended_transect_length,
            "dropped: {}",
            d.drop_reason
        );
    }
    if let Some(w) = &outcome.warning {
        tracing::warn!(max_iters = w.max_iters, remaining = w.remaining.len(), "{w}");
    }
    tracing::info!(
        passes = outcome.passes(),
        kept = outcome.final_allocation.len(),
        dropped = outcome.dropped_log.len(),
        "allocation complete"
    );

    Ok(outcome)
}
