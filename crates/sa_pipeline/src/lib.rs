//! sa_pipeline: survey allocation stages.
//!
//! Allocation: LOAD (typed extraction) → VALIDATE → ALLOCATE (drop-and-rerun).
//! Update: LOAD priors + observations → VALIDATE → JOIN → POSTERIOR → NEXT PRIORS.
//! Both paths end in BUILD_RUN_RECORD. File reading/writing stays with the caller;
//! this crate turns `RecordTable`s into typed outcomes and export tables.

#![forbid(unsafe_code)]

use serde::Serialize;
use thiserror::Error;

use sa_algo::effort::{AllocateError, AllocationOutcome};
use sa_core::{MissingColumnError, Params, PosteriorResult, RecordTable, SurveyUnit, UpdateRecord};

pub mod allocate;
pub mod build_run_record;
pub mod export;
pub mod load;
pub mod posterior;
pub mod update_table;
pub mod validate;

pub use build_run_record::{build_run_record, RunCounts, RunRecordBody, RunRecordDoc};
pub use load::LoadError;
pub use posterior::{compute_posteriors, compute_posteriors_from_table, next_cycle_priors};
pub use update_table::{build_update_table, join_update_records};
pub use validate::{EntityRef, Severity, ValidationIssue, ValidationReport};

/// Engine identifiers recorded in every run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineMeta {
    pub name: String,
    pub version: String,
}

impl EngineMeta {
    /// Identity of this build.
    pub fn current() -> Self {
        Self { name: "sa-engine".to_string(), version: env!("CARGO_PKG_VERSION").to_string() }
    }
}

/// Single error surface for the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Io(#[from] sa_io::IoError),

    #[error(transparent)]
    MissingColumns(#[from] MissingColumnError),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// Pre-computation checks failed; the report lists every finding.
    #[error("validation failed: {0}")]
    Validation(ValidationReport),

    #[error(transparent)]
    Allocate(#[from] AllocateError),

    #[error("run record: {0}")]
    Build(String),
}

/// Output of the allocation path.
#[derive(Debug, Clone)]
pub struct AllocateRun {
    pub units: Vec<SurveyUnit>,
    pub params: Params,
    pub outcome: AllocationOutcome,
}

/// Output of the update path.
#[derive(Debug, Clone)]
pub struct UpdateRun {
    pub records: Vec<UpdateRecord>,
    pub posteriors: Vec<PosteriorResult>,
    pub next_priors: Vec<SurveyUnit>,
}

/// LOAD → VALIDATE → ALLOCATE over a priors table.
pub fn run_allocate(priors: &RecordTable, params: &Params) -> Result<AllocateRun, PipelineError> {
    let _span = tracing::info_span!("allocate_run", rows = priors.len()).entered();

    let units = load::units_from_table(priors)?;
    validate::validate_priors(&units, Some(params)).into_result()?;
    let outcome = allocate::allocate(&units, params)?;

    Ok(AllocateRun { units, params: params.clone(), outcome })
}

/// JOIN → POSTERIOR → NEXT PRIORS over a priors table and an observations table.
pub fn run_update(priors: &RecordTable, observations: &RecordTable) -> Result<UpdateRun, PipelineError> {
    let _span = tracing::info_span!(
        "update_run",
        priors = priors.len(),
        observations = observations.len()
    )
    .entered();

    let records = build_update_table(priors, observations)?;
    let posteriors = compute_posteriors(&records);
    let units: Vec<SurveyUnit> = records.iter().map(UpdateRecord::to_survey_unit).collect();
    let next_priors = next_cycle_priors(&units, &posteriors);

    Ok(UpdateRun { records, posteriors, next_priors })
}
