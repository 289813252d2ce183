// crates/sa_algo/src/lib.rs
#![forbid(unsafe_code)]

// Core IDs and records
pub use sa_core::{ids::UnitId, SurveyUnit, UpdateRecord, PosteriorResult};

// ----------------------------- Effort allocation (public surface) --------------------

pub mod effort {
    // File modules (actual implementations)
    pub mod checks;
    pub mod columns;
    pub mod iterate;

    pub use checks::{
        unit_issues, validate_iterated_units, validate_units, ValidationError, ValidationIssue,
        PROBABILITY_ZERO,
    };
    pub use columns::{
        compute_preconstraint_columns, nan_skipping_sum, AllocationAggregates, AllocationRow,
        AllocationTable,
    };
    pub use iterate::{
        run_allocation, AllocateError, AllocationOutcome, DroppedUnit, IterationCapWarning,
        IterationRound,
    };
}

// ----------------------------- Posterior update --------------------------------------

pub mod posterior;

// Convenience re-exports (pipeline imports these from crate root)
pub use effort::{
    compute_preconstraint_columns, run_allocation, AllocateError, AllocationOutcome,
    AllocationTable, DroppedUnit, IterationCapWarning, ValidationError,
};
pub use posterior::{compute_posterior, posterior_probability};
