//! sa_core: core types for the survey allocation engine.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`sa_algo`, `sa_io`, `sa_pipeline`, `sa_cli`).
//!
//! - Unit identifiers: `UnitId`
//! - Input records: `SurveyUnit`, `FieldObservation`
//! - Joined / derived records: `UpdateRecord`, `PosteriorResult`
//! - Tabular boundary type: `RecordTable` (+ `MissingColumnError`)
//! - Run parameters: `Params` (total effort, iteration cap)
//! - Deterministic ordering helpers (everything sorts by `UnitId`)
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod determinism;
pub mod entities;
pub mod ids;
pub mod table;
pub mod variables;

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain validation & parsing.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum CoreError {
        InvalidId(String),
        RowArity { expected: usize, got: usize },
        DomainOutOfRange(&'static str),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidId(s) => write!(f, "invalid unit id: {s:?}"),
                CoreError::RowArity { expected, got } => {
                    write!(f, "row has {got} cells, table has {expected} columns")
                }
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
            }
        }
    }

    impl std::error::Error for CoreError {}
}

pub use entities::{FieldObservation, PosteriorResult, SurveyUnit, UpdateRecord};
pub use errors::CoreError;
pub use ids::UnitId;
pub use table::{Cell, MissingColumnError, RecordTable};
pub use variables::Params;
