//! crates/sa_core/src/variables.rs
//! Run parameters with safe defaults and domain checks.
//!
//! Wire shape (parameter-set JSON):
//! `{ "total_effort": 50.0, "max_iters": 10 }`; `max_iters` is optional.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Default cap on drop-and-rerun iterations.
pub const DEFAULT_MAX_ITERS: u32 = 10;

/// Upper bound accepted for `max_iters`; each iteration drops at least one
/// unit, so larger caps are never reached on realistic unit sets.
pub const MAX_ITERS_LIMIT: u32 = 100_000;

#[cfg(feature = "serde")]
fn default_max_iters() -> u32 {
    DEFAULT_MAX_ITERS
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct Params {
    /// Total transect length `L` to distribute this cycle.
    pub total_effort: f64,
    /// Drop-and-rerun iterations allowed before the cap warning.
    #[cfg_attr(feature = "serde", serde(default = "default_max_iters"))]
    pub max_iters: u32,
}

impl Params {
    pub fn new(total_effort: f64) -> Self {
        Self { total_effort, max_iters: DEFAULT_MAX_ITERS }
    }

    pub fn with_max_iters(mut self, max_iters: u32) -> Self {
        self.max_iters = max_iters;
        self
    }
}

/// Domain checks shared by the loader and the CLI.
pub fn validate_domains(p: &Params) -> Result<(), CoreError> {
    if !p.total_effort.is_finite() {
        return Err(CoreError::DomainOutOfRange("total_effort"));
    }
    if p.max_iters > MAX_ITERS_LIMIT {
        return Err(CoreError::DomainOutOfRange("max_iters"));
    }
    Ok(())
}
