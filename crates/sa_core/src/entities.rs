//! crates/sa_core/src/entities.rs
//! Typed records flowing through the engine.
//!
//! Fields are plain `pub` data: range checks live in `sa_algo::effort::checks`
//! (prior units) and `sa_pipeline::validate` (observations), so a record can
//! always be built and then reported on with every offending unit listed.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::UnitId;

/// One prior row: a spatial unit with its detection probability.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurveyUnit {
    pub unit_id: UnitId,
    /// Positive area (any consistent unit, e.g. m²).
    pub area: f64,
    /// Prior detection probability in [0, 1].
    pub probability: f64,
    /// Effective detection width, ≥ 0, same length unit as transects.
    pub sweep_width: f64,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub visibility: Option<String>,
}

impl SurveyUnit {
    pub fn new(unit_id: UnitId, area: f64, probability: f64, sweep_width: f64) -> Self {
        Self { unit_id, area, probability, sweep_width, visibility: None }
    }

    /// Copy of this unit carrying a new probability (next-cycle prior).
    pub fn with_probability(&self, probability: f64) -> Self {
        Self { probability, ..self.clone() }
    }
}

/// One field result for a unit in the current cycle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldObservation {
    pub unit_id: UnitId,
    /// Transect length actually surveyed, ≥ 0.
    pub l_walked_today: f64,
    /// Detection outcome (wire form 0/1).
    pub success: bool,
}

impl FieldObservation {
    pub fn new(unit_id: UnitId, l_walked_today: f64, success: bool) -> Self {
        Self { unit_id, l_walked_today, success }
    }
}

/// Left-join row: prior fields plus the (optional) observation for the unit.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdateRecord {
    pub unit_id: UnitId,
    pub area: f64,
    pub probability: f64,
    pub sweep_width: f64,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub visibility: Option<String>,
    pub l_walked_today: Option<f64>,
    pub success: Option<bool>,
}

impl UpdateRecord {
    /// Record for a unit with no observation this cycle.
    pub fn unobserved(unit: &SurveyUnit) -> Self {
        Self {
            unit_id: unit.unit_id.clone(),
            area: unit.area,
            probability: unit.probability,
            sweep_width: unit.sweep_width,
            visibility: unit.visibility.clone(),
            l_walked_today: None,
            success: None,
        }
    }

    pub fn observed(unit: &SurveyUnit, obs: &FieldObservation) -> Self {
        Self {
            l_walked_today: Some(obs.l_walked_today),
            success: Some(obs.success),
            ..Self::unobserved(unit)
        }
    }

    /// Prior fields only (drops the observation columns).
    pub fn to_survey_unit(&self) -> SurveyUnit {
        SurveyUnit {
            unit_id: self.unit_id.clone(),
            area: self.area,
            probability: self.probability,
            sweep_width: self.sweep_width,
            visibility: self.visibility.clone(),
        }
    }
}

/// Updated probability for one unit.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PosteriorResult {
    pub unit_id: UnitId,
    pub prior_prob: f64,
    pub post_prob: f64,
    /// Clamped coverage used by the update (0 when not surveyed).
    pub coverage: f64,
    /// True iff the record carried an `l_walked_today` value.
    pub updated: bool,
}
