//! Pre-constraint effort allocation for one pass.
//!
//! Contract:
//! - Aggregates are computed once over the whole input and broadcast to every
//!   row, so each call yields an independent table.
//! - `log10` of the probability density; aggregate sums skip NaN.
//! - `constraint_term` is diagnostic only: it never feeds coverage or length.
//! - Undefined values are `None`, never NaN or ±inf:
//!     * `constraint_term` when `sum_area - area == 0` (single-unit set),
//!     * `recommended_transect_length` when `sweep_width == 0`.
//! - Rows are emitted ascending by `UnitId`.

use sa_core::determinism::sort_by_unit_id;
use sa_core::{SurveyUnit, UnitId};

use super::checks::{validate_units, ValidationError};

/// Per-unit derived columns.
#[derive(Clone, Debug, PartialEq)]
pub struct AllocationRow {
    pub unit_id: UnitId,
    pub area: f64,
    pub probability: f64,
    pub sweep_width: f64,
    pub visibility: Option<String>,
    pub prob_density: f64,
    pub log_prob_density: f64,
    pub area_weighted_log_density: f64,
    pub normalized_log_density: f64,
    pub effort_density: f64,
    pub recommended_coverage: f64,
    pub constraint_term: Option<f64>,
    pub recommended_transect_length: Option<f64>,
}

impl AllocationRow {
    /// Negative or undefined length: the unit should leave the working set.
    #[inline]
    pub fn is_drop_candidate(&self) -> bool {
        self.recommended_transect_length.map_or(true, |len| len < 0.0)
    }
}

/// Table-wide values, identical on every row of a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AllocationAggregates {
    pub sum_area: f64,
    pub sum_probability: f64,
    pub sum_area_weighted_log_density: f64,
    pub density_ratio: f64,
    /// Total effort `L` distributed by this pass.
    pub total_effort: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AllocationTable {
    pub rows: Vec<AllocationRow>,
    pub aggregates: AllocationAggregates,
}

impl AllocationTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, unit_id: &UnitId) -> Option<&AllocationRow> {
        self.rows
            .binary_search_by(|r| r.unit_id.cmp(unit_id))
            .ok()
            .map(|ix| &self.rows[ix])
    }

    /// Sum of the defined recommended lengths.
    pub fn total_recommended_length(&self) -> f64 {
        nan_skipping_sum(self.rows.iter().filter_map(|r| r.recommended_transect_length))
    }
}

/// Sum that ignores NaN terms.
pub fn nan_skipping_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().filter(|v| !v.is_nan()).sum()
}

/// Compute every allocation column for `units` with total effort `total_effort`.
pub fn compute_preconstraint_columns(
    units: &[SurveyUnit],
    total_effort: f64,
) -> Result<AllocationTable, ValidationError> {
    validate_units(units, total_effort)?;

    let mut sorted: Vec<SurveyUnit> = units.to_vec();
    sort_by_unit_id(&mut sorted);

    // Steps 1–3: per-unit densities.
    let densities: Vec<(f64, f64, f64)> = sorted
        .iter()
        .map(|u| {
            let pd = u.probability / u.area;
            let lpd = pd.log10();
            (pd, lpd, u.area * lpd)
        })
        .collect();

    // Step 4–5: aggregates over the full input.
    let sum_area_weighted_log_density = nan_skipping_sum(densities.iter().map(|d| d.2));
    let sum_probability = nan_skipping_sum(sorted.iter().map(|u| u.probability));
    let sum_area = nan_skipping_sum(sorted.iter().map(|u| u.area));
    let density_ratio = sum_area_weighted_log_density / sum_area;

    let aggregates = AllocationAggregates {
        sum_area,
        sum_probability,
        sum_area_weighted_log_density,
        density_ratio,
        total_effort,
    };

    // Steps 6–10.
    let rows = sorted
        .into_iter()
        .zip(densities)
        .map(|(u, (pd, lpd, awl))| {
            let normalized_log_density = lpd - density_ratio;
            let effort_density = (total_effort * u.sweep_width) / sum_area;
            let recommended_coverage = normalized_log_density + effort_density;

            let rest_area = sum_area - u.area;
            let constraint_term = (rest_area != 0.0).then(|| {
                ((sum_probability - u.probability) / rest_area)
                    * 10f64.powf(-total_effort / rest_area)
            });

            let recommended_transect_length = (u.sweep_width != 0.0)
                .then(|| (recommended_coverage * u.area) / u.sweep_width);

            AllocationRow {
                unit_id: u.unit_id,
                area: u.area,
                probability: u.probability,
                sweep_width: u.sweep_width,
                visibility: u.visibility,
                prob_density: pd,
                log_prob_density: lpd,
                area_weighted_log_density: awl,
                normalized_log_density,
                effort_density,
                recommended_coverage,
                constraint_term,
                recommended_transect_length,
            }
        })
        .collect();

    Ok(AllocationTable { rows, aggregates })
}
