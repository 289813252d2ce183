//! Posterior detection probability after one field cycle.
//!
//! Detection-decay update, not a renormalized Bayes update over a partition:
//! - surveyed with success → 1.0
//! - surveyed without success → prior × (1 − coverage)
//! - not surveyed → prior
//!
//! `coverage = clamp(sweep_width × l_walked_today / area, 0, 1)`, and 0 when
//! no length was walked or the ratio is not a number.

use sa_core::{PosteriorResult, UpdateRecord};

/// Raw coverage ratio; `None` without a walked length.
#[inline]
pub fn coverage_raw(sweep_width: f64, l_walked_today: Option<f64>, area: f64) -> Option<f64> {
    l_walked_today.map(|l| (sweep_width * l) / area)
}

/// Clamp into [0, 1]; missing or NaN coverage counts as 0.
#[inline]
pub fn clamp_coverage(raw: Option<f64>) -> f64 {
    match raw {
        Some(c) if !c.is_nan() => c.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Apply the update rule to a prior.
pub fn posterior_probability(prior: f64, coverage: f64, success: Option<bool>) -> f64 {
    match success {
        Some(true) => 1.0,
        Some(false) => prior * (1.0 - coverage),
        None => prior,
    }
}

/// Posterior for one joined record.
pub fn compute_posterior(rec: &UpdateRecord) -> PosteriorResult {
    let coverage = clamp_coverage(coverage_raw(rec.sweep_width, rec.l_walked_today, rec.area));
    PosteriorResult {
        unit_id: rec.unit_id.clone(),
        prior_prob: rec.probability,
        post_prob: posterior_probability(rec.probability, coverage, rec.success),
        coverage,
        updated: rec.l_walked_today.is_some(),
    }
}
