//! crates/sa_core/src/determinism.rs
//! Stable ordering helpers. Every table the engine emits is sorted by
//! `UnitId`; sorts are stable so the first occurrence of a duplicated id
//! stays first.

use std::collections::BTreeSet;

use crate::entities::{FieldObservation, PosteriorResult, SurveyUnit, UpdateRecord};
use crate::ids::UnitId;

/// Records keyed by a survey unit.
pub trait UnitKeyed {
    fn unit_id(&self) -> &UnitId;
}

macro_rules! impl_unit_keyed {
    ($($t:ty),+ $(,)?) => {
        $(impl UnitKeyed for $t {
            #[inline]
            fn unit_id(&self) -> &UnitId { &self.unit_id }
        })+
    };
}

impl_unit_keyed!(SurveyUnit, FieldObservation, UpdateRecord, PosteriorResult);

/// Stable sort ascending by unit id.
pub fn sort_by_unit_id<T: UnitKeyed>(items: &mut [T]) {
    items.sort_by(|a, b| a.unit_id().cmp(b.unit_id()));
}

/// Keep the first record per unit id (input order), returning the kept
/// records and the ids that had extra occurrences (ascending, once each).
pub fn dedup_keep_first<T: UnitKeyed>(items: Vec<T>) -> (Vec<T>, Vec<UnitId>) {
    let mut seen = BTreeSet::new();
    let mut dups = BTreeSet::new();
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(item.unit_id().clone()) {
            kept.push(item);
        } else {
            dups.insert(item.unit_id().clone());
        }
    }
    (kept, dups.into_iter().collect())
}
