//! Column-name normalization at ingestion.
//!
//! A raw header is lowercased, trimmed, and runs of spaces, hyphens and dots
//! become `_`. The result is looked up in a static alias table; unknown
//! columns keep their normalized name. Two source columns landing on the
//! same name is a schema error.

use std::collections::BTreeMap;

use sa_core::table::columns;

use crate::{IoError, IoResult};

/// Canonical name → accepted aliases (already in normalized form).
pub const ALIASES: &[(&str, &[&str])] = &[
    (columns::UNIT_ID, &["unit_id", "unit", "unitid", "polygon", "polygon_id", "id", "segment"]),
    (columns::AREA, &["area", "area_m2", "size"]),
    (columns::PROBABILITY, &["probability", "prob", "p", "poa", "prior", "prior_prob"]),
    (columns::SWEEP_WIDTH, &["sweep_width", "sweepwidth", "sweep", "w", "esw"]),
    (columns::VISIBILITY, &["visibility", "vis"]),
    (
        columns::L_WALKED_TODAY,
        &["l_walked_today", "l_walked", "walked", "length_walked", "transect_length"],
    ),
    (columns::SUCCESS, &["success", "found", "detected", "detection"]),
];

/// Lowercase, trim, and fold separators to single underscores.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if matches!(ch, ' ' | '-' | '.' | '_' | '\t') {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.extend(ch.to_lowercase());
    }
    out
}

/// Canonical name for a raw header.
pub fn canonical_name(raw: &str) -> String {
    let norm = normalize_header(raw);
    ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&norm.as_str()))
        .map(|(canon, _)| (*canon).to_string())
        .unwrap_or(norm)
}

/// Resolve a whole header row, rejecting collisions and blank names.
pub fn normalize_columns<S: AsRef<str>>(raw: &[S]) -> IoResult<Vec<String>> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    let mut out = Vec::with_capacity(raw.len());
    for (ix, r) in raw.iter().enumerate() {
        let r = r.as_ref();
        let name = canonical_name(r);
        if name.is_empty() {
            return Err(IoError::Schema(format!("column {} has an empty name", ix + 1)));
        }
        if let Some(prev) = seen.insert(name.clone(), r) {
            return Err(IoError::Schema(format!(
                "columns {prev:?} and {r:?} both resolve to {name:?}"
            )));
        }
        out.push(name);
    }
    Ok(out)
}
