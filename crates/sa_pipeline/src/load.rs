//! crates/sa_pipeline/src/load.rs
//! LOAD stage: canonical-named `RecordTable` → typed records.
//!
//! Required columns are checked first (all missing names reported together);
//! then every cell is parsed explicitly. A cell that does not parse is an
//! error naming the data row (1-based), the column and the raw value.

use thiserror::Error;

use sa_core::table::columns;
use sa_core::{FieldObservation, RecordTable, SurveyUnit, UnitId, UpdateRecord};

use crate::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row}, column {column}: expected {expected}, got {value:?}")]
pub struct LoadError {
    /// 1-based data row (header excluded).
    pub row: usize,
    pub column: &'static str,
    pub value: String,
    pub expected: &'static str,
}

struct Rows<'a> {
    table: &'a RecordTable,
}

impl<'a> Rows<'a> {
    fn err(&self, row: usize, column: &'static str, col: usize, expected: &'static str) -> LoadError {
        LoadError {
            row: row + 1,
            column,
            value: self.table.cell(row, col).as_text().unwrap_or_default(),
            expected,
        }
    }

    fn unit_id(&self, row: usize, col: usize) -> Result<UnitId, LoadError> {
        let bad = || self.err(row, columns::UNIT_ID, col, "a non-empty unit id");
        let text = self.table.cell(row, col).as_text().ok_or_else(bad)?;
        text.parse::<UnitId>().map_err(|_| bad())
    }

    fn opt_f64(&self, row: usize, column: &'static str, col: usize) -> Result<Option<f64>, LoadError> {
        self.table.cell(row, col).parse_f64().map_err(|e| self.err(row, column, col, e.expected))
    }

    fn f64(&self, row: usize, column: &'static str, col: usize) -> Result<f64, LoadError> {
        self.opt_f64(row, column, col)?.ok_or_else(|| self.err(row, column, col, "a number"))
    }

    fn opt_flag(&self, row: usize, column: &'static str, col: usize) -> Result<Option<bool>, LoadError> {
        self.table.cell(row, col).parse_flag().map_err(|e| self.err(row, column, col, e.expected))
    }

    fn flag(&self, row: usize, column: &'static str, col: usize) -> Result<bool, LoadError> {
        self.opt_flag(row, column, col)?.ok_or_else(|| self.err(row, column, col, "0 or 1"))
    }

    fn opt_text(&self, row: usize, col: Option<usize>) -> Option<String> {
        col.and_then(|c| self.table.cell(row, c).as_text())
    }
}

/// Priors table → survey units (input order).
pub fn units_from_table(table: &RecordTable) -> Result<Vec<SurveyUnit>, PipelineError> {
    let ix = table.require_columns(&columns::PRIOR_REQUIRED)?;
    let (c_id, c_p, c_sw, c_area) = (ix[0], ix[1], ix[2], ix[3]);
    let c_vis = table.column_index(columns::VISIBILITY);
    let rows = Rows { table };

    let mut out = Vec::with_capacity(table.len());
    for r in 0..table.len() {
        out.push(SurveyUnit {
            unit_id: rows.unit_id(r, c_id)?,
            area: rows.f64(r, columns::AREA, c_area)?,
            probability: rows.f64(r, columns::PROBABILITY, c_p)?,
            sweep_width: rows.f64(r, columns::SWEEP_WIDTH, c_sw)?,
            visibility: rows.opt_text(r, c_vis),
        });
    }
    Ok(out)
}

/// Observations table → field observations (input order).
pub fn observations_from_table(table: &RecordTable) -> Result<Vec<FieldObservation>, PipelineError> {
    let ix = table.require_columns(&columns::OBSERVATION_REQUIRED)?;
    let (c_id, c_len, c_ok) = (ix[0], ix[1], ix[2]);
    let rows = Rows { table };

    let mut out = Vec::with_capacity(table.len());
    for r in 0..table.len() {
        out.push(FieldObservation {
            unit_id: rows.unit_id(r, c_id)?,
            l_walked_today: rows.f64(r, columns::L_WALKED_TODAY, c_len)?,
            success: rows.flag(r, columns::SUCCESS, c_ok)?,
        });
    }
    Ok(out)
}

/// Already-merged update table → update records. Observation cells may be empty.
pub fn update_records_from_table(table: &RecordTable) -> Result<Vec<UpdateRecord>, PipelineError> {
    let ix = table.require_columns(&columns::UPDATE_REQUIRED)?;
    let (c_id, c_p, c_sw, c_area, c_len, c_ok) = (ix[0], ix[1], ix[2], ix[3], ix[4], ix[5]);
    let c_vis = table.column_index(columns::VISIBILITY);
    let rows = Rows { table };

    let mut out = Vec::with_capacity(table.len());
    for r in 0..table.len() {
        out.push(UpdateRecord {
            unit_id: rows.unit_id(r, c_id)?,
            area: rows.f64(r, columns::AREA, c_area)?,
            probability: rows.f64(r, columns::PROBABILITY, c_p)?,
            sweep_width: rows.f64(r, columns::SWEEP_WIDTH, c_sw)?,
            visibility: rows.opt_text(r, c_vis),
            l_walked_today: rows.opt_f64(r, columns::L_WALKED_TODAY, c_len)?,
            success: rows.opt_flag(r, columns::SUCCESS, c_ok)?,
        });
    }
    Ok(out)
}
