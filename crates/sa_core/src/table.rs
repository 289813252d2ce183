//! crates/sa_core/src/table.rs
//! In-memory tabular record set: the boundary type between the readers in
//! `sa_io` and the typed extraction in `sa_pipeline`.
//!
//! Column names are expected to be canonical already (synonym resolution
//! happens at ingestion). Cells stay loosely typed here; conversion to `f64`
//! and 0/1 flags is explicit and fallible (`Cell::parse_f64`,
//! `Cell::parse_flag`) so that a bad value is reported, never coerced to NaN.

use core::fmt;

use crate::errors::CoreError;

/// Canonical column names.
pub mod columns {
    pub const UNIT_ID: &str = "unit_id";
    pub const AREA: &str = "area";
    pub const PROBABILITY: &str = "probability";
    pub const SWEEP_WIDTH: &str = "sweep_width";
    pub const VISIBILITY: &str = "visibility";
    pub const L_WALKED_TODAY: &str = "l_walked_today";
    pub const SUCCESS: &str = "success";

    /// Required on a priors table.
    pub const PRIOR_REQUIRED: [&str; 4] = [UNIT_ID, PROBABILITY, SWEEP_WIDTH, AREA];
    /// Required on a field-observation table.
    pub const OBSERVATION_REQUIRED: [&str; 3] = [UNIT_ID, L_WALKED_TODAY, SUCCESS];
    /// Required on an already-merged update table.
    pub const UPDATE_REQUIRED: [&str; 6] =
        [UNIT_ID, PROBABILITY, SWEEP_WIDTH, AREA, L_WALKED_TODAY, SUCCESS];
}

// ----------------------------------------------------------------------------
// Cells
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

/// A cell that could not be read as the requested type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellError {
    pub value: String,
    pub expected: &'static str,
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, got {:?}", self.expected, self.value)
    }
}

impl std::error::Error for CellError {}

impl Cell {
    /// Text cell; blank text becomes `Null`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() { Cell::Null } else { Cell::Text(s) }
    }

    /// Null, blank text and NaN all count as missing.
    pub fn is_null(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Number(n) => n.is_nan(),
            Cell::Text(s) => s.trim().is_empty(),
        }
    }

    /// Display form used for identifiers and labels. Integral numbers render
    /// without a fractional part so `12` and `"12"` name the same unit.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Number(n) if n.is_nan() => None,
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Text(s) => {
                let t = s.trim();
                if t.is_empty() { None } else { Some(t.to_string()) }
            }
        }
    }

    /// Finite number, or `None` when the cell is missing.
    pub fn parse_f64(&self) -> Result<Option<f64>, CellError> {
        if self.is_null() {
            return Ok(None);
        }
        let v = match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse::<f64>().map_err(|_| CellError {
                value: s.clone(),
                expected: "a number",
            })?,
            Cell::Null => return Ok(None),
        };
        if v.is_finite() {
            Ok(Some(v))
        } else {
            Err(CellError { value: v.to_string(), expected: "a finite number" })
        }
    }

    /// Binary 0/1 flag (also accepts true/false, yes/no), or `None` when missing.
    pub fn parse_flag(&self) -> Result<Option<bool>, CellError> {
        if self.is_null() {
            return Ok(None);
        }
        let bad = || CellError { value: self.as_text().unwrap_or_default(), expected: "0 or 1" };
        match self {
            Cell::Number(n) if *n == 0.0 => Ok(Some(false)),
            Cell::Number(n) if *n == 1.0 => Ok(Some(true)),
            Cell::Number(_) => Err(bad()),
            Cell::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "0" | "0.0" | "false" | "no" | "n" => Ok(Some(false)),
                "1" | "1.0" | "true" | "yes" | "y" => Ok(Some(true)),
                _ => Err(bad()),
            },
            Cell::Null => Ok(None),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::text(s)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Cell::Null, Into::into)
    }
}

// ----------------------------------------------------------------------------
// Missing columns
// ----------------------------------------------------------------------------

/// Required schema fields absent after name normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingColumnError {
    /// Exact canonical names that are missing, in requirement order.
    pub missing: Vec<String>,
    /// Column names actually present, in table order.
    pub present: Vec<String>,
}

impl fmt::Display for MissingColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "missing required column(s): {} (present: {})",
            self.missing.join(", "),
            if self.present.is_empty() { "<none>".to_string() } else { self.present.join(", ") }
        )
    }
}

impl std::error::Error for MissingColumnError {}

// ----------------------------------------------------------------------------
// RecordTable
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RecordTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { columns: columns.into_iter().map(Into::into).collect(), rows: Vec::new() }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row; it must have exactly one cell per column.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), CoreError> {
        if row.len() != self.columns.len() {
            return Err(CoreError::RowArity { expected: self.columns.len(), got: row.len() });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Builder-style `push_row` for tests and literals.
    pub fn with_row(mut self, row: Vec<Cell>) -> Result<Self, CoreError> {
        self.push_row(row)?;
        Ok(self)
    }

    /// Resolve every required column to its index, or report all missing names.
    pub fn require_columns(&self, required: &[&str]) -> Result<Vec<usize>, MissingColumnError> {
        let mut found = Vec::with_capacity(required.len());
        let mut missing = Vec::new();
        for name in required {
            match self.column_index(name) {
                Some(ix) => found.push(ix),
                None => missing.push((*name).to_string()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(MissingColumnError { missing, present: self.columns.clone() })
        }
    }

    /// Cell at (`row`, `col`); out-of-range positions read as `Null`.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        const NULL: Cell = Cell::Null;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&NULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priors() -> RecordTable {
        RecordTable::new(["unit_id", "area", "probability"])
            .with_row(vec!["A".into(), 100.0.into(), "0.5".into()])
            .unwrap()
    }

    #[test]
    fn require_columns_lists_every_missing_name() {
        let err = priors().require_columns(&columns::PRIOR_REQUIRED).unwrap_err();
        assert_eq!(err.missing, vec!["sweep_width".to_string()]);
        assert_eq!(err.present, vec!["unit_id", "area", "probability"]);
        assert!(err.to_string().contains("sweep_width"));
    }

    #[test]
    fn require_columns_returns_indices_in_request_order() {
        let t = priors();
        assert_eq!(t.require_columns(&["probability", "unit_id"]).unwrap(), vec![2, 0]);
    }

    #[test]
    fn push_row_checks_arity() {
        let mut t = RecordTable::new(["a", "b"]);
        assert!(t.push_row(vec![Cell::Null]).is_err());
        assert!(t.push_row(vec![Cell::Null, Cell::Null]).is_ok());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn parse_f64_is_explicit() {
        assert_eq!(Cell::text(" 2.5 ").parse_f64().unwrap(), Some(2.5));
        assert_eq!(Cell::text("").parse_f64().unwrap(), None);
        assert_eq!(Cell::Number(f64::NAN).parse_f64().unwrap(), None);
        assert!(Cell::text("abc").parse_f64().is_err());
        assert!(Cell::text("inf").parse_f64().is_err());
    }

    #[test]
    fn parse_flag_accepts_binary_forms() {
        assert_eq!(Cell::Number(1.0).parse_flag().unwrap(), Some(true));
        assert_eq!(Cell::text("0").parse_flag().unwrap(), Some(false));
        assert_eq!(Cell::text("TRUE").parse_flag().unwrap(), Some(true));
        assert_eq!(Cell::Null.parse_flag().unwrap(), None);
        assert!(Cell::Number(2.0).parse_flag().is_err());
        assert!(Cell::text("maybe").parse_flag().is_err());
    }

    #[test]
    fn integral_numbers_render_as_ids() {
        assert_eq!(Cell::Number(12.0).as_text().as_deref(), Some("12"));
        assert_eq!(Cell::Number(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(Cell::text("  P1 ").as_text().as_deref(), Some("P1"));
    }
}
