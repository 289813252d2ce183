//! crates/sa_io/src/table_io.rs
//! Tabular readers and the CSV writer.
//!
//! Readers dispatch on file extension and always return a `RecordTable` with
//! canonical column names (see `synonyms`). Cells are kept as text/number as
//! found; typed parsing happens in the pipeline's LOAD stage.

use std::fs;
use std::path::Path;

use serde_json::Value;

use sa_core::{Cell, RecordTable};

use crate::canonical_json::write_bytes_atomic;
use crate::hasher::sha256_hex;
use crate::synonyms::normalize_columns;
use crate::{IoError, IoResult};

const MAX_TABLE_BYTES: u64 = 64 * 1024 * 1024;

/// Supported tabular formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Json,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> IoResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(TableFormat::Csv),
            "json" => Ok(TableFormat::Json),
            _ => Err(IoError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read a `.csv` or `.json` table and normalize its column names.
pub fn read_table(path: &Path) -> IoResult<RecordTable> {
    let format = TableFormat::from_path(path)?;
    let md = fs::metadata(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    if md.len() > MAX_TABLE_BYTES {
        return Err(IoError::Invalid(format!(
            "{} exceeds {} bytes",
            path.display(),
            MAX_TABLE_BYTES
        )));
    }
    let bytes = fs::read(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    match format {
        TableFormat::Csv => parse_csv_table(&bytes),
        TableFormat::Json => parse_json_table(&bytes),
    }
}

/// CSV with a header row; fields trimmed, empty fields become `Null`.
pub fn parse_csv_table(bytes: &[u8]) -> IoResult<RecordTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let raw_headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut table = RecordTable::new(normalize_columns(&raw_headers)?);

    for record in rdr.records() {
        let record = record?;
        table.push_row(record.iter().map(Cell::text).collect())?;
    }
    Ok(table)
}

/// JSON array of flat objects. Columns are the union of keys (first-seen
/// order); keys absent on a row read as `Null`.
pub fn parse_json_table(bytes: &[u8]) -> IoResult<RecordTable> {
    let v: Value = serde_json::from_slice(bytes)?;
    let Value::Array(items) = v else {
        return Err(IoError::Schema("JSON table must be an array of objects".into()));
    };

    let mut raw_headers: Vec<String> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| IoError::Schema(format!("element /{i} is not an object")))?;
        for k in obj.keys() {
            if !raw_headers.iter().any(|h| h == k) {
                raw_headers.push(k.clone());
            }
        }
    }

    let mut table = RecordTable::new(normalize_columns(&raw_headers)?);
    for (i, item) in items.iter().enumerate() {
        let mut row = Vec::with_capacity(raw_headers.len());
        for key in &raw_headers {
            let cell = match item.get(key) {
                None | Some(Value::Null) => Cell::Null,
                Some(Value::Number(n)) => n.as_f64().map_or(Cell::Null, Cell::Number),
                Some(Value::String(s)) => Cell::text(s.as_str()),
                Some(Value::Bool(b)) => Cell::Number(if *b { 1.0 } else { 0.0 }),
                Some(_) => {
                    return Err(IoError::Schema(format!("/{i}/{key}: nested values are not supported")))
                }
            };
            row.push(cell);
        }
        table.push_row(row)?;
    }
    Ok(table)
}

fn cell_to_field(cell: &Cell) -> String {
    match cell {
        Cell::Null => String::new(),
        Cell::Number(n) if n.is_nan() => String::new(),
        Cell::Number(n) => n.to_string(),
        Cell::Text(s) => s.clone(),
    }
}

/// CSV bytes for a table (header + rows, `\n` line endings).
pub fn table_to_csv_bytes(table: &RecordTable) -> IoResult<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(cell_to_field))?;
    }
    wtr.into_inner().map_err(|e| IoError::Csv(e.to_string()))
}

/// Atomically write `table` as CSV; returns the SHA-256 of the bytes written.
pub fn write_table_csv(path: &Path, table: &RecordTable) -> IoResult<String> {
    let bytes = table_to_csv_bytes(table)?;
    write_bytes_atomic(path, &bytes).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    Ok(sha256_hex(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_headers_are_normalized() {
        let t = parse_csv_table(b"Polygon ID, POA ,ESW,Area\nP1,0.5,10,100\nP2,,4,20\n").unwrap();
        assert_eq!(t.columns(), ["unit_id", "probability", "sweep_width", "area"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.cell(0, 1), &Cell::Text("0.5".into()));
        assert!(t.cell(1, 1).is_null());
    }

    #[test]
    fn ragged_csv_is_an_error() {
        assert!(matches!(parse_csv_table(b"a,b\n1,2,3\n"), Err(IoError::Csv(_))));
    }

    #[test]
    fn json_records_union_keys() {
        let t = parse_json_table(br#"[{"id":"A","prob":0.5},{"id":7,"found":true}]"#).unwrap();
        assert_eq!(t.columns(), ["unit_id", "probability", "success"]);
        assert_eq!(t.cell(1, 0).as_text().as_deref(), Some("7"));
        assert!(t.cell(1, 1).is_null());
        assert_eq!(t.cell(1, 2), &Cell::Number(1.0));
    }

    #[test]
    fn json_rejects_non_tabular_shapes() {
        assert!(matches!(parse_json_table(br#"{"a":1}"#), Err(IoError::Schema(_))));
        assert!(matches!(parse_json_table(br#"[{"a":{"b":1}}]"#), Err(IoError::Schema(_))));
        assert!(matches!(parse_json_table(br#"[1]"#), Err(IoError::Schema(_))));
    }

    #[test]
    fn dispatch_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("priors.CSV");
        fs::write(&csv_path, "unit,area\nA,1\n").unwrap();
        assert_eq!(read_table(&csv_path).unwrap().columns(), ["unit_id", "area"]);

        let xlsx = dir.path().join("priors.xlsx");
        fs::write(&xlsx, "x").unwrap();
        assert!(matches!(read_table(&xlsx), Err(IoError::UnsupportedFormat(_))));
    }

    #[test]
    fn writer_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/posterior.csv");
        let t = RecordTable::new(["unit_id", "post_prob", "note"])
            .with_row(vec!["A".into(), 0.25.into(), Cell::Null])
            .unwrap();
        let digest = write_table_csv(&path, &t).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "unit_id,post_prob,note\nA,0.25,\n");
        assert_eq!(digest, sha256_hex(text.as_bytes()));
        let back = read_table(&path).unwrap();
        assert_eq!(back.cell(0, 1).parse_f64().unwrap(), Some(0.25));
    }
}
