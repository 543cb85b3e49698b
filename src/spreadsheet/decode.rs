use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};

use crate::errors::DecodeError;

/// A single scalar cell. Serializes untagged so a persisted snapshot is a
/// plain JSON array-of-arrays of strings, numbers, booleans and nulls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl CellValue {
    /// Returns the cell rendered as a trimmed string, or `None` for an empty
    /// or whitespace-only cell.
    pub fn as_text(&self) -> Option<String> {
        let s = match self {
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Bool(b) => b.to_string(),
            CellValue::Empty => return None,
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// Ordered rows of ordered cells, header row included as element zero.
pub type SheetRows = Vec<Vec<CellValue>>;

/// Which decoder a file descriptor selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpreadsheetKind {
    /// XLSX/XLS/XLSB/ODS, handled by calamine.
    Workbook,
    /// Plain CSV, handled by the csv crate.
    Csv,
}

/// Decodes an in-memory buffer into rows-of-cells.
///
/// Only the first worksheet of a multi-sheet workbook is used. A structurally
/// valid empty sheet decodes successfully to zero rows; content checks belong
/// to the import validator.
pub fn decode(bytes: &[u8], kind: SpreadsheetKind) -> Result<SheetRows, DecodeError> {
    match kind {
        SpreadsheetKind::Workbook => decode_workbook(bytes),
        SpreadsheetKind::Csv => decode_csv(bytes),
    }
}

fn decode_workbook(bytes: &[u8]) -> Result<SheetRows, DecodeError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Err(DecodeError::NoWorksheet),
    };

    let mut rows: SheetRows = Vec::with_capacity(range.height());
    for row in range.rows() {
        let mut cells: Vec<CellValue> = row.iter().map(cell_value).collect();
        // The used range pads short rows with empty cells; dropping the
        // trailing ones keeps rows ragged, exactly as the sheet was typed.
        while matches!(cells.last(), Some(CellValue::Empty)) {
            cells.pop();
        }
        rows.push(cells);
    }
    Ok(rows)
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}

fn decode_csv(bytes: &[u8]) -> Result<SheetRows, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows: SheetRows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(field.to_string())
                }
            })
            .collect();
        rows.push(cells);
    }
    Ok(rows)
}
