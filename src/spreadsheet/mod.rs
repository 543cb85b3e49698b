//! Spreadsheet decoding and header-keyed row mapping.
//!
//! `decode` turns a raw byte buffer into ordered rows of scalar cells with no
//! knowledge of business semantics; `mapper` turns a header row plus data rows
//! into string-keyed record bags. Type coercion (dates, quantities, defaults)
//! happens later, at the inventory write boundary.

pub mod decode;
pub mod mapper;

pub use decode::{decode, CellValue, SheetRows, SpreadsheetKind};
pub use mapper::{map_records, normalize_header, RowRecord};
