use std::collections::HashMap;

use super::decode::{CellValue, SheetRows};

/// A dynamic bag of string-keyed scalar values produced from one data row.
///
/// Keys come from the normalized header; a row shorter than the header leaves
/// the trailing keys absent, never null. This is distinct from the typed
/// inventory item: the bag-to-item mapping, with its defaulting and
/// required-field rules, lives at the reconciliation write boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowRecord {
    fields: HashMap<String, CellValue>,
}

impl RowRecord {
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// First non-empty value among the given keys, rendered as trimmed text.
    pub fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.fields.get(*key))
            .find_map(|cell| cell.as_text())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Normalizes a header cell into a field key: trim, lowercase, and collapse
/// each run of whitespace into a single underscore. Deterministic and
/// idempotent.
pub fn normalize_header(header: &str) -> String {
    let mut key = String::with_capacity(header.len());
    let mut pending_gap = false;
    for ch in header.trim().chars() {
        if ch.is_whitespace() {
            pending_gap = !key.is_empty();
        } else {
            if pending_gap {
                key.push('_');
                pending_gap = false;
            }
            for lower in ch.to_lowercase() {
                key.push(lower);
            }
        }
    }
    key
}

/// Zips every data row against the normalized header by positional index,
/// producing one record per row. The first row is the header; an input with
/// fewer than two rows maps to no records.
pub fn map_records(rows: &SheetRows) -> Vec<RowRecord> {
    let Some((header, data_rows)) = rows.split_first() else {
        return Vec::new();
    };
    let keys: Vec<String> = header
        .iter()
        .map(|cell| cell.as_text().unwrap_or_default())
        .map(|text| normalize_header(&text))
        .collect();

    data_rows
        .iter()
        .map(|row| {
            let fields = keys
                .iter()
                .zip(row.iter())
                .filter(|(key, _)| !key.is_empty())
                .map(|(key, cell)| (key.clone(), cell.clone()))
                .collect();
            RowRecord { fields }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn normalization_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize_header("Último Mantenimiento"), "último_mantenimiento");
        assert_eq!(normalize_header("  Item   Name "), "item_name");
        assert_eq!(normalize_header("Cantidad"), "cantidad");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_header("Fecha  de\tInstalación");
        assert_eq!(normalize_header(&once), once);
    }

    #[test]
    fn maps_one_record_per_data_row() {
        let rows: SheetRows = vec![
            vec![text("Nombre"), text("Cantidad")],
            vec![text("Router A"), text("3")],
            vec![text("Switch B"), text("1")],
        ];
        let records = map_records(&rows);
        assert_eq!(records.len(), rows.len() - 1);
        assert_eq!(records[0].text(&["nombre"]).as_deref(), Some("Router A"));
        assert_eq!(records[0].text(&["cantidad"]).as_deref(), Some("3"));
        assert_eq!(records[1].text(&["nombre"]).as_deref(), Some("Switch B"));
    }

    #[test]
    fn short_rows_leave_trailing_keys_absent() {
        let rows: SheetRows = vec![
            vec![text("Nombre"), text("Cantidad"), text("Notas")],
            vec![text("Router A")],
        ];
        let records = map_records(&rows);
        assert!(records[0].contains_key("nombre"));
        assert!(!records[0].contains_key("cantidad"));
        assert!(!records[0].contains_key("notas"));
    }

    #[test]
    fn extra_cells_beyond_the_header_are_dropped() {
        let rows: SheetRows = vec![
            vec![text("Nombre")],
            vec![text("Router A"), text("stray")],
        ];
        let records = map_records(&rows);
        assert_eq!(records[0].len(), 1);
    }

    #[test]
    fn header_only_sheet_yields_no_records() {
        let rows: SheetRows = vec![vec![text("Nombre")]];
        assert!(map_records(&rows).is_empty());
        assert!(map_records(&Vec::new()).is_empty());
    }

    #[test]
    fn empty_cells_stay_present_but_empty() {
        let rows: SheetRows = vec![
            vec![text("Nombre"), text("Cantidad")],
            vec![text("Router A"), CellValue::Empty],
        ];
        let records = map_records(&rows);
        assert!(records[0].contains_key("cantidad"));
        assert_eq!(records[0].text(&["cantidad"]), None);
    }
}
