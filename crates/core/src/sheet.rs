use crate::error::IngestError;
use crate::models::{CellValue, TabularRow};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::collections::BTreeMap;
use std::path::Path;

/// Reads the first worksheet; the first row holds the column headers.
pub fn read_sheet_rows(path: &Path) -> Result<Vec<TabularRow>, IngestError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range_at(0).ok_or_else(|| {
        IngestError::Spreadsheet(format!("workbook has no worksheets: {}", path.display()))
    })??;

    Ok(rows_from_range(&range))
}

pub fn rows_from_range(range: &Range<Data>) -> Vec<TabularRow> {
    let mut rows = range.rows();
    let headers: Vec<Option<String>> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| cell_value(cell).as_text())
            .collect(),
        None => return Vec::new(),
    };

    rows.enumerate()
        .filter_map(|(index, cells)| {
            let columns: BTreeMap<String, CellValue> = headers
                .iter()
                .zip(cells.iter())
                .filter_map(|(header, cell)| {
                    header
                        .as_ref()
                        .map(|name| (name.clone(), cell_value(cell)))
                })
                .collect();

            if columns.values().all(CellValue::is_empty) {
                return None;
            }

            Some(TabularRow {
                // 1-based, counting the header row, as spreadsheet tools do.
                row_number: index + 2,
                columns,
            })
        })
        .collect()
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Float(value) => CellValue::Number(*value),
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Bool(value) => CellValue::Bool(*value),
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_range() -> Range<Data> {
        let mut range = Range::new((0, 0), (3, 5));
        let headers = ["Category", "Brand", "Product Name", "Full Description", "Price", "Stock"];
        for (column, header) in headers.iter().enumerate() {
            range.set_value((0, column as u32), Data::String(header.to_string()));
        }

        range.set_value((1, 0), Data::String("Laptops".to_string()));
        range.set_value((1, 1), Data::String("Lenovo".to_string()));
        range.set_value((1, 2), Data::Float(12345.0));
        range.set_value((1, 3), Data::String("14 inch".to_string()));
        range.set_value((1, 4), Data::Float(849.0));
        range.set_value((1, 5), Data::String("In Stock".to_string()));

        range.set_value((3, 2), Data::String("ThinkPad X1".to_string()));
        range
    }

    #[test]
    fn rows_are_keyed_by_header() {
        let rows = rows_from_range(&sample_range());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(
            rows[0].column("product name"),
            Some(&CellValue::Number(12345.0))
        );
        assert_eq!(rows[0].column("Price"), Some(&CellValue::Number(849.0)));
    }

    #[test]
    fn blank_rows_are_skipped_but_sparse_rows_are_kept() {
        let rows = rows_from_range(&sample_range());

        assert_eq!(rows[1].row_number, 4);
        assert_eq!(rows[1].column("Category"), Some(&CellValue::Empty));
        assert_eq!(
            rows[1].column("Product Name"),
            Some(&CellValue::Text("ThinkPad X1".to_string()))
        );
    }

    #[test]
    fn missing_workbook_is_a_document_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("catalog.xlsx");
        std::fs::write(&path, b"not a zip archive")?;

        assert!(matches!(
            read_sheet_rows(&path),
            Err(IngestError::Spreadsheet(_))
        ));
        Ok(())
    }
}
