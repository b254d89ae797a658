//! Workbook loader (xlsx, xls, ods) backed by calamine.

use super::{header_label, Cell, RawRecord, RawSheet};
use crate::error::{ExplorerError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::debug;

/// Reads one worksheet. The first row of the used range is the header.
pub(super) fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<RawSheet> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        ExplorerError::spreadsheet(format!("Failed to open {}: {e}", path.display()))
    })?;

    let range = match sheet {
        Some(name) => workbook.worksheet_range(name).map_err(|e| {
            ExplorerError::spreadsheet(format!("Failed to read sheet '{name}': {e}"))
        })?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ExplorerError::spreadsheet("Workbook has no worksheets"))?
            .map_err(|e| ExplorerError::spreadsheet(format!("Failed to read first sheet: {e}")))?,
    };

    // Row numbers follow the sheet, so offset by where the used range starts.
    let first_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let mut rows = range.rows();

    let header = match rows.next() {
        Some(cells) => cells
            .iter()
            .enumerate()
            .map(|(i, cell)| header_label(&cell.to_string(), i))
            .collect(),
        None => return Ok(RawSheet::default()),
    };

    let records: Vec<RawRecord> = rows
        .enumerate()
        .map(|(i, cells)| {
            RawRecord::new(first_row + 1 + i, cells.iter().map(convert_cell).collect())
        })
        .collect();

    debug!(
        path = %path.display(),
        columns = records.first().map(|r| r.cells.len()).unwrap_or(0),
        rows = records.len(),
        "Workbook sheet loaded"
    );

    Ok(RawSheet { header, records })
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::Error(e) => Cell::Error(e.to_string()),
        other => Cell::Text(other.to_string()),
    }
}
