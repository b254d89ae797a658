//! Spreadsheet input: cell types and file loading.
//!
//! ```text
//!  .xlsx / .xls / .ods / .csv
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ read_sheet │  header row split from data rows, source order kept
//!   └───────────┘
//!        │
//!        ▼
//!   RawSheet { header, records }
//! ```

mod delimited;
mod workbook;

use crate::error::{ExplorerError, Result};
use std::path::Path;

/// A single spreadsheet cell as read from the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Spreadsheet error value such as `#N/A` or `#DIV/0!`.
    Error(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Guesses the cell type of a delimited-text field.
    pub fn from_field(field: &str) -> Self {
        if field.trim().is_empty() {
            return Cell::Empty;
        }
        if let Ok(i) = field.trim().parse::<i64>() {
            return Cell::Int(i);
        }
        if let Ok(f) = field.trim().parse::<f64>() {
            return Cell::Float(f);
        }
        Cell::Text(field.to_string())
    }

    /// Renders the cell as a row label. Empty, boolean and error cells have none.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Cell::Text(s) if !s.trim().is_empty() => Some(s.clone()),
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) if f.is_finite() => Some(format_number(*f)),
            _ => None,
        }
    }

    /// Interprets the cell as a whole year.
    pub fn as_year(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            Cell::Text(s) => {
                let trimmed = s.trim();
                trimmed.parse::<i64>().ok().or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && f.fract() == 0.0)
                        .map(|f| f as i64)
                })
            }
            _ => None,
        }
    }

    /// Interprets the cell as an indicator value. Anything non-numeric is `None`.
    pub fn as_number(&self) -> Option<f64> {
        let number = match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Empty | Cell::Bool(_) | Cell::Error(_) => None,
        };
        number.filter(|n| n.is_finite())
    }

    /// Renders the cell as stored text for classification fields.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty | Cell::Error(_) => None,
            Cell::Text(s) if s.is_empty() => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) => Some(format_number(*f)),
            Cell::Bool(b) => Some(b.to_string()),
        }
    }

    /// Returns true for cells with no content.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// Formats whole floats without a fractional part (`2020.0` → `2020`).
fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// One data row of the source, with its 1-based row number in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub row: usize,
    pub cells: Vec<Cell>,
}

impl RawRecord {
    /// Creates a record from its row number and cells.
    pub fn new(row: usize, cells: Vec<Cell>) -> Self {
        Self { row, cells }
    }

    /// Returns the cell at a column index; ragged rows read as empty.
    pub fn cell(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&EMPTY_CELL)
    }

    /// Returns true if every cell is empty.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }
}

/// A whole sheet: raw header labels plus data rows in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub header: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawSheet {
    /// Builds a sheet from a header and rows of cells, numbering rows from 2.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, cells)| RawRecord::new(i + 2, cells))
            .collect();
        Self { header, records }
    }
}

/// Returns the header label for a header cell; blank headers get a positional name.
pub(crate) fn header_label(raw: &str, index: usize) -> String {
    if raw.trim().is_empty() {
        format!("Unnamed: {index}")
    } else {
        raw.to_string()
    }
}

/// Load a spreadsheet from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xls` / `.ods` – first worksheet unless `sheet` names one
/// * `.csv` – comma-separated, first line is the header
pub fn read_sheet(path: &Path, sheet: Option<&str>) -> Result<RawSheet> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => workbook::read_workbook(path, sheet),
        "csv" => delimited::read_csv(path),
        other => Err(ExplorerError::spreadsheet(format!(
            "Unsupported file extension: .{other}"
        ))),
    }
}
