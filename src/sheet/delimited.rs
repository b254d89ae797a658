//! CSV loader.

use super::{header_label, Cell, RawRecord, RawSheet};
use crate::error::{ExplorerError, Result};
use std::path::Path;

/// Marker stored for fields that are not valid UTF-8.
pub(super) const INVALID_UTF8: &str = "invalid utf-8";

/// CSV layout: header row with column labels (quoted labels may span lines),
/// one data row per record. Rows may be ragged.
///
/// Fields are decoded one by one, so a stray non-UTF-8 byte only spoils its
/// own cell instead of the whole file.
pub(super) fn read_csv(path: &Path) -> Result<RawSheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| {
            ExplorerError::spreadsheet(format!("Failed to open {}: {e}", path.display()))
        })?;

    let header: Vec<String> = reader
        .byte_headers()
        .map_err(|e| ExplorerError::spreadsheet(format!("Failed to read CSV header: {e}")))?
        .iter()
        .enumerate()
        .map(|(i, h)| header_label(&String::from_utf8_lossy(h), i))
        .collect();

    let mut records = Vec::new();
    for (row_no, result) in reader.byte_records().enumerate() {
        let record = result.map_err(|e| {
            ExplorerError::spreadsheet(format!("CSV row {}: {e}", row_no + 2))
        })?;
        // Quoted fields can span lines, so prefer the reader's own line count.
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(row_no + 2);
        records.push(RawRecord::new(line, record.iter().map(decode_field).collect()));
    }

    Ok(RawSheet { header, records })
}

fn decode_field(raw: &[u8]) -> Cell {
    match std::str::from_utf8(raw) {
        Ok(field) => Cell::from_field(field),
        Err(_) => Cell::Error(INVALID_UTF8.to_string()),
    }
}
