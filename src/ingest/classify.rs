//! Row classification and group assignment.
//!
//! Group headers are recognised only by their label being all uppercase.
//! [`classify`] tags each row, and [`GroupScan`] folds the tagged rows top to
//! bottom, threading the current group through.

use super::labels::ColumnLayout;
use crate::sheet::RawRecord;
use serde::Serialize;

/// A data row that passed classification.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub record: RawRecord,
    pub country: String,
    pub year: i64,
}

/// Result of classifying one source row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    /// A group header; its label becomes the group of the following rows.
    Header(String),
    /// A country data row.
    Data(DataRow),
}

/// Why a row was dropped during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SkipReason {
    /// The label cell is empty or holds a non-text value.
    UnreadableLabel,
    /// The year cell is missing or not a whole number.
    InvalidYear(String),
    /// A data row that appears before the first group header.
    BeforeFirstGroup,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnreadableLabel => write!(f, "label cell is not text"),
            Self::InvalidYear(raw) => write!(f, "year '{raw}' is not a whole number"),
            Self::BeforeFirstGroup => write!(f, "row precedes the first group header"),
        }
    }
}

/// A dropped row and the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub label: Option<String>,
    pub reason: SkipReason,
}

/// Returns true for group labels: non-empty, equal to their upper-cased form,
/// and containing at least one cased character.
pub fn is_group_label(label: &str) -> bool {
    let has_cased = label.chars().any(|c| c.is_uppercase() || c.is_lowercase());
    has_cased && label.to_uppercase() == label
}

/// Classifies one source row as a group header or a data row.
pub fn classify(record: RawRecord, layout: &ColumnLayout) -> Result<RowKind, SkippedRow> {
    let Some(label) = record.cell(layout.label).as_label() else {
        return Err(SkippedRow {
            row: record.row,
            label: None,
            reason: SkipReason::UnreadableLabel,
        });
    };

    if is_group_label(&label) {
        return Ok(RowKind::Header(label));
    }

    let year_cell = record.cell(layout.year);
    let Some(year) = year_cell.as_year() else {
        return Err(SkippedRow {
            row: record.row,
            label: Some(label),
            reason: SkipReason::InvalidYear(year_cell.as_text().unwrap_or_default()),
        });
    };

    Ok(RowKind::Data(DataRow {
        record,
        country: label,
        year,
    }))
}

/// A data row with the group it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRow {
    pub group: String,
    pub row: DataRow,
}

/// Accumulator of the group-assignment fold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupScan {
    /// Label of the most recent header, `None` before the first one.
    pub current: Option<String>,
    /// Header labels in the order they were seen.
    pub groups: Vec<String>,
    /// Data rows with their group, in source order.
    pub rows: Vec<GroupedRow>,
    /// Data rows dropped because no header preceded them.
    pub orphans: Vec<SkippedRow>,
}

impl GroupScan {
    /// Folds one classified row into the scan.
    pub fn step(mut self, kind: RowKind) -> Self {
        match kind {
            RowKind::Header(label) => {
                self.groups.push(label.clone());
                self.current = Some(label);
            }
            RowKind::Data(row) => match &self.current {
                Some(group) => self.rows.push(GroupedRow {
                    group: group.clone(),
                    row,
                }),
                None => self.orphans.push(SkippedRow {
                    row: row.record.row,
                    label: Some(row.country),
                    reason: SkipReason::BeforeFirstGroup,
                }),
            },
        }
        self
    }
}

/// Assigns every data row to its enclosing group in one top-to-bottom pass.
pub fn assign_groups<I>(rows: I) -> GroupScan
where
    I: IntoIterator<Item = RowKind>,
{
    rows.into_iter().fold(GroupScan::default(), GroupScan::step)
}
