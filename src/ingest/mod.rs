//! Ingestion transform.
//!
//! Turns a visually grouped spreadsheet into the flat table:
//!
//! ```text
//!   RawSheet ──► ColumnLayout (normalized labels, fixed columns located)
//!            ──► classify each row (Header | Data | skipped)
//!            ──► assign_groups fold (current group threaded top to bottom)
//!            ──► NormalizedRecords ──► RowSet ──► TableStore::replace
//! ```
//!
//! The transform is pure and deterministic; only [`Ingestor::run`] touches I/O.

mod classify;
mod labels;
mod market;

pub use classify::{
    assign_groups, classify, is_group_label, DataRow, GroupScan, GroupedRow, RowKind,
    SkipReason, SkippedRow,
};
pub use labels::{normalize_label, ColumnLayout, SourceColumn};
pub use market::{default_codes, MarketClassifier};

use crate::config::SourceConfig;
use crate::error::{ExplorerError, Result};
use crate::sheet::{read_sheet, RawSheet};
use crate::store::{
    ColumnDef, ColumnKind, RowSet, TableStore, Value, COUNTRY_COLUMN, ECONOMIC_GROUP_COLUMN,
    MARKET_CLASSIFICATION_COLUMN, YEAR_COLUMN,
};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// One data row after the transform.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub country: String,
    pub year: i64,
    pub economic_group: String,
    pub market_classification: Option<String>,
    /// Passthrough classification fields, aligned with `ColumnLayout::passthrough`.
    pub passthrough: Vec<Option<String>>,
    /// Indicator values, aligned with `ColumnLayout::indicators`.
    pub indicators: Vec<Option<f64>>,
}

/// Output of the pure transform step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub layout: ColumnLayout,
    pub records: Vec<NormalizedRecord>,
    pub groups: Vec<String>,
    pub skipped: Vec<SkippedRow>,
}

impl Transformed {
    /// Lays the records out as the flat table, fixed columns first.
    pub fn to_row_set(&self) -> RowSet {
        let mut columns = vec![
            ColumnDef::new(COUNTRY_COLUMN, ColumnKind::Text),
            ColumnDef::new(YEAR_COLUMN, ColumnKind::Integer),
            ColumnDef::new(ECONOMIC_GROUP_COLUMN, ColumnKind::Text),
            ColumnDef::new(MARKET_CLASSIFICATION_COLUMN, ColumnKind::Text),
        ];
        columns.extend(
            self.layout
                .passthrough
                .iter()
                .map(|c| ColumnDef::new(c.name.clone(), ColumnKind::Text)),
        );
        columns.extend(
            self.layout
                .indicators
                .iter()
                .map(|c| ColumnDef::new(c.name.clone(), ColumnKind::Real)),
        );

        let rows = self
            .records
            .iter()
            .map(|r| {
                let mut row = Vec::with_capacity(columns.len());
                row.push(Value::from(r.country.as_str()));
                row.push(Value::Int(r.year));
                row.push(Value::from(r.economic_group.as_str()));
                row.push(Value::from(r.market_classification.clone()));
                row.extend(r.passthrough.iter().cloned().map(Value::from));
                row.extend(r.indicators.iter().copied().map(Value::from));
                row
            })
            .collect();

        RowSet { columns, rows }
    }
}

/// Runs the whole transform on an in-memory sheet.
pub fn transform(sheet: RawSheet, source: &SourceConfig) -> Result<Transformed> {
    let layout = ColumnLayout::from_header(&sheet.header, source)?;
    let classifier = MarketClassifier::new(source.classification_codes.clone());

    let mut skipped: Vec<SkippedRow> = Vec::new();
    let kinds = sheet
        .records
        .into_iter()
        .filter(|record| {
            if record.is_blank() {
                debug!(row = record.row, "Ignoring blank row");
            }
            !record.is_blank()
        })
        .filter_map(|record| match classify(record, &layout) {
            Ok(kind) => Some(kind),
            Err(skip) => {
                warn!(row = skip.row, label = ?skip.label, "Skipping malformed row: {}", skip.reason);
                skipped.push(skip);
                None
            }
        });

    let scan = assign_groups(kinds);

    for orphan in &scan.orphans {
        warn!(row = orphan.row, label = ?orphan.label, "Skipping malformed row: {}", orphan.reason);
    }
    skipped.extend(scan.orphans);
    skipped.sort_by_key(|s| s.row);

    let records = scan
        .rows
        .into_iter()
        .map(|grouped| build_record(grouped, &layout, &classifier))
        .collect();

    Ok(Transformed {
        layout,
        records,
        groups: scan.groups,
        skipped,
    })
}

fn build_record(
    grouped: GroupedRow,
    layout: &ColumnLayout,
    classifier: &MarketClassifier,
) -> NormalizedRecord {
    let GroupedRow { group, row } = grouped;
    let record = &row.record;

    let market_classification = layout
        .classification
        .and_then(|index| record.cell(index).as_text())
        .map(|code| classifier.translate(&code));

    NormalizedRecord {
        country: row.country.clone(),
        year: row.year,
        economic_group: group,
        market_classification,
        passthrough: layout
            .passthrough
            .iter()
            .map(|c| record.cell(c.index).as_text())
            .collect(),
        indicators: layout
            .indicators
            .iter()
            .map(|c| record.cell(c.index).as_number())
            .collect(),
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub table: String,
    pub records: usize,
    pub groups: Vec<String>,
    pub indicators: Vec<String>,
    pub duplicate_labels: Vec<String>,
    pub skipped: Vec<SkippedRow>,
}

/// Runs ingestion against a table store.
pub struct Ingestor<'a> {
    store: &'a dyn TableStore,
    table: &'a str,
    source: &'a SourceConfig,
}

impl<'a> Ingestor<'a> {
    /// Creates a new ingestor writing to `table`.
    pub fn new(store: &'a dyn TableStore, table: &'a str, source: &'a SourceConfig) -> Self {
        Self {
            store,
            table,
            source,
        }
    }

    /// Reads the spreadsheet at `path` and replaces the table with its contents.
    pub async fn run(&self, path: &Path) -> Result<IngestReport> {
        info!("Reading spreadsheet {}", path.display());
        let path_buf = path.to_path_buf();
        let sheet_name = self.source.sheet.clone();
        let sheet = tokio::task::spawn_blocking(move || {
            read_sheet(&path_buf, sheet_name.as_deref())
        })
        .await
        .map_err(|e| ExplorerError::internal(format!("Spreadsheet reader task failed: {e}")))??;

        self.ingest_sheet(sheet).await
    }

    /// Transforms an already-read sheet and replaces the table with it.
    ///
    /// On any error the previously ingested table is left untouched.
    pub async fn ingest_sheet(&self, sheet: RawSheet) -> Result<IngestReport> {
        let transformed = transform(sheet, self.source)?;
        let rows = transformed.to_row_set();

        self.store.replace(self.table, &rows).await?;

        let report = IngestReport {
            table: self.table.to_string(),
            records: transformed.records.len(),
            groups: transformed.groups,
            indicators: transformed.layout.indicator_names(),
            duplicate_labels: transformed.layout.duplicates,
            skipped: transformed.skipped,
        };
        info!(
            table = %report.table,
            records = report.records,
            groups = report.groups.len(),
            skipped = report.skipped.len(),
            "Ingestion complete"
        );
        Ok(report)
    }
}
