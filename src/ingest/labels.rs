//! Column label normalization and the column layout of an ingest run.

use crate::config::SourceConfig;
use crate::error::{ExplorerError, Result};
use crate::store::FIXED_COLUMNS;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Normalizes a column label: every line break becomes one space, then the
/// result is trimmed. Idempotent.
pub fn normalize_label(label: &str) -> String {
    label
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// A passthrough or indicator column: its normalized name and the source
/// column index its values come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub name: String,
    pub index: usize,
}

/// Where each output column of the flat table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub label: usize,
    pub year: usize,
    /// Market classification column; `None` when the sheet has none.
    pub classification: Option<usize>,
    pub passthrough: Vec<SourceColumn>,
    pub indicators: Vec<SourceColumn>,
    /// Normalized labels that more than one raw column mapped to.
    pub duplicates: Vec<String>,
}

impl ColumnLayout {
    /// Builds the layout from raw header labels.
    ///
    /// Indicator columns are every column that is not the label, year,
    /// classification or a passthrough column. When two raw columns normalize to
    /// the same label, the later one supplies the values and the column keeps
    /// the position where the label first appeared.
    pub fn from_header(header: &[String], source: &SourceConfig) -> Result<Self> {
        let normalized: Vec<String> = header.iter().map(|h| normalize_label(h)).collect();

        let locate = |wanted: &str| {
            let wanted = normalize_label(wanted);
            normalized.iter().rposition(|n| *n == wanted)
        };
        let require = |wanted: &str, what: &str| -> Result<usize> {
            locate(wanted).ok_or_else(|| {
                ExplorerError::ingest(format!(
                    "{what} column '{}' not found in header",
                    normalize_label(wanted)
                ))
            })
        };

        let label = require(&source.label_column, "Label")?;
        let year = require(&source.year_column, "Year")?;
        let classification = locate(&source.classification_column);
        if classification.is_none() {
            warn!(
                column = %normalize_label(&source.classification_column),
                "Classification column not found, market classification will be empty"
            );
        }

        let passthrough_names: Vec<String> = source
            .passthrough_columns
            .iter()
            .map(|p| normalize_label(p))
            .collect();

        let reserved = [
            normalize_label(&source.label_column),
            normalize_label(&source.year_column),
            normalize_label(&source.classification_column),
        ];

        let mut passthrough: Vec<SourceColumn> = Vec::new();
        let mut indicators: Vec<SourceColumn> = Vec::new();
        let mut positions: HashMap<String, (bool, usize)> = HashMap::new();
        let mut duplicates: Vec<String> = Vec::new();

        for (index, name) in normalized.iter().enumerate() {
            if reserved.contains(name) {
                continue;
            }
            if FIXED_COLUMNS.contains(&name.as_str()) {
                warn!(column = %name, "Skipping source column that shadows a fixed column");
                continue;
            }

            let is_passthrough = passthrough_names.contains(name);
            match positions.get(name) {
                Some(&(was_passthrough, slot)) => {
                    debug!(column = %name, index, "Duplicate normalized label, later column wins");
                    if !duplicates.contains(name) {
                        duplicates.push(name.clone());
                    }
                    let target = if was_passthrough {
                        &mut passthrough
                    } else {
                        &mut indicators
                    };
                    target[slot].index = index;
                }
                None => {
                    let target = if is_passthrough {
                        &mut passthrough
                    } else {
                        &mut indicators
                    };
                    positions.insert(name.clone(), (is_passthrough, target.len()));
                    target.push(SourceColumn {
                        name: name.clone(),
                        index,
                    });
                }
            }
        }

        Ok(Self {
            label,
            year,
            classification,
            passthrough,
            indicators,
            duplicates,
        })
    }

    /// Names of the indicator columns, in table order.
    pub fn indicator_names(&self) -> Vec<String> {
        self.indicators.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("GDP\nGrowth "), "GDP Growth");
        assert_eq!(normalize_label("  Inflation\r\nRate\n"), "Inflation Rate");
        assert_eq!(normalize_label("a\rb"), "a b");
        assert_eq!(normalize_label("Plain"), "Plain");
        assert_eq!(normalize_label("   "), "");
    }

    #[test]
    fn test_normalize_label_is_idempotent() {
        for raw in ["GDP\nGrowth ", " x \n y ", "\n\nz", "Debt\r\n(% of GDP)"] {
            let once = normalize_label(raw);
            assert_eq!(normalize_label(&once), once);
        }
    }

    #[test]
    fn test_layout_locates_fixed_columns() {
        let layout = ColumnLayout::from_header(
            &header(&["Country", "Code", "IMF-ADV-EMDE", "Year", "GDP\nGrowth ", "code-2", "Debt"]),
            &SourceConfig::default(),
        )
        .unwrap();

        assert_eq!(layout.label, 0);
        assert_eq!(layout.classification, Some(2));
        assert_eq!(layout.year, 3);
        assert_eq!(
            layout.passthrough,
            vec![
                SourceColumn { name: "Code".into(), index: 1 },
                SourceColumn { name: "code-2".into(), index: 5 },
            ]
        );
        assert_eq!(layout.indicator_names(), vec!["GDP Growth", "Debt"]);
        assert!(layout.duplicates.is_empty());
    }

    #[test]
    fn test_layout_duplicate_labels_last_wins() {
        let layout = ColumnLayout::from_header(
            &header(&["Country", "Year", "IMF-ADV-EMDE", "GDP\nGrowth", "Debt", "GDP Growth "]),
            &SourceConfig::default(),
        )
        .unwrap();

        assert_eq!(
            layout.indicators,
            vec![
                SourceColumn { name: "GDP Growth".into(), index: 5 },
                SourceColumn { name: "Debt".into(), index: 4 },
            ]
        );
        assert_eq!(layout.duplicates, vec!["GDP Growth"]);
    }

    #[test]
    fn test_layout_missing_label_column() {
        let err = ColumnLayout::from_header(
            &header(&["Nation", "Year", "IMF-ADV-EMDE"]),
            &SourceConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("'Country' not found"));
    }

    #[test]
    fn test_layout_without_classification_column() {
        let layout = ColumnLayout::from_header(
            &header(&["Country", "Year", "GDP"]),
            &SourceConfig::default(),
        )
        .unwrap();
        assert_eq!(layout.classification, None);
        assert_eq!(layout.indicator_names(), vec!["GDP"]);

        let err = ColumnLayout::from_header(&header(&["Country", "GDP"]), &SourceConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("'Year' not found"));
    }

    #[test]
    fn test_layout_skips_columns_shadowing_fixed_names() {
        let layout = ColumnLayout::from_header(
            &header(&["Country", "Year", "IMF-ADV-EMDE", "economic_group", "Debt"]),
            &SourceConfig::default(),
        )
        .unwrap();
        assert_eq!(layout.indicator_names(), vec!["Debt"]);
    }
}
