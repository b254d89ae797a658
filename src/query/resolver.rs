//! Indicator name resolution.

use crate::ingest::normalize_label;
use std::collections::HashMap;

/// Maps caller-supplied indicator names to the exact stored column names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorResolver {
    by_normalized: HashMap<String, String>,
    known: Vec<String>,
}

impl IndicatorResolver {
    /// Builds a resolver over the stored indicator columns, in table order.
    ///
    /// If two stored names normalize to the same label, the later one wins.
    pub fn from_columns(columns: &[String]) -> Self {
        let by_normalized = columns
            .iter()
            .map(|stored| (normalize_label(stored), stored.clone()))
            .collect();
        Self {
            by_normalized,
            known: columns.to_vec(),
        }
    }

    /// Returns the stored column name for `requested`, if any.
    pub fn resolve(&self, requested: &str) -> Option<&str> {
        self.by_normalized
            .get(&normalize_label(requested))
            .map(String::as_str)
    }

    /// Stored indicator names, in table order.
    pub fn known(&self) -> &[String] {
        &self.known
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
