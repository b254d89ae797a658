//! Market classification code translation.

use std::collections::BTreeMap;

/// Raw code for advanced economies in the source sheet.
pub const ADVANCED_CODE: &str = "ADV-E";
/// Raw code for emerging market and developing economies.
pub const EMERGING_CODE: &str = "EMDE-E";

/// Returns the default code table.
pub fn default_codes() -> BTreeMap<String, String> {
    BTreeMap::from([
        (ADVANCED_CODE.to_string(), "Advanced Economies".to_string()),
        (
            EMERGING_CODE.to_string(),
            "Emerging Market and Developing Economies".to_string(),
        ),
    ])
}

/// Translates raw classification codes through a fixed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketClassifier {
    codes: BTreeMap<String, String>,
}

impl MarketClassifier {
    pub fn new(codes: BTreeMap<String, String>) -> Self {
        Self { codes }
    }

    /// Maps a raw code to its label. Unknown codes pass through unchanged.
    pub fn translate(&self, raw: &str) -> String {
        self.codes
            .get(raw)
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }
}

impl Default for MarketClassifier {
    fn default() -> Self {
        Self::new(default_codes())
    }
}
