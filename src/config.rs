//! Configuration management for income-explorer.
//!
//! Handles loading configuration from TOML files, with defaults that match the
//! layout of the income-groups workbook.

use crate::error::{ExplorerError, Result};
use crate::ingest::default_codes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where the normalized table is persisted.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// How the source spreadsheet is laid out.
    #[serde(default)]
    pub source: SourceConfig,
}

/// Persisted table location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Name of the flat table.
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("income.db")
}

fn default_table() -> String {
    "income_data".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            table: default_table(),
        }
    }
}

/// Source spreadsheet layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Default spreadsheet to ingest when none is given on the command line.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Worksheet name; the first sheet is used when unset.
    #[serde(default)]
    pub sheet: Option<String>,

    /// Column holding country names and group header labels.
    #[serde(default = "default_label_column")]
    pub label_column: String,

    /// Column holding the observation year.
    #[serde(default = "default_year_column")]
    pub year_column: String,

    /// Column holding the raw market classification code.
    #[serde(default = "default_classification_column")]
    pub classification_column: String,

    /// Classification fields copied through as text instead of indicators.
    #[serde(default = "default_passthrough_columns")]
    pub passthrough_columns: Vec<String>,

    /// Raw classification code → stored label.
    #[serde(default = "default_codes")]
    pub classification_codes: BTreeMap<String, String>,
}

fn default_label_column() -> String {
    "Country".to_string()
}

fn default_year_column() -> String {
    "Year".to_string()
}

fn default_classification_column() -> String {
    "IMF-ADV-EMDE".to_string()
}

fn default_passthrough_columns() -> Vec<String> {
    vec!["Code".to_string(), "code-2".to_string()]
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            sheet: None,
            label_column: default_label_column(),
            year_column: default_year_column(),
            classification_column: default_classification_column(),
            passthrough_columns: default_passthrough_columns(),
            classification_codes: default_codes(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("income-explorer")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ExplorerError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ExplorerError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies command-line overrides, which take precedence over the file.
    pub fn apply_overrides(&mut self, database: Option<&Path>, table: Option<&str>) {
        if let Some(path) = database {
            self.database.path = path.to_path_buf();
        }
        if let Some(table) = table {
            self.database.table = table.to_string();
        }
    }

    /// Returns the spreadsheet to ingest: the explicit one, else the configured one.
    pub fn source_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.source.path.clone())
            .ok_or_else(|| {
                ExplorerError::config("No spreadsheet given and no [source] path configured")
            })
    }
}
