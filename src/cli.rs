//! Command-line argument parsing for income-explorer.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ingest income-group spreadsheets and query the normalized indicators.
#[derive(Parser, Debug)]
#[command(name = "income-explorer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH", env = "INCOME_EXPLORER_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(short = 'd', long, global = true, value_name = "PATH", env = "INCOME_EXPLORER_DB")]
    pub database: Option<PathBuf>,

    /// Table name (overrides config)
    #[arg(short = 't', long, global = true, value_name = "NAME")]
    pub table: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load a spreadsheet and replace the table
    Ingest {
        /// Spreadsheet to load (.xlsx, .xls, .ods or .csv); defaults to the configured one
        #[arg(value_name = "FILE")]
        source: Option<PathBuf>,

        /// Worksheet name (defaults to the first sheet)
        #[arg(long, value_name = "NAME")]
        sheet: Option<String>,
    },

    /// List distinct countries
    Countries,

    /// List distinct years
    Years {
        /// Restrict to one country
        #[arg(short, long)]
        country: Option<String>,
    },

    /// List indicator columns
    Indicators,

    /// Show the stored column an indicator name resolves to
    Resolve {
        /// Indicator name as you would type it
        name: String,
    },

    /// Fetch one indicator
    Data {
        /// Indicator name
        #[arg(short, long)]
        indicator: String,

        #[arg(short, long)]
        country: Option<String>,

        #[arg(short, long)]
        year: Option<i64>,
    },

    /// Dump complete rows
    Rows {
        #[arg(short, long)]
        country: Option<String>,

        #[arg(short, long)]
        year: Option<i64>,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(income_explorer::config::Config::default_path)
    }
}
