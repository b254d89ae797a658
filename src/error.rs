//! Error types for income-explorer.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for ingestion and query operations.
#[derive(Error, Debug)]
pub enum ExplorerError {
    /// The persisted table cannot be reached (file missing, pool closed, I/O).
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store was reachable but rejected the operation (no such table, bad SQL).
    #[error("Store error: {0}")]
    Store(String),

    /// The source spreadsheet could not be opened or decoded.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// The spreadsheet layout does not allow an ingestion run (missing columns, etc.)
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Configuration errors (invalid config file, bad overrides, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExplorerError {
    /// Creates a store-unavailable error with the given message.
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Creates a store error with the given message.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Creates a spreadsheet error with the given message.
    pub fn spreadsheet(msg: impl Into<String>) -> Self {
        Self::Spreadsheet(msg.into())
    }

    /// Creates an ingest error with the given message.
    pub fn ingest(msg: impl Into<String>) -> Self {
        Self::Ingest(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "Store Unavailable",
            Self::Store(_) => "Store Error",
            Self::Spreadsheet(_) => "Spreadsheet Error",
            Self::Ingest(_) => "Ingest Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true if the error means the store could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

/// Result type alias using ExplorerError.
pub type Result<T> = std::result::Result<T, ExplorerError>;
