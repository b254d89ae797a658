//! income-explorer - normalize income-group spreadsheets into a flat indicator
//! table and query it by country, year and indicator.
//!
//! This library exposes the core modules for use by the binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod query;
pub mod sheet;
pub mod store;
