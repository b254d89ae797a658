//! Integration tests for income-explorer.

pub mod ingest_test;
pub mod query_test;
pub mod store_test;

use std::path::PathBuf;

/// Path of the sample workbook export shared by the integration tests.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
