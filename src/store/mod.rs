//! Table store abstraction for income-explorer.
//!
//! Provides a trait-based interface over the persisted flat table, allowing
//! the SQLite backend and the in-memory backend to be used interchangeably.

mod memory;
mod sqlite;
mod types;

pub use memory::{FailingStore, MemoryStore};
pub use sqlite::SqliteStore;
pub use types::{ColumnDef, ColumnKind, Predicate, RowSet, Value};

use crate::error::Result;
use async_trait::async_trait;

/// Column holding the country label of each record.
pub const COUNTRY_COLUMN: &str = "country";
/// Column holding the observation year.
pub const YEAR_COLUMN: &str = "year";
/// Column holding the group label assigned during ingestion.
pub const ECONOMIC_GROUP_COLUMN: &str = "economic_group";
/// Column holding the translated market classification.
pub const MARKET_CLASSIFICATION_COLUMN: &str = "market_classification";

/// Columns every ingested table starts with, in order.
pub const FIXED_COLUMNS: [&str; 4] = [
    COUNTRY_COLUMN,
    YEAR_COLUMN,
    ECONOMIC_GROUP_COLUMN,
    MARKET_CLASSIFICATION_COLUMN,
];

/// Trait defining the interface for table stores.
///
/// Every call acquires whatever handle it needs and releases it before
/// returning. `replace` must be atomic: readers observe either the previous
/// table or the complete new one.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Returns every row of the table, in storage order.
    async fn load(&self, table: &str) -> Result<RowSet>;

    /// Returns the rows matching all predicates, in storage order.
    async fn load_filtered(&self, table: &str, predicates: &[Predicate]) -> Result<RowSet>;

    /// Replaces the whole table with the given row set.
    async fn replace(&self, table: &str, rows: &RowSet) -> Result<()>;

    /// Returns the table's column names in table order. Empty if the table is absent.
    async fn list_columns(&self, table: &str) -> Result<Vec<String>>;

    /// Returns the distinct values of a column among matching rows, ascending.
    async fn distinct_values(
        &self,
        table: &str,
        column: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Value>>;

    /// Counter bumped by every successful `replace` through this store.
    fn generation(&self) -> u64;

    /// Closes the store.
    async fn close(&self) -> Result<()>;
}
