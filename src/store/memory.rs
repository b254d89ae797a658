//! In-memory table stores for testing.
//!
//! [`MemoryStore`] keeps whole row sets behind a lock and swaps them on replace.
//! [`FailingStore`] simulates an unreachable backend.

use super::{Predicate, RowSet, TableStore, Value};
use crate::error::{ExplorerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// A table store that keeps every table in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, RowSet>>,
    generation: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one table.
    pub fn with_table(table: &str, rows: RowSet) -> Self {
        let store = Self::new();
        if let Ok(mut tables) = store.tables.write() {
            tables.insert(table.to_string(), rows);
        }
        store
    }

    fn snapshot(&self, table: &str) -> Result<RowSet> {
        let tables = self
            .tables
            .read()
            .map_err(|_| ExplorerError::store_unavailable("memory store lock poisoned"))?;
        tables
            .get(table)
            .cloned()
            .ok_or_else(|| ExplorerError::store(format!("no such table: {table}")))
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn load(&self, table: &str) -> Result<RowSet> {
        self.snapshot(table)
    }

    async fn load_filtered(&self, table: &str, predicates: &[Predicate]) -> Result<RowSet> {
        Ok(self.snapshot(table)?.filtered(predicates))
    }

    async fn replace(&self, table: &str, rows: &RowSet) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| ExplorerError::store_unavailable("memory store lock poisoned"))?;
        tables.insert(table.to_string(), rows.clone());
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| ExplorerError::store_unavailable("memory store lock poisoned"))?;
        Ok(tables
            .get(table)
            .map(RowSet::column_names)
            .unwrap_or_default())
    }

    async fn distinct_values(
        &self,
        table: &str,
        column: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Value>> {
        let rows = self.snapshot(table)?.filtered(predicates);
        let index = rows
            .column_index(column)
            .ok_or_else(|| ExplorerError::store(format!("no such column: {column}")))?;

        let mut values: Vec<Value> = rows
            .rows
            .into_iter()
            .map(|mut row| row.swap_remove(index))
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        Ok(values)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A table store whose every operation fails as unreachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

impl FailingStore {
    fn unavailable<T>() -> Result<T> {
        Err(ExplorerError::store_unavailable("store is offline"))
    }
}

#[async_trait]
impl TableStore for FailingStore {
    async fn load(&self, _table: &str) -> Result<RowSet> {
        Self::unavailable()
    }

    async fn load_filtered(&self, _table: &str, _predicates: &[Predicate]) -> Result<RowSet> {
        Self::unavailable()
    }

    async fn replace(&self, _table: &str, _rows: &RowSet) -> Result<()> {
        Self::unavailable()
    }

    async fn list_columns(&self, _table: &str) -> Result<Vec<String>> {
        Self::unavailable()
    }

    async fn distinct_values(
        &self,
        _table: &str,
        _column: &str,
        _predicates: &[Predicate],
    ) -> Result<Vec<Value>> {
        Self::unavailable()
    }

    fn generation(&self) -> u64 {
        0
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
