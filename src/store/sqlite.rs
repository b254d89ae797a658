//! SQLite table store.
//!
//! Persists the flat table in a local SQLite database through a `sqlx` pool.
//! Each operation acquires one pooled connection and returns it on drop.

use super::{ColumnDef, ColumnKind, Predicate, RowSet, TableStore, Value};
use crate::error::{ExplorerError, Result};
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteJournalMode,
    SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY_MS: u64 = 100;
const STAGING_SUFFIX: &str = "__staging";

/// Table store backed by a SQLite database file.
pub struct SqliteStore {
    pool: SqlitePool,
    db_path: Option<PathBuf>,
    generation: AtomicU64,
}

impl SqliteStore {
    /// Opens or creates the database at the specified path.
    pub async fn open(path: &Path) -> Result<Self> {
        Self::ensure_parent_dirs(path)?;

        let mut last_error = None;

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * 2u64.pow(attempt)))
                    .await;
            }

            match Self::connect(path).await {
                Ok(pool) => {
                    info!("Database opened at {}", path.display());
                    return Ok(Self {
                        pool,
                        db_path: Some(path.to_path_buf()),
                        generation: AtomicU64::new(0),
                    });
                }
                Err(e) => {
                    warn!("Failed to open database (attempt {}): {e}", attempt + 1);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ExplorerError::store_unavailable("Failed to open database after retries")
        }))
    }

    /// Opens a private in-memory database. Used by tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        // A single connection that never expires, since each :memory: connection
        // is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| map_store_error("Failed to open in-memory database", e))?;

        Ok(Self {
            pool,
            db_path: None,
            generation: AtomicU64::new(0),
        })
    }

    /// Creates a connection pool to the SQLite database.
    async fn connect(path: &Path) -> Result<SqlitePool> {
        let conn_str = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&conn_str)
            .map_err(|e| ExplorerError::config(format!("Invalid database path: {e}")))?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| map_store_error("Failed to connect to database", e))
    }

    /// Ensures parent directories exist for the database path.
    fn ensure_parent_dirs(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ExplorerError::store_unavailable(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        Ok(())
    }

    /// Returns the path to the database file, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| map_store_error("Failed to acquire connection", e))
    }

    /// Reads the declared columns of a table, in table order.
    async fn table_columns(conn: &mut SqliteConnection, table: &str) -> Result<Vec<ColumnDef>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT name, type FROM pragma_table_info(?) ORDER BY cid")
                .bind(table)
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| map_store_error("Failed to read table columns", e))?;

        Ok(rows
            .into_iter()
            .map(|(name, declared)| ColumnDef::new(name, ColumnKind::from_declared(&declared)))
            .collect())
    }

    /// Reads rows inside one read transaction, so the column list and the
    /// rows come from the same snapshot.
    async fn select(&self, table: &str, predicates: &[Predicate]) -> Result<RowSet> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_store_error("Failed to begin read transaction", e))?;

        let columns = Self::table_columns(&mut tx, table).await?;
        if columns.is_empty() {
            return Err(ExplorerError::store(format!("no such table: {table}")));
        }

        if predicates
            .iter()
            .any(|p| !columns.iter().any(|c| c.name == p.column))
        {
            return Ok(RowSet::new(columns));
        }

        let select_list = columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {select_list} FROM {}{} ORDER BY rowid",
            quote_ident(table),
            where_clause(predicates)
        );
        debug!(%sql, "Loading rows");

        let query = predicates
            .iter()
            .fold(sqlx::query(&sql), |q, p| bind_value(q, &p.value));
        let rows = query
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_store_error("Failed to load rows", e))?;

        tx.commit()
            .await
            .map_err(|e| map_store_error("Failed to end read transaction", e))?;

        Ok(RowSet {
            columns,
            rows: rows.iter().map(convert_row).collect(),
        })
    }

    /// Closes the connection pool.
    pub async fn shutdown(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TableStore for SqliteStore {
    async fn load(&self, table: &str) -> Result<RowSet> {
        self.select(table, &[]).await
    }

    async fn load_filtered(&self, table: &str, predicates: &[Predicate]) -> Result<RowSet> {
        self.select(table, predicates).await
    }

    async fn replace(&self, table: &str, rows: &RowSet) -> Result<()> {
        if rows.columns.is_empty() {
            return Err(ExplorerError::internal(format!(
                "Refusing to write table {table} without columns"
            )));
        }
        if let Some(bad) = rows.rows.iter().position(|r| r.len() != rows.columns.len()) {
            return Err(ExplorerError::internal(format!(
                "Row {bad} has {} values but the table has {} columns",
                rows.rows[bad].len(),
                rows.columns.len()
            )));
        }

        let staging = format!("{table}{STAGING_SUFFIX}");
        let column_defs = rows
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.kind.sql_type()))
            .collect::<Vec<_>>()
            .join(", ");
        let column_list = rows
            .columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; rows.columns.len()].join(", ");
        let insert_sql = format!(
            "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
            quote_ident(&staging)
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_store_error("Failed to begin transaction", e))?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(&staging)))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_store_error("Failed to drop stale staging table", e))?;

        sqlx::query(&format!(
            "CREATE TABLE {} ({column_defs})",
            quote_ident(&staging)
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_store_error("Failed to create staging table", e))?;

        for row in &rows.rows {
            row.iter()
                .fold(sqlx::query(&insert_sql), bind_value)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_store_error("Failed to insert row", e))?;
        }

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_store_error("Failed to drop previous table", e))?;

        sqlx::query(&format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(&staging),
            quote_ident(table)
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_store_error("Failed to publish staging table", e))?;

        tx.commit()
            .await
            .map_err(|e| map_store_error("Failed to commit table replacement", e))?;

        self.generation.fetch_add(1, Ordering::SeqCst);
        info!(table, rows = rows.len(), "Table replaced");
        Ok(())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut conn = self.acquire().await?;
        let columns = Self::table_columns(&mut conn, table).await?;
        Ok(columns.into_iter().map(|c| c.name).collect())
    }

    async fn distinct_values(
        &self,
        table: &str,
        column: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Value>> {
        let sql = format!(
            "SELECT DISTINCT {col} FROM {}{} ORDER BY {col}",
            quote_ident(table),
            where_clause(predicates),
            col = quote_ident(column),
        );

        let mut conn = self.acquire().await?;
        let query = predicates
            .iter()
            .fold(sqlx::query(&sql), |q, p| bind_value(q, &p.value));
        let rows = query
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_store_error("Failed to list distinct values", e))?;

        Ok(rows.iter().map(|row| convert_value(row, 0)).collect())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.shutdown().await;
        Ok(())
    }
}

/// Quotes an identifier for SQLite, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn where_clause(predicates: &[Predicate]) -> String {
    if predicates.is_empty() {
        return String::new();
    }
    let conditions = predicates
        .iter()
        .map(|p| format!("{} = ?", quote_ident(&p.column)))
        .collect::<Vec<_>>()
        .join(" AND ");
    format!(" WHERE {conditions}")
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.as_str()),
    }
}

/// Converts a sqlx SqliteRow to a row of values.
fn convert_row(row: &SqliteRow) -> Vec<Value> {
    (0..row.len()).map(|i| convert_value(row, i)).collect()
}

/// Converts a single column value, following the value's storage class.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => raw.type_info().name().to_uppercase(),
        _ => return Value::Null,
    };

    match type_name.as_str() {
        "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::Text)
            .or_else(|| row.try_get::<Option<i64>, _>(index).ok().flatten().map(Value::Int))
            .or_else(|| row.try_get::<Option<f64>, _>(index).ok().flatten().map(Value::from))
            .unwrap_or(Value::Null),
    }
}

/// Maps sqlx errors to store errors, separating "cannot reach the store" from
/// "the store rejected this operation".
fn map_store_error(context: &str, error: sqlx::Error) -> ExplorerError {
    let message = format!("{context}: {error}");
    let unavailable = match &error {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => true,
        sqlx::Error::Database(db_error) => {
            let text = db_error.message().to_lowercase();
            text.contains("unable to open") || text.contains("database is locked")
        }
        _ => false,
    };

    if unavailable {
        ExplorerError::store_unavailable(message)
    } else {
        ExplorerError::store(message)
    }
}
