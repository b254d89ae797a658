//! Integration tests for the SQLite table store.

use income_explorer::store::{
    ColumnDef, ColumnKind, Predicate, RowSet, SqliteStore, TableStore, Value,
};
use std::sync::Arc;
use tempfile::tempdir;

fn table(rows: usize) -> RowSet {
    RowSet {
        columns: vec![
            ColumnDef::new("country", ColumnKind::Text),
            ColumnDef::new("year", ColumnKind::Integer),
            ColumnDef::new("GDP\nGrowth ", ColumnKind::Real),
        ],
        rows: (0..rows)
            .map(|i| {
                vec![
                    Value::Text(format!("Country {i}")),
                    Value::Int(2000 + i as i64),
                    Value::Float(i as f64 / 2.0),
                ]
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_table_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("income.db");

    let store = SqliteStore::open(&path).await.unwrap();
    store.replace("income_data", &table(3)).await.unwrap();
    store.close().await.unwrap();

    let reopened = SqliteStore::open(&path).await.unwrap();
    let rows = reopened.load("income_data").await.unwrap();
    assert_eq!(rows, table(3));
    assert_eq!(reopened.generation(), 0);
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_filtered_distinct_values() {
    let dir = tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("income.db")).await.unwrap();
    store.replace("income_data", &table(5)).await.unwrap();

    let years = store
        .distinct_values("income_data", "year", &[Predicate::eq("country", "Country 2")])
        .await
        .unwrap();
    assert_eq!(years, vec![Value::Int(2002)]);

    let none = store
        .load_filtered("income_data", &[Predicate::eq("country", "Nowhere")])
        .await
        .unwrap();
    assert!(none.is_empty());
    assert_eq!(none.columns.len(), 3);
}

#[tokio::test]
async fn test_readers_see_whole_tables_during_replace() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("income.db")).await.unwrap());
    store.replace("income_data", &table(10)).await.unwrap();

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..5 {
                store.replace("income_data", &table(50)).await.unwrap();
                store.replace("income_data", &table(10)).await.unwrap();
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let store = Arc::clone(&store);
        readers.push(tokio::spawn(async move {
            for _ in 0..10 {
                let rows = store.load("income_data").await.unwrap();
                assert!(rows.len() == 10 || rows.len() == 50, "partial table: {}", rows.len());
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(store.generation(), 11);
}

#[tokio::test]
async fn test_loads_stay_consistent_while_columns_change() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("income.db")).await.unwrap());

    let narrow = table(5);
    let mut wide = table(5);
    wide.columns.push(ColumnDef::new("Debt", ColumnKind::Real));
    for row in &mut wide.rows {
        row.push(Value::Float(60.0));
    }
    store.replace("income_data", &narrow).await.unwrap();

    let writer = {
        let store = Arc::clone(&store);
        let (narrow, wide) = (narrow.clone(), wide.clone());
        tokio::spawn(async move {
            for _ in 0..20 {
                store.replace("income_data", &wide).await.unwrap();
                store.replace("income_data", &narrow).await.unwrap();
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let store = Arc::clone(&store);
        readers.push(tokio::spawn(async move {
            for _ in 0..20 {
                let rows = store.load("income_data").await.unwrap();
                assert!(rows.columns.len() == 3 || rows.columns.len() == 4);
                assert!(rows.rows.iter().all(|r| r.len() == rows.columns.len()));
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}
