//! Integration tests for the query layer over an ingested SQLite table.

use super::fixture;
use income_explorer::config::Config;
use income_explorer::ingest::{normalize_label, Ingestor};
use income_explorer::query::{QueryService, ResultRow};
use income_explorer::store::{SqliteStore, TableStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::tempdir;

async fn ingested_service() -> (QueryService, Arc<SqliteStore>, Config, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.database.path = dir.path().join("income.db");

    let store = Arc::new(SqliteStore::open(&config.database.path).await.unwrap());
    Ingestor::new(store.as_ref(), &config.database.table, &config.source)
        .run(&fixture("income_sample.csv"))
        .await
        .unwrap();

    let service = QueryService::new(
        Arc::clone(&store) as Arc<dyn TableStore>,
        config.database.table.clone(),
        &config.source.passthrough_columns,
    );
    (service, store, config, dir)
}

#[tokio::test]
async fn test_three_column_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("groups.csv");
    std::fs::write(&path, "Country,Year,GDP\nGROUP A,,\nWonderland,2020,5\nWonderland,2021,7\n")
        .unwrap();

    let config = Config::default();
    let store = Arc::new(SqliteStore::open(&dir.path().join("income.db")).await.unwrap());
    let report = Ingestor::new(store.as_ref(), &config.database.table, &config.source)
        .run(&path)
        .await
        .unwrap();
    assert_eq!(report.records, 2);
    assert_eq!(report.groups, vec!["GROUP A"]);

    let service = QueryService::new(
        Arc::clone(&store) as Arc<dyn TableStore>,
        config.database.table.clone(),
        &config.source.passthrough_columns,
    );
    assert_eq!(service.list_years(Some("Wonderland")).await, vec![2020, 2021]);

    let rows = service.query(Some("Wonderland"), None, "GDP").await;
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .all(|r| r.income_group.as_deref() == Some("GROUP A") && r.market_classification.is_none()));
    assert_eq!(rows[1].value, Some(7.0));
}

#[tokio::test]
async fn test_enumerations() {
    let (service, _store, _config, _dir) = ingested_service().await;

    assert_eq!(service.list_countries().await, vec!["Oz", "Wonderland"]);
    assert_eq!(service.list_years(None).await, vec![2020, 2021]);
    assert_eq!(service.list_years(Some("Wonderland")).await, vec![2020, 2021]);
    assert!(service.list_years(Some("Lost Row")).await.is_empty());
    assert_eq!(service.list_indicators().await, vec!["GDP Growth", "Inflation"]);
}

#[tokio::test]
async fn test_query_by_country_and_year() {
    let (service, _store, _config, _dir) = ingested_service().await;

    let rows = service.query(Some("Oz"), Some(2021), " GDP\nGrowth").await;
    assert_eq!(
        rows,
        vec![ResultRow {
            country: "Oz".into(),
            income_group: Some("LOW INCOME".into()),
            market_classification: Some("FRONTIER".into()),
            year: 2021,
            indicator: " GDP\nGrowth".into(),
            value: Some(-2.5),
        }]
    );
}

#[tokio::test]
async fn test_query_whole_table_keeps_nulls() {
    let (service, _store, _config, _dir) = ingested_service().await;

    let values: Vec<(String, i64, Option<f64>)> = service
        .query(None, None, "Inflation")
        .await
        .into_iter()
        .map(|r| (r.country, r.year, r.value))
        .collect();
    assert_eq!(
        values,
        vec![
            ("Wonderland".into(), 2020, Some(1.5)),
            ("Wonderland".into(), 2021, None),
            ("Oz".into(), 2020, Some(9.5)),
            ("Oz".into(), 2021, None),
        ]
    );
}

#[tokio::test]
async fn test_resolve_is_whitespace_insensitive() {
    let (service, _store, _config, _dir) = ingested_service().await;

    for name in ["GDP Growth", "GDP\nGrowth ", "  Inflation\n", "Unemployment"] {
        assert_eq!(
            service.resolve_indicator(name).await,
            service.resolve_indicator(&normalize_label(name)).await
        );
    }
    assert!(service.query(None, None, "Unemployment").await.is_empty());
}

#[tokio::test]
async fn test_reingest_refreshes_indicators() {
    let (service, store, config, dir) = ingested_service().await;
    assert_eq!(service.resolve_indicator("Debt").await, None);

    let path = dir.path().join("with_debt.csv");
    std::fs::write(
        &path,
        "Country,Year,IMF-ADV-EMDE,Debt\nGROUP A,,,\nWonderland,2020,ADV-E,60\n",
    )
    .unwrap();
    Ingestor::new(store.as_ref(), &config.database.table, &config.source)
        .run(&path)
        .await
        .unwrap();

    assert_eq!(service.resolve_indicator("Debt").await.as_deref(), Some("Debt"));
    assert_eq!(service.resolve_indicator("GDP Growth").await, None);
    assert_eq!(service.list_countries().await, vec!["Wonderland"]);
}

#[tokio::test]
async fn test_closed_store_yields_empty_results() {
    let (service, store, _config, _dir) = ingested_service().await;
    store.close().await.unwrap();

    assert!(service.list_countries().await.is_empty());
    assert!(service.query(Some("Oz"), None, "Inflation").await.is_empty());
    assert!(service.rows(None, None).await.is_empty());
}
