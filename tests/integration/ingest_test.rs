//! Integration tests for spreadsheet ingestion into SQLite.

use super::fixture;
use income_explorer::config::SourceConfig;
use income_explorer::ingest::{Ingestor, SkipReason};
use income_explorer::store::{SqliteStore, TableStore, Value};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::tempdir;

const TABLE: &str = "income_data";

async fn create_test_store() -> (SqliteStore, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("income.db")).await.unwrap();
    (store, dir)
}

#[tokio::test]
async fn test_ingest_csv_report() {
    let (store, _dir) = create_test_store().await;
    let source = SourceConfig::default();

    let report = Ingestor::new(&store, TABLE, &source)
        .run(&fixture("income_sample.csv"))
        .await
        .unwrap();

    assert_eq!(report.table, TABLE);
    assert_eq!(report.records, 4);
    assert_eq!(report.groups, vec!["HIGH INCOME", "LOW INCOME"]);
    assert_eq!(report.indicators, vec!["GDP Growth", "Inflation"]);
    assert!(report.duplicate_labels.is_empty());

    let skipped: Vec<(usize, &SkipReason)> =
        report.skipped.iter().map(|s| (s.row, &s.reason)).collect();
    assert_eq!(
        skipped,
        vec![
            (3, &SkipReason::BeforeFirstGroup),
            (11, &SkipReason::InvalidYear("soon".into())),
        ]
    );

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_ingest_csv_table_layout() {
    let (store, _dir) = create_test_store().await;
    let source = SourceConfig::default();
    Ingestor::new(&store, TABLE, &source)
        .run(&fixture("income_sample.csv"))
        .await
        .unwrap();

    let columns = store.list_columns(TABLE).await.unwrap();
    assert_eq!(
        columns,
        vec![
            "country",
            "year",
            "economic_group",
            "market_classification",
            "Code",
            "code-2",
            "GDP Growth",
            "Inflation",
        ]
    );

    let rows = store.load(TABLE).await.unwrap();
    let summary: Vec<(String, i64, String, Option<String>)> = rows
        .rows
        .iter()
        .map(|r| {
            (
                r[0].as_str().unwrap().to_string(),
                r[1].as_i64().unwrap(),
                r[2].as_str().unwrap().to_string(),
                r[3].as_str().map(str::to_string),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Wonderland".into(), 2020, "HIGH INCOME".into(), Some("Advanced Economies".into())),
            ("Wonderland".into(), 2021, "HIGH INCOME".into(), Some("Advanced Economies".into())),
            (
                "Oz".into(),
                2020,
                "LOW INCOME".into(),
                Some("Emerging Market and Developing Economies".into())
            ),
            ("Oz".into(), 2021, "LOW INCOME".into(), Some("FRONTIER".into())),
        ]
    );

    // Oz 2020 has no GDP growth; Oz 2021 inflation is "n/a".
    assert_eq!(rows.rows[2][6], Value::Null);
    assert_eq!(rows.rows[3][7], Value::Null);
    assert_eq!(rows.rows[3][6], Value::Float(-2.5));
    assert_eq!(rows.rows[0][5], Value::Text("W2".into()));
}

#[tokio::test]
async fn test_ingest_twice_is_deterministic() {
    let (store, _dir) = create_test_store().await;
    let source = SourceConfig::default();
    let ingestor = Ingestor::new(&store, TABLE, &source);

    ingestor.run(&fixture("income_sample.csv")).await.unwrap();
    let first = store.load(TABLE).await.unwrap();

    ingestor.run(&fixture("income_sample.csv")).await.unwrap();
    let second = store.load(TABLE).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.generation(), 2);
}

#[tokio::test]
async fn test_failed_ingest_leaves_table_untouched() {
    let (store, dir) = create_test_store().await;
    let source = SourceConfig::default();
    let ingestor = Ingestor::new(&store, TABLE, &source);
    ingestor.run(&fixture("income_sample.csv")).await.unwrap();

    let bad = dir.path().join("bad.csv");
    let mut file = std::fs::File::create(&bad).unwrap();
    writeln!(file, "Nation,Year,IMF-ADV-EMDE,GDP").unwrap();
    writeln!(file, "GROUP A,,,").unwrap();
    writeln!(file, "Wonderland,2020,ADV-E,1").unwrap();
    drop(file);

    let err = ingestor.run(&bad).await.unwrap_err();
    assert_eq!(err.category(), "Ingest Error");

    let rows = store.load(TABLE).await.unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(store.generation(), 1);
}

#[tokio::test]
async fn test_ingest_unsupported_extension() {
    let (store, dir) = create_test_store().await;
    let path = dir.path().join("income.txt");
    std::fs::write(&path, "Country,Year\n").unwrap();

    let source = SourceConfig::default();
    let err = Ingestor::new(&store, TABLE, &source)
        .run(&path)
        .await
        .unwrap_err();
    assert_eq!(err.category(), "Spreadsheet Error");
    assert!(store.list_columns(TABLE).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ingest_custom_layout() {
    let (store, dir) = create_test_store().await;
    let path = dir.path().join("custom.csv");
    std::fs::write(
        &path,
        "Economy,Period,Market,Debt\nEUROPE,,,\nAtlantis,1999,ADV-E,60\n",
    )
    .unwrap();

    let source = SourceConfig {
        label_column: "Economy".into(),
        year_column: "Period".into(),
        classification_column: "Market".into(),
        passthrough_columns: Vec::new(),
        ..SourceConfig::default()
    };
    let report = Ingestor::new(&store, "custom", &source)
        .run(&path)
        .await
        .unwrap();

    assert_eq!(report.records, 1);
    assert_eq!(
        store.list_columns("custom").await.unwrap(),
        vec!["country", "year", "economic_group", "market_classification", "Debt"]
    );
}

#[tokio::test]
async fn test_ingest_csv_with_latin1_row() {
    let (store, dir) = create_test_store().await;
    let path = dir.path().join("latin1.csv");
    std::fs::write(
        &path,
        b"Country,Year,IMF-ADV-EMDE,GDP\nGROUP A,,,\nWonderland,2020,ADV-E,5\nC\xf4te d'Ivoire,2020,EMDE-E,3\nOz,2021,EMDE-E,1\n",
    )
    .unwrap();

    let source = SourceConfig::default();
    let report = Ingestor::new(&store, TABLE, &source)
        .run(&path)
        .await
        .unwrap();

    assert_eq!(report.records, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].row, 4);
    assert_eq!(report.skipped[0].reason, SkipReason::UnreadableLabel);
    assert_eq!(store.load(TABLE).await.unwrap().len(), 2);
}
