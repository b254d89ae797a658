//! income-explorer - normalize income-group spreadsheets and query indicators.

mod cli;
mod logging;

use cli::{Cli, Command};
use income_explorer::config::Config;
use income_explorer::error::{ExplorerError, Result};
use income_explorer::ingest::Ingestor;
use income_explorer::query::QueryService;
use income_explorer::store::{SqliteStore, TableStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    logging::init(cli.log_file.as_deref());

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_overrides(cli.database.as_deref(), cli.table.as_deref());

    let store = Arc::new(SqliteStore::open(&config.database.path).await?);
    let result = dispatch(cli.command, &config, Arc::clone(&store)).await;
    store.close().await?;
    result
}

async fn dispatch(command: Command, config: &Config, store: Arc<SqliteStore>) -> Result<()> {
    let table = config.database.table.as_str();
    let service = QueryService::new(
        Arc::clone(&store) as Arc<dyn TableStore>,
        table,
        &config.source.passthrough_columns,
    );

    match command {
        Command::Ingest { source, sheet } => {
            let path = config.source_path(source.as_deref())?;
            let mut layout = config.source.clone();
            if sheet.is_some() {
                layout.sheet = sheet;
            }
            let report = Ingestor::new(store.as_ref(), table, &layout)
                .run(&path)
                .await?;
            print_json(&report)
        }
        Command::Countries => print_json(&service.list_countries().await),
        Command::Years { country } => print_json(&service.list_years(country.as_deref()).await),
        Command::Indicators => print_json(&service.list_indicators().await),
        Command::Resolve { name } => print_json(&service.resolve_indicator(&name).await),
        Command::Data {
            indicator,
            country,
            year,
        } => print_json(&service.query(country.as_deref(), year, &indicator).await),
        Command::Rows { country, year } => {
            let rows = service.rows(country.as_deref(), year).await;
            print_json(&rows.to_json_records())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ExplorerError::internal(format!("Failed to encode output: {e}")))?;
    println!("{json}");
    Ok(())
}
