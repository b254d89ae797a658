//! Read-side operations over the normalized table.
//!
//! Every public operation returns a plain sequence. Store failures are logged
//! and surface as empty results; only the inner `try_*` functions propagate
//! errors.

mod resolver;

pub use resolver::IndicatorResolver;

use crate::error::{ExplorerError, Result};
use crate::ingest::normalize_label;
use crate::store::{
    Predicate, RowSet, TableStore, Value, COUNTRY_COLUMN, ECONOMIC_GROUP_COLUMN,
    FIXED_COLUMNS, MARKET_CLASSIFICATION_COLUMN, YEAR_COLUMN,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

/// One observation of one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub country: String,
    pub income_group: Option<String>,
    pub market_classification: Option<String>,
    pub year: i64,
    /// Indicator name as the caller spelled it.
    pub indicator: String,
    pub value: Option<f64>,
}

/// Resolver built for one store generation.
#[derive(Debug, Clone)]
struct CachedResolver {
    generation: u64,
    resolver: Arc<IndicatorResolver>,
}

/// Answers enumeration and fetch requests against one table.
pub struct QueryService {
    store: Arc<dyn TableStore>,
    table: String,
    passthrough: Vec<String>,
    cache: RwLock<Option<CachedResolver>>,
}

impl QueryService {
    /// Creates a query service. `passthrough` names the classification columns
    /// that are stored alongside the indicators but are not indicators.
    pub fn new(
        store: Arc<dyn TableStore>,
        table: impl Into<String>,
        passthrough: &[String],
    ) -> Self {
        Self {
            store,
            table: table.into(),
            passthrough: passthrough.iter().map(|p| normalize_label(p)).collect(),
            cache: RwLock::new(None),
        }
    }

    /// Distinct countries, strictly ascending.
    pub async fn list_countries(&self) -> Vec<String> {
        self.try_list_countries()
            .await
            .unwrap_or_else(|e| self.log_failure("list countries", e))
    }

    /// Distinct years, ascending, optionally restricted to one country.
    pub async fn list_years(&self, country: Option<&str>) -> Vec<i64> {
        self.try_list_years(country)
            .await
            .unwrap_or_else(|e| self.log_failure("list years", e))
    }

    /// Indicator column names in table order.
    pub async fn list_indicators(&self) -> Vec<String> {
        self.try_list_indicators()
            .await
            .unwrap_or_else(|e| self.log_failure("list indicators", e))
    }

    /// Maps a requested indicator name to its exact stored column name.
    pub async fn resolve_indicator(&self, requested: &str) -> Option<String> {
        match self.resolver().await {
            Ok(resolver) => resolver.resolve(requested).map(str::to_string),
            Err(e) => {
                error!(table = %self.table, "Failed to resolve indicator: {e}");
                None
            }
        }
    }

    /// Fetches one indicator for the matching rows, in table order.
    pub async fn query(
        &self,
        country: Option<&str>,
        year: Option<i64>,
        indicator: &str,
    ) -> Vec<ResultRow> {
        self.try_query(country, year, indicator)
            .await
            .unwrap_or_else(|e| self.log_failure("query", e))
    }

    /// Fetches complete rows for inspection.
    pub async fn rows(&self, country: Option<&str>, year: Option<i64>) -> RowSet {
        match self
            .store
            .load_filtered(&self.table, &selection(country, year))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!(table = %self.table, "Failed to load rows: {e}");
                RowSet::default()
            }
        }
    }

    async fn try_list_countries(&self) -> Result<Vec<String>> {
        let values = self
            .store
            .distinct_values(&self.table, COUNTRY_COLUMN, &[])
            .await?;
        let mut countries: Vec<String> = values
            .into_iter()
            .filter_map(|v| match v {
                Value::Text(s) => Some(s),
                _ => None,
            })
            .collect();
        countries.sort();
        countries.dedup();
        Ok(countries)
    }

    async fn try_list_years(&self, country: Option<&str>) -> Result<Vec<i64>> {
        let values = self
            .store
            .distinct_values(&self.table, YEAR_COLUMN, &selection(country, None))
            .await?;
        let mut years: Vec<i64> = values.iter().filter_map(Value::as_i64).collect();
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    async fn try_list_indicators(&self) -> Result<Vec<String>> {
        let columns = self.store.list_columns(&self.table).await?;
        Ok(self.indicator_columns(columns))
    }

    fn indicator_columns(&self, columns: Vec<String>) -> Vec<String> {
        columns
            .into_iter()
            .filter(|c| !FIXED_COLUMNS.contains(&c.as_str()))
            .filter(|c| !self.passthrough.contains(c))
            .collect()
    }

    /// Returns the resolver for the store's current generation, rebuilding it
    /// after every replace.
    async fn resolver(&self) -> Result<Arc<IndicatorResolver>> {
        let generation = self.store.generation();
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.generation == generation {
                return Ok(Arc::clone(&cached.resolver));
            }
        }

        let columns = self.try_list_indicators().await?;
        let resolver = Arc::new(IndicatorResolver::from_columns(&columns));
        debug!(generation, indicators = columns.len(), "Built indicator resolver");

        // An absent table may appear through another connection; retry next call.
        if !resolver.is_empty() {
            *self.cache.write().await = Some(CachedResolver {
                generation,
                resolver: Arc::clone(&resolver),
            });
        }
        Ok(resolver)
    }

    async fn try_query(
        &self,
        country: Option<&str>,
        year: Option<i64>,
        indicator: &str,
    ) -> Result<Vec<ResultRow>> {
        let resolver = self.resolver().await?;
        let Some(stored) = resolver.resolve(indicator) else {
            warn!(
                requested = %indicator,
                known = ?resolver.known(),
                "Unknown indicator"
            );
            return Ok(Vec::new());
        };

        let rows = self
            .store
            .load_filtered(&self.table, &selection(country, year))
            .await?;

        let column = |name: &str| rows.column_index(name);
        let (Some(country_idx), Some(year_idx), Some(value_idx)) =
            (column(COUNTRY_COLUMN), column(YEAR_COLUMN), column(stored))
        else {
            warn!(table = %self.table, column = %stored, "Table is missing expected columns");
            return Ok(Vec::new());
        };
        let group_idx = column(ECONOMIC_GROUP_COLUMN);
        let market_idx = column(MARKET_CLASSIFICATION_COLUMN);

        Ok(rows
            .rows
            .iter()
            .filter_map(|row| {
                let country = row[country_idx].as_str()?.to_string();
                let year = row[year_idx].as_i64()?;
                Some(ResultRow {
                    country,
                    income_group: text_at(row, group_idx),
                    market_classification: text_at(row, market_idx),
                    year,
                    indicator: indicator.to_string(),
                    value: row[value_idx].as_f64(),
                })
            })
            .collect())
    }

    fn log_failure<T>(&self, operation: &str, e: ExplorerError) -> Vec<T> {
        if e.is_unavailable() {
            error!(table = %self.table, "Cannot {operation}, store unavailable: {e}");
        } else {
            error!(table = %self.table, "Failed to {operation}: {e}");
        }
        Vec::new()
    }
}

fn text_at(row: &[Value], idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| row[i].as_str()).map(str::to_string)
}

/// Equality filters for the optional country and year.
fn selection(country: Option<&str>, year: Option<i64>) -> Vec<Predicate> {
    let mut predicates = Vec::new();
    if let Some(country) = country {
        predicates.push(Predicate::eq(COUNTRY_COLUMN, country));
    }
    if let Some(year) = year {
        predicates.push(Predicate::eq(YEAR_COLUMN, year));
    }
    predicates
}
