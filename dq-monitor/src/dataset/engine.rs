//! DataFusion-backed datasets.
//!
//! A [`DataFusionDataset`] wraps a lazy [`DataFrame`]; every handle operation
//! builds a small logical plan on top of it and executes it. Databases map to
//! schemas in the session's default catalog, so `sales.orders` is the table
//! `orders` in schema `sales`.

use super::{DatasetHandle, DatasetProvider, TableName};
use crate::error::{MonitorError, Result};
use crate::security::InputValidator;
use arrow::array::{Array, Float64Array};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::catalog::{CatalogProvider, MemorySchemaProvider};
use datafusion::common::TableReference;
use datafusion::datasource::{MemTable, TableProvider};
use datafusion::execution::memory_pool::{FairSpillPool, MemoryPool};
use datafusion::execution::runtime_env::RuntimeEnvBuilder;
use datafusion::functions::expr_fn::isnan;
use datafusion::functions_aggregate::expr_fn::{max, min};
use datafusion::logical_expr::Operator;
use datafusion::prelude::*;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const SOURCE_KEY: &str = "__dq_source_value";
const REFERENCE_KEY: &str = "__dq_reference_value";

/// Execution settings for the DataFusion session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Batch size for query execution
    pub batch_size: usize,
    /// Target number of partitions for parallel execution
    pub target_partitions: usize,
    /// Maximum memory for query execution (in bytes)
    pub max_memory: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4),
            max_memory: 2 * 1024 * 1024 * 1024, // 2GB
        }
    }
}

/// A dataset handle over a DataFusion [`DataFrame`].
#[derive(Debug, Clone)]
pub struct DataFusionDataset {
    name: TableName,
    df: DataFrame,
}

impl DataFusionDataset {
    pub fn new(name: TableName, df: DataFrame) -> Self {
        Self { name, df }
    }

    /// The underlying data frame.
    pub fn data_frame(&self) -> &DataFrame {
        &self.df
    }

    fn column_type(&self, column: &str) -> Result<DataType> {
        self.df
            .schema()
            .field_with_unqualified_name(column)
            .map(|field| field.data_type().clone())
            .map_err(|_| MonitorError::ColumnNotFound {
                column: column.to_string(),
            })
    }

    async fn count(df: DataFrame) -> Result<u64> {
        Ok(df.count().await? as u64)
    }
}

#[async_trait]
impl DatasetHandle for DataFusionDataset {
    fn name(&self) -> &TableName {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn row_count(&self) -> Result<u64> {
        Self::count(self.df.clone()).await
    }

    async fn null_count(&self, column: &str) -> Result<u64> {
        let data_type = self.column_type(column)?;
        let missing = match data_type {
            DataType::Float16 | DataType::Float32 | DataType::Float64 => {
                ident(column).is_null().or(isnan(ident(column)))
            }
            _ => ident(column).is_null(),
        };
        Self::count(self.df.clone().filter(missing)?).await
    }

    fn filter_not_null(&self, column: &str) -> Result<Arc<dyn DatasetHandle>> {
        self.column_type(column)?;
        let df = self.df.clone().filter(ident(column).is_not_null())?;
        Ok(Arc::new(Self::new(self.name.clone(), df)))
    }

    async fn distinct_count(&self, column: &str) -> Result<u64> {
        self.column_type(column)?;
        let distinct = self.df.clone().select(vec![ident(column)])?.distinct()?;
        Self::count(distinct).await
    }

    async fn min_max(&self, column: &str) -> Result<(Option<f64>, Option<f64>)> {
        self.column_type(column)?;
        let value = cast(ident(column), DataType::Float64);
        let batches = self
            .df
            .clone()
            .aggregate(
                vec![],
                vec![
                    min(value.clone()).alias("min_value"),
                    max(value).alias("max_value"),
                ],
            )?
            .collect()
            .await?;

        let Some(batch) = batches.iter().find(|batch| batch.num_rows() > 0) else {
            return Ok((None, None));
        };
        Ok((
            float_at(batch, 0, "min_value")?,
            float_at(batch, 1, "max_value")?,
        ))
    }

    async fn regex_match_count(&self, column: &str, pattern: &str) -> Result<u64> {
        self.column_type(column)?;
        let text = cast(ident(column), DataType::Utf8);
        let matches = binary_expr(text, Operator::RegexMatch, lit(pattern));
        Self::count(self.df.clone().filter(matches)?).await
    }

    async fn anti_join_count(
        &self,
        column: &str,
        reference: &dyn DatasetHandle,
        reference_column: &str,
    ) -> Result<u64> {
        let reference = reference
            .as_any()
            .downcast_ref::<DataFusionDataset>()
            .ok_or_else(|| {
                MonitorError::check_execution(
                    "referential_integrity",
                    format!(
                        "reference dataset {} is not backed by DataFusion",
                        reference.name()
                    ),
                )
            })?;
        self.column_type(column)?;
        reference.column_type(reference_column)?;

        let source = self
            .df
            .clone()
            .select(vec![ident(column).alias(SOURCE_KEY)])?
            .distinct()?;
        let target = reference
            .df
            .clone()
            .select(vec![ident(reference_column).alias(REFERENCE_KEY)])?
            .distinct()?;

        let missing = source.join(
            target,
            JoinType::LeftAnti,
            &[SOURCE_KEY],
            &[REFERENCE_KEY],
            None,
        )?;
        Self::count(missing).await
    }
}

fn float_at(batch: &RecordBatch, index: usize, name: &str) -> Result<Option<f64>> {
    let values = batch
        .column(index)
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| MonitorError::Internal(format!("Failed to extract {name}")))?;
    if values.is_null(0) {
        Ok(None)
    } else {
        Ok(Some(values.value(0)))
    }
}

/// Resolves datasets from tables registered in a DataFusion session.
#[derive(Clone)]
pub struct DataFusionProvider {
    ctx: SessionContext,
}

impl std::fmt::Debug for DataFusionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFusionProvider")
            .field("session_id", &self.ctx.session_id())
            .finish()
    }
}

impl Default for DataFusionProvider {
    fn default() -> Self {
        Self::from_context(SessionContext::new())
    }
}

impl DataFusionProvider {
    /// Creates a provider with a session tuned by `config`.
    #[instrument(skip(config))]
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        let session_config = SessionConfig::new()
            .with_batch_size(config.batch_size)
            .with_target_partitions(config.target_partitions)
            .with_information_schema(true);

        let memory_pool = Arc::new(FairSpillPool::new(config.max_memory)) as Arc<dyn MemoryPool>;
        let runtime_env = RuntimeEnvBuilder::new()
            .with_memory_pool(memory_pool)
            .build()
            .map(Arc::new)?;

        Ok(Self::from_context(SessionContext::new_with_config_rt(
            session_config,
            runtime_env,
        )))
    }

    /// Wraps an existing session.
    pub fn from_context(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// The underlying session.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    fn ensure_database(&self, database: &str) -> Result<()> {
        let catalog_name = self
            .ctx
            .copied_config()
            .options()
            .catalog
            .default_catalog
            .clone();
        let catalog = self.ctx.catalog(&catalog_name).ok_or_else(|| {
            MonitorError::Configuration(format!("default catalog '{catalog_name}' is missing"))
        })?;
        if catalog.schema(database).is_none() {
            debug!(database = %database, "Creating database schema");
            catalog.register_schema(database, Arc::new(MemorySchemaProvider::new()))?;
        }
        Ok(())
    }

    fn table_reference(&self, database: &str, table: &str) -> Result<TableReference> {
        InputValidator::validate_relation_name(database, "database name")?;
        InputValidator::validate_relation_name(table, "table name")?;
        self.ensure_database(database)?;
        Ok(TableReference::partial(database.to_string(), table.to_string()))
    }

    /// Registers an arbitrary table provider as `database.table`.
    pub fn register_table(
        &self,
        database: &str,
        table: &str,
        provider: Arc<dyn TableProvider>,
    ) -> Result<()> {
        let reference = self.table_reference(database, table)?;
        self.ctx.register_table(reference, provider)?;
        Ok(())
    }

    /// Registers in-memory record batches as `database.table`.
    pub fn register_batches(
        &self,
        database: &str,
        table: &str,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Result<()> {
        let provider = MemTable::try_new(schema, vec![batches])?;
        self.register_table(database, table, Arc::new(provider))
    }

    /// Registers a CSV file (with header row) as `database.table`.
    pub async fn register_csv(&self, database: &str, table: &str, path: &str) -> Result<()> {
        let reference = self.table_reference(database, table)?;
        self.ctx
            .register_csv(reference, path, CsvReadOptions::new())
            .await?;
        Ok(())
    }

    /// Registers a Parquet file or directory as `database.table`.
    pub async fn register_parquet(&self, database: &str, table: &str, path: &str) -> Result<()> {
        let reference = self.table_reference(database, table)?;
        self.ctx
            .register_parquet(reference, path, ParquetReadOptions::default())
            .await?;
        Ok(())
    }

    /// Registers a newline-delimited JSON file as `database.table`.
    ///
    /// `.ndjson` and `.jsonl` files are read like `.json`.
    pub async fn register_json(&self, database: &str, table: &str, path: &str) -> Result<()> {
        let reference = self.table_reference(database, table)?;
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_else(|| ".json".to_string());
        let options = NdJsonReadOptions::default().file_extension(&extension);
        self.ctx.register_json(reference, path, options).await?;
        Ok(())
    }

    /// Registers a file, choosing the reader from its extension.
    #[instrument(skip(self))]
    pub async fn register_file(&self, database: &str, table: &str, path: &Path) -> Result<()> {
        let path_str = path.to_str().ok_or_else(|| {
            MonitorError::Configuration(format!("path is not valid UTF-8: {}", path.display()))
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => self.register_csv(database, table, path_str).await?,
            Some("parquet") => self.register_parquet(database, table, path_str).await?,
            Some("json") | Some("ndjson") | Some("jsonl") => {
                self.register_json(database, table, path_str).await?
            }
            _ => {
                return Err(MonitorError::Configuration(format!(
                    "unsupported source format for {}: expected .csv, .parquet or .json",
                    path.display()
                )))
            }
        }

        info!(database = %database, table = %table, path = %path.display(), "Registered source");
        Ok(())
    }
}

#[async_trait]
impl DatasetProvider for DataFusionProvider {
    #[instrument(skip(self))]
    async fn dataset(&self, database: &str, table: &str) -> Result<Arc<dyn DatasetHandle>> {
        let reference = self
            .table_reference(database, table)
            .map_err(|e| MonitorError::data_unavailable(database, table, e.to_string()))?;
        let df = self
            .ctx
            .table(reference)
            .await
            .map_err(|e| MonitorError::data_unavailable(database, table, e.to_string()))?;

        debug!(database = %database, table = %table, "Resolved dataset");
        Ok(Arc::new(DataFusionDataset::new(
            TableName::new(database, table),
            df,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{customers_batch, orders_batch, provider_with};

    #[tokio::test]
    async fn test_row_and_null_counts() {
        let provider = provider_with(vec![("shop", "customers", customers_batch())]);
        let dataset = provider.dataset("shop", "customers").await.unwrap();

        assert_eq!(dataset.row_count().await.unwrap(), 5);
        assert_eq!(dataset.null_count("email").await.unwrap(), 2);
        assert_eq!(dataset.null_count("id").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_null_count_treats_nan_as_missing() {
        let provider = provider_with(vec![("shop", "customers", customers_batch())]);
        let dataset = provider.dataset("shop", "customers").await.unwrap();

        // one NULL and one NaN
        assert_eq!(dataset.null_count("score").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_filter_not_null_leaves_receiver_untouched() {
        let provider = provider_with(vec![("shop", "customers", customers_batch())]);
        let dataset = provider.dataset("shop", "customers").await.unwrap();

        let filtered = dataset.filter_not_null("email").unwrap();
        assert_eq!(filtered.row_count().await.unwrap(), 3);
        assert_eq!(dataset.row_count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_distinct_count_includes_null_once() {
        let provider = provider_with(vec![("shop", "customers", customers_batch())]);
        let dataset = provider.dataset("shop", "customers").await.unwrap();

        // two distinct emails plus NULL
        assert_eq!(dataset.distinct_count("email").await.unwrap(), 3);
        assert_eq!(dataset.distinct_count("id").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_min_max() {
        let provider = provider_with(vec![("shop", "customers", customers_batch())]);
        let dataset = provider.dataset("shop", "customers").await.unwrap();

        let (min, max) = dataset.min_max("id").await.unwrap();
        assert_eq!(min, Some(1.0));
        assert_eq!(max, Some(5.0));
    }

    #[tokio::test]
    async fn test_regex_match_count() {
        let provider = provider_with(vec![("shop", "customers", customers_batch())]);
        let dataset = provider.dataset("shop", "customers").await.unwrap();

        let count = dataset
            .regex_match_count("email", r"^[^@]+@example\.com$")
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_anti_join_count() {
        let provider = provider_with(vec![
            ("shop", "customers", customers_batch()),
            ("shop", "orders", orders_batch()),
        ]);
        let orders = provider.dataset("shop", "orders").await.unwrap();
        let customers = provider.dataset("shop", "customers").await.unwrap();

        let source = orders.filter_not_null("customer_id").unwrap();
        // customer 9 appears twice but is one distinct missing value
        let missing = source
            .anti_join_count("customer_id", customers.as_ref(), "id")
            .await
            .unwrap();
        assert_eq!(missing, 1);
    }

    #[tokio::test]
    async fn test_unknown_column() {
        let provider = provider_with(vec![("shop", "customers", customers_batch())]);
        let dataset = provider.dataset("shop", "customers").await.unwrap();

        let err = dataset.null_count("nope").await.unwrap_err();
        assert!(matches!(err, MonitorError::ColumnNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_table_is_data_unavailable() {
        let provider = DataFusionProvider::default();
        let err = provider.dataset("shop", "ghost").await.unwrap_err();
        assert!(matches!(err, MonitorError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_register_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");
        std::fs::write(&path, "id,name\n1,ada\n2,grace\n").unwrap();

        let provider = DataFusionProvider::default();
        provider.register_file("hr", "people", &path).await.unwrap();
        let dataset = provider.dataset("hr", "people").await.unwrap();
        assert_eq!(dataset.row_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_register_unsupported_extension() {
        let provider = DataFusionProvider::default();
        let err = provider
            .register_file("hr", "people", Path::new("people.xlsx"))
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::Configuration(_)));
    }
}
