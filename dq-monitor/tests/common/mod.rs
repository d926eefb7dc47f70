//! Shared fixtures for integration tests.

#![allow(dead_code)]

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use dq_monitor::dataset::{DataFusionProvider, DatasetHandle, DatasetProvider, TableName};
use dq_monitor::error::{MonitorError, Result};
use dq_monitor::sinks::{
    AlertNotification, AlertSink, MetricPoint, MetricsSink, SinkError, SinkResult,
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// 100 customers.
///
/// - `id`: 98 distinct values (ids 99 and 100 repeat 1 and 2)
/// - `email`: 3 NULLs, all others `user{n}@example.com`
/// - `age`: 18..=67 cycling, no NULLs
/// - `score`: all NULL except the first ten rows
/// - `country_code`: `US`, `DE` or `FR`, with one `usa`
pub fn customers_100() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("email", DataType::Utf8, true),
        Field::new("age", DataType::Int64, true),
        Field::new("score", DataType::Float64, true),
        Field::new("country_code", DataType::Utf8, true),
    ]));

    let ids: Vec<i64> = (1..=100).map(|n| if n > 98 { n - 98 } else { n }).collect();
    let emails: Vec<Option<String>> = (1..=100)
        .map(|n| {
            if n % 33 == 0 {
                None
            } else {
                Some(format!("user{n}@example.com"))
            }
        })
        .collect();
    let ages: Vec<i64> = (0..100).map(|n| 18 + n % 50).collect();
    let scores: Vec<Option<f64>> = (0..100)
        .map(|n| if n < 10 { Some(n as f64 / 10.0) } else { None })
        .collect();
    let countries: Vec<&str> = (0..100)
        .map(|n| match n % 3 {
            _ if n == 50 => "usa",
            0 => "US",
            1 => "DE",
            _ => "FR",
        })
        .collect();

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(emails)),
            Arc::new(Int64Array::from(ages)),
            Arc::new(Float64Array::from(scores)),
            Arc::new(StringArray::from(countries)),
        ],
    )
    .unwrap()
}

/// Orders referencing customers; customer ids 500 and 501 do not exist.
pub fn orders() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Int64, false),
        Field::new("customer_id", DataType::Int64, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5, 6, 7])),
            Arc::new(Int64Array::from(vec![
                Some(1),
                Some(2),
                Some(500),
                Some(500),
                Some(501),
                None,
                Some(98),
            ])),
        ],
    )
    .unwrap()
}

/// A provider with `sales.customers` and `sales.orders` registered.
pub fn sales_provider() -> Arc<DataFusionProvider> {
    let provider = DataFusionProvider::default();
    for (table, batch) in [("customers", customers_100()), ("orders", orders())] {
        provider
            .register_batches("sales", table, batch.schema(), vec![batch])
            .unwrap();
    }
    Arc::new(provider)
}

/// A provider with `sales.customers` registered with no rows.
pub fn empty_provider() -> Arc<DataFusionProvider> {
    let batch = RecordBatch::new_empty(customers_100().schema());
    let provider = DataFusionProvider::default();
    provider
        .register_batches("sales", "customers", batch.schema(), vec![batch])
        .unwrap();
    Arc::new(provider)
}

/// A one-row dataset with nothing missing whose queries on `slow_column`
/// hang for `delay`. Queries on any other column answer at once.
#[derive(Debug, Clone)]
pub struct SlowDataset {
    name: TableName,
    slow_column: String,
    delay: Duration,
}

impl SlowDataset {
    pub fn new(slow_column: &str, delay: Duration) -> Self {
        Self {
            name: TableName::new("slow", "table"),
            slow_column: slow_column.to_string(),
            delay,
        }
    }

    async fn pause(&self, column: &str) {
        if column == self.slow_column {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl DatasetHandle for SlowDataset {
    fn name(&self) -> &TableName {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn row_count(&self) -> Result<u64> {
        Ok(1)
    }

    async fn null_count(&self, column: &str) -> Result<u64> {
        self.pause(column).await;
        Ok(0)
    }

    fn filter_not_null(&self, _column: &str) -> Result<Arc<dyn DatasetHandle>> {
        Ok(Arc::new(self.clone()))
    }

    async fn distinct_count(&self, column: &str) -> Result<u64> {
        self.pause(column).await;
        Ok(1)
    }

    async fn min_max(&self, column: &str) -> Result<(Option<f64>, Option<f64>)> {
        self.pause(column).await;
        Ok((Some(1.0), Some(1.0)))
    }

    async fn regex_match_count(&self, column: &str, _pattern: &str) -> Result<u64> {
        self.pause(column).await;
        Ok(1)
    }

    async fn anti_join_count(
        &self,
        column: &str,
        _reference: &dyn DatasetHandle,
        _reference_column: &str,
    ) -> Result<u64> {
        self.pause(column).await;
        Ok(0)
    }
}

/// Resolves nothing.
pub struct NoDatasets;

#[async_trait]
impl DatasetProvider for NoDatasets {
    async fn dataset(&self, database: &str, table: &str) -> Result<Arc<dyn DatasetHandle>> {
        Err(MonitorError::data_unavailable(database, table, "no datasets"))
    }
}

/// A metrics sink that always fails.
pub struct FailingMetricsSink;

#[async_trait]
impl MetricsSink for FailingMetricsSink {
    async fn put_metrics(&self, _namespace: &str, _points: &[MetricPoint]) -> SinkResult<()> {
        Err(SinkError::Network {
            message: "connection refused".to_string(),
        })
    }
}

/// An alert sink that always fails.
pub struct FailingAlertSink;

#[async_trait]
impl AlertSink for FailingAlertSink {
    async fn publish(&self, _notification: &AlertNotification) -> SinkResult<()> {
        Err(SinkError::Server {
            status: 500,
            message: "internal error".to_string(),
        })
    }
}

/// A metrics sink whose deliveries never complete.
pub struct HangingMetricsSink;

#[async_trait]
impl MetricsSink for HangingMetricsSink {
    async fn put_metrics(&self, _namespace: &str, _points: &[MetricPoint]) -> SinkResult<()> {
        std::future::pending().await
    }
}

/// An alert sink whose deliveries never complete.
pub struct HangingAlertSink;

#[async_trait]
impl AlertSink for HangingAlertSink {
    async fn publish(&self, _notification: &AlertNotification) -> SinkResult<()> {
        std::future::pending().await
    }
}
