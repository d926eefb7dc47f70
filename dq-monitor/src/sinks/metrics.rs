//! Metric points derived from check results.

use super::error::SinkResult;
use crate::logging::truncate_field;
use crate::result::{CheckResult, Measurements};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "DataQuality";

/// Unit of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricUnit {
    Percent,
    Count,
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent => write!(f, "Percent"),
            Self::Count => write!(f, "Count"),
        }
    }
}

/// A name/value pair that tags a metric point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single named, dimensioned numeric observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    pub dimensions: Vec<Dimension>,
    pub timestamp: DateTime<Utc>,
}

impl MetricPoint {
    /// Looks up a dimension value by name.
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

/// Translates a result into metric points.
///
/// Every point carries the `Database`, `Table` and `Column` dimensions. A
/// percentage point is emitted when the check measured one (value range
/// checks have none), followed by a `CheckPassed` point with an extra
/// `CheckType` dimension. Error results therefore produce only
/// `CheckPassed = 0`.
pub fn metric_points(result: &CheckResult, database: &str, table: &str) -> Vec<MetricPoint> {
    let base = vec![
        Dimension::new("Database", database),
        Dimension::new("Table", table),
        Dimension::new("Column", &result.column),
    ];
    let mut points = Vec::with_capacity(2);

    if let Some(measurements) = &result.measurements {
        let name = match measurements {
            Measurements::Completeness { .. } => Some("NullPercentage"),
            Measurements::Uniqueness { .. } => Some("UniquePercentage"),
            Measurements::Pattern { .. } => Some("PatternMatchPercentage"),
            Measurements::ReferentialIntegrity { .. } => Some("ReferentialIntegrityPercentage"),
            Measurements::ValueRange { .. } => None,
        };
        if let (Some(name), Some(value)) = (name, measurements.percentage()) {
            points.push(MetricPoint {
                name: name.to_string(),
                value,
                unit: MetricUnit::Percent,
                dimensions: base.clone(),
                timestamp: result.timestamp,
            });
        }
    }

    let mut dimensions = base;
    dimensions.push(Dimension::new("CheckType", result.check_type.as_str()));
    points.push(MetricPoint {
        name: "CheckPassed".to_string(),
        value: if result.passed { 1.0 } else { 0.0 },
        unit: MetricUnit::Count,
        dimensions,
        timestamp: result.timestamp,
    });

    points
}

/// A destination for metric points.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn put_metrics(&self, namespace: &str, points: &[MetricPoint]) -> SinkResult<()>;
}

/// Forwards results to a [`MetricsSink`], logging and swallowing delivery
/// failures.
#[derive(Clone)]
pub struct MetricsAdapter {
    sink: Arc<dyn MetricsSink>,
    namespace: String,
}

impl MetricsAdapter {
    pub fn new(sink: Arc<dyn MetricsSink>, namespace: impl Into<String>) -> Self {
        Self {
            sink,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Publishes the points for one result.
    pub async fn publish(&self, result: &CheckResult, database: &str, table: &str) {
        let points = metric_points(result, database, table);
        match self.sink.put_metrics(&self.namespace, &points).await {
            Ok(()) => debug!(
                namespace = %self.namespace,
                column = %result.column,
                points = points.len(),
                "Published metrics"
            ),
            Err(e) => error!(
                namespace = %self.namespace,
                column = %result.column,
                retryable = e.is_retryable(),
                error = %truncate_field(&e.to_string(), 256),
                "Failed to publish metrics"
            ),
        }
    }
}

/// Writes metric points to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsSink;

#[async_trait]
impl MetricsSink for TracingMetricsSink {
    async fn put_metrics(&self, namespace: &str, points: &[MetricPoint]) -> SinkResult<()> {
        for point in points {
            info!(
                metric.namespace = %namespace,
                metric.name = %point.name,
                metric.value = point.value,
                metric.unit = %point.unit,
                metric.column = point.dimension("Column").unwrap_or_default(),
                "metric"
            );
        }
        Ok(())
    }
}

/// Keeps every delivered batch in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetricsSink {
    batches: Mutex<Vec<(String, Vec<MetricPoint>)>>,
}

impl InMemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All points delivered so far, in delivery order.
    pub fn points(&self) -> Vec<MetricPoint> {
        self.batches
            .lock()
            .map(|batches| {
                batches
                    .iter()
                    .flat_map(|(_, points)| points.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Delivered batches with their namespaces.
    pub fn batches(&self) -> Vec<(String, Vec<MetricPoint>)> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MetricsSink for InMemoryMetricsSink {
    async fn put_metrics(&self, namespace: &str, points: &[MetricPoint]) -> SinkResult<()> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|_| super::SinkError::Unavailable {
                message: "metrics buffer lock poisoned".to_string(),
            })?;
        batches.push((namespace.to_string(), points.to_vec()));
        Ok(())
    }
}
