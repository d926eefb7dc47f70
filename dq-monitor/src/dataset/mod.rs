//! The boundary between the checks and the query engine.
//!
//! Checks never look at rows. They talk to a [`DatasetHandle`], which exposes
//! a small set of aggregate read operations over a named relation, and they
//! resolve reference tables through a [`DatasetProvider`]. The DataFusion
//! implementation lives in [`engine`]; tests and other engines can plug in
//! their own.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub mod engine;

pub use engine::{DataFusionDataset, DataFusionProvider, EngineConfig};

/// A `database.table` pair naming a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    pub database: String,
    pub table: String,
}

impl TableName {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// A read-only handle to a queryable relation.
///
/// Every operation is an aggregate issued to the underlying engine. Handles
/// are immutable: [`filter_not_null`](DatasetHandle::filter_not_null) returns
/// a new handle and leaves the receiver untouched, so one handle can be shared
/// by concurrently evaluated checks.
#[async_trait]
pub trait DatasetHandle: fmt::Debug + Send + Sync {
    /// The relation this handle was resolved from.
    fn name(&self) -> &TableName;

    /// Allows engine implementations to recover their concrete handle type,
    /// which [`anti_join_count`](DatasetHandle::anti_join_count) needs.
    fn as_any(&self) -> &dyn Any;

    /// Number of rows in the relation.
    async fn row_count(&self) -> Result<u64>;

    /// Number of missing values in `column`.
    ///
    /// NULL is always missing; for floating point columns NaN counts as
    /// missing too.
    async fn null_count(&self, column: &str) -> Result<u64>;

    /// A handle restricted to rows where `column` is not NULL.
    fn filter_not_null(&self, column: &str) -> Result<Arc<dyn DatasetHandle>>;

    /// Number of distinct values in `column`. NULL counts as one value.
    async fn distinct_count(&self, column: &str) -> Result<u64>;

    /// Minimum and maximum of `column` as floating point numbers.
    ///
    /// Both are `None` when the relation has no non-null values.
    async fn min_max(&self, column: &str) -> Result<(Option<f64>, Option<f64>)>;

    /// Number of rows whose `column`, rendered as text, contains a match for
    /// `pattern`. NULL values never match.
    async fn regex_match_count(&self, column: &str, pattern: &str) -> Result<u64>;

    /// Number of distinct values of `column` that do not occur among the
    /// distinct values of `reference_column` in `reference`.
    ///
    /// A NULL source value never matches, so callers filter nulls first when
    /// they should not count.
    async fn anti_join_count(
        &self,
        column: &str,
        reference: &dyn DatasetHandle,
        reference_column: &str,
    ) -> Result<u64>;
}

/// Resolves `database.table` names to dataset handles.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    /// Resolves a relation, failing with
    /// [`MonitorError::DataUnavailable`](crate::error::MonitorError::DataUnavailable)
    /// when it does not exist or cannot be opened.
    async fn dataset(&self, database: &str, table: &str) -> Result<Arc<dyn DatasetHandle>>;
}
