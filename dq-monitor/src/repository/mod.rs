//! Persistence of result batches.
//!
//! A [`ResultStore`] receives every batch the monitor produces together with
//! a [`ResultKey`] naming the table and the moment of the run. The monitor
//! treats persistence as best effort: a failing store is logged and the run
//! continues.

use crate::error::Result;
use crate::result::CheckResult;
use async_trait::async_trait;

pub mod file;
pub mod in_memory;
pub mod result_key;

pub use file::FileResultStore;
pub use in_memory::InMemoryResultStore;
pub use result_key::ResultKey;

/// Durable storage for result batches.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Stores `results` under `key`, replacing any batch already stored there.
    async fn save(&self, key: &ResultKey, results: &[CheckResult]) -> Result<()>;
}
