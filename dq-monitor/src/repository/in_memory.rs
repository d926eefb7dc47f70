//! In-memory result store for tests and embedding.

use super::{ResultKey, ResultStore};
use crate::error::Result;
use crate::result::CheckResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps batches in a map keyed by [`ResultKey`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryResultStore {
    storage: Arc<RwLock<HashMap<ResultKey, Vec<CheckResult>>>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The batch stored under `key`, if any.
    pub async fn get(&self, key: &ResultKey) -> Option<Vec<CheckResult>> {
        self.storage.read().await.get(key).cloned()
    }

    /// All stored keys, oldest first.
    pub async fn keys(&self) -> Vec<ResultKey> {
        let mut keys: Vec<_> = self.storage.read().await.keys().cloned().collect();
        keys.sort_by_key(|key| key.timestamp);
        keys
    }

    pub async fn size(&self) -> usize {
        self.storage.read().await.len()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn save(&self, key: &ResultKey, results: &[CheckResult]) -> Result<()> {
        self.storage
            .write()
            .await
            .insert(key.clone(), results.to_vec());
        Ok(())
    }
}
