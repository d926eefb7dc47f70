//! JSON files on the local filesystem.

use super::{ResultKey, ResultStore};
use crate::error::{ErrorContext, Result};
use crate::result::CheckResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Writes each batch to `<root>/<key.file_name()>` as a pretty-printed JSON
/// array. The root directory is created on first save.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    root: PathBuf,
}

impl FileResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the batch for `key` is written.
    pub fn path_for(&self, key: &ResultKey) -> PathBuf {
        self.root.join(key.file_name())
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    #[instrument(skip(self, results), fields(key = %key, results = results.len()))]
    async fn save(&self, key: &ResultKey, results: &[CheckResult]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating results directory {}", self.root.display()))?;

        let body = serde_json::to_vec_pretty(results)?;
        let path = self.path_for(key);
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("writing results to {}", path.display()))?;

        info!(path = %path.display(), "Saved results");
        Ok(())
    }
}
