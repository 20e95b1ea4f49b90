use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::TaskResults;

/// Keyed persistence of a user's answers, one document per task.
///
/// Load failures are not fatal to the survey flow: the caller treats them as
/// "no prior results" and starts fresh.
#[async_trait]
pub trait ResultsStore: Send + Sync {
    async fn load(&self, task_id: &str) -> Result<Option<TaskResults>>;
    async fn save(&self, task_id: &str, results: &TaskResults) -> Result<()>;
}

/// Process-local store. The default backend, and the one the test suite runs
/// against.
#[derive(Default)]
pub struct MemoryResultsStore {
    entries: RwLock<HashMap<String, TaskResults>>,
}

impl MemoryResultsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultsStore for MemoryResultsStore {
    async fn load(&self, task_id: &str) -> Result<Option<TaskResults>> {
        Ok(self.entries.read().await.get(task_id).cloned())
    }

    async fn save(&self, task_id: &str, results: &TaskResults) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(task_id.to_string(), results.clone());
        Ok(())
    }
}

/// One JSON document per task id under a configured directory.
pub struct FileResultsStore {
    dir: PathBuf,
}

impl FileResultsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn document_path(&self, task_id: &str) -> Result<PathBuf> {
        // Task ids become file names; anything that could escape the
        // directory is rejected outright.
        let safe = !task_id.is_empty()
            && task_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            bail!("Task id is not usable as a results document name: {task_id:?}");
        }

        Ok(self.dir.join(format!("{task_id}.json")))
    }
}

#[async_trait]
impl ResultsStore for FileResultsStore {
    async fn load(&self, task_id: &str) -> Result<Option<TaskResults>> {
        let path = self.document_path(task_id)?;
        let payload = match tokio::fs::read_to_string(&path).await {
            Ok(payload) => payload,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let results = serde_json::from_str(&payload)
            .with_context(|| format!("Corrupt results document {}", path.display()))?;
        Ok(Some(results))
    }

    async fn save(&self, task_id: &str, results: &TaskResults) -> Result<()> {
        let path = self.document_path(task_id)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let payload = serde_json::to_string(results).context("Failed to encode results")?;
        tokio::fs::write(&path, payload)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::debug!("Saved results for task {} to {}", task_id, path.display());
        Ok(())
    }
}
