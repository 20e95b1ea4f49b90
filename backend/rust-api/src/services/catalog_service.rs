use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::models::Task;
use crate::utils::retry::{retry_async, RetryConfig};

/// The immutable set of tasks this instance serves, decoded once at startup
/// from the remote payload (a JSON array of tasks).
pub struct TaskCatalog {
    tasks: Vec<Task>,
}

impl TaskCatalog {
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Decode a tasks payload. A task that fails to decode (for example an
    /// unknown question `type`) must not be presented, so it is skipped with
    /// a warning rather than poisoning the whole catalog; so are duplicates.
    pub fn from_payload(payload: &str) -> Result<Self> {
        let raw: Vec<serde_json::Value> =
            serde_json::from_str(payload).context("Tasks payload is not a JSON array")?;

        let mut tasks: Vec<Task> = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<Task>(value) {
                Ok(task) => {
                    if tasks.iter().any(|known| known.id == task.id) {
                        tracing::warn!("Skipping task with duplicate id: {}", task.id);
                        continue;
                    }
                    tasks.push(task);
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed task in payload: {}", e);
                }
            }
        }

        Ok(Self { tasks })
    }

    /// Load the payload from `source`: an `http(s)://` URL (fetched with
    /// bounded retries) or a filesystem path.
    pub async fn load(source: &str) -> Result<Self> {
        let payload = if source.starts_with("http://") || source.starts_with("https://") {
            fetch_payload(source).await?
        } else {
            tokio::fs::read_to_string(source)
                .await
                .with_context(|| format!("Failed to read tasks payload from {source}"))?
        };

        let catalog = Self::from_payload(&payload)?;
        tracing::info!("Task catalog loaded: {} tasks from {}", catalog.len(), source);
        Ok(catalog)
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

async fn fetch_payload(url: &str) -> Result<String> {
    let client = reqwest::Client::new();

    retry_async(RetryConfig::default(), || async {
        let response = client
            .get(url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .with_context(|| format!("Failed to fetch tasks payload from {url}"))?;

        if !response.status().is_success() {
            bail!("Tasks endpoint returned {}", response.status());
        }

        response
            .text()
            .await
            .context("Failed to read tasks payload body")
    })
    .await
}
