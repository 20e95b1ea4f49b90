use std::sync::Arc;

use chrono::FixedOffset;

use crate::config::Config;

use self::catalog_service::TaskCatalog;
use self::prefetch_service::ImagePrefetcher;
use self::results_store::{FileResultsStore, MemoryResultsStore, ResultsStore};
use self::survey_service::SurveyService;

pub struct AppState {
    pub config: Config,
    pub catalog: Arc<TaskCatalog>,
    pub store: Arc<dyn ResultsStore>,
    pub surveys: SurveyService,
    pub unlock_offset: FixedOffset,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let catalog = Arc::new(TaskCatalog::load(&config.tasks_source).await?);

        let store: Arc<dyn ResultsStore> = match config.results_store.as_str() {
            "file" => {
                tracing::info!("Using file results store at {}", config.results_dir);
                Arc::new(FileResultsStore::new(&config.results_dir))
            }
            "memory" => Arc::new(MemoryResultsStore::new()),
            other => {
                tracing::warn!(
                    "Unknown results store backend '{}', falling back to memory",
                    other
                );
                Arc::new(MemoryResultsStore::new())
            }
        };

        Ok(Self::with_parts(config, catalog, store))
    }

    /// Assemble the state from already-built parts. `new` goes through here;
    /// so does the test suite, with an inline catalog and a memory store.
    pub fn with_parts(
        config: Config,
        catalog: Arc<TaskCatalog>,
        store: Arc<dyn ResultsStore>,
    ) -> Self {
        let unlock_offset = FixedOffset::east_opt(config.unlock_offset_minutes * 60)
            .unwrap_or_else(|| {
                tracing::warn!(
                    "Unlock offset {} minutes is out of range, using UTC",
                    config.unlock_offset_minutes
                );
                FixedOffset::east_opt(0).expect("zero offset is valid")
            });

        let prefetcher = ImagePrefetcher::new(config.prefetch_enabled);
        let surveys = SurveyService::new(
            catalog.clone(),
            store.clone(),
            prefetcher,
            unlock_offset,
        );

        Self {
            config,
            catalog,
            store,
            surveys,
            unlock_offset,
        }
    }
}

pub mod catalog_service;
pub mod prefetch_service;
pub mod results_store;
pub mod survey_service;
