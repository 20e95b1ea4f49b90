use reqwest::Client;
use url::Url;

use crate::metrics::PREFETCH_REQUESTS_TOTAL;
use crate::models::Task;

/// Best-effort image warmer. Requests are fire-and-forget: nothing waits on
/// them and failures never surface past a debug log line.
#[derive(Clone)]
pub struct ImagePrefetcher {
    client: Client,
    enabled: bool,
}

impl ImagePrefetcher {
    pub fn new(enabled: bool) -> Self {
        Self {
            client: Client::new(),
            enabled,
        }
    }

    pub fn request(&self, url: Url) {
        if !self.enabled {
            return;
        }

        let client = self.client.clone();
        tokio::spawn(async move {
            match client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    PREFETCH_REQUESTS_TOTAL.with_label_values(&["ok"]).inc();
                    tracing::debug!("Prefetched {}", url);
                }
                Ok(response) => {
                    PREFETCH_REQUESTS_TOTAL
                        .with_label_values(&["failed"])
                        .inc();
                    tracing::debug!("Prefetch of {} returned {}", url, response.status());
                }
                Err(e) => {
                    PREFETCH_REQUESTS_TOTAL
                        .with_label_values(&["failed"])
                        .inc();
                    tracing::debug!("Prefetch of {} failed: {}", url, e);
                }
            }
        });
    }

    /// Warm every answer image a task will show, in presentation order.
    pub fn prefetch_task(&self, task: &Task) {
        for url in task.prefetch_image_urls() {
            self.request(url);
        }
    }
}
