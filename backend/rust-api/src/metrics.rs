use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Results store metrics
    pub static ref STORE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "results_store_operations_total",
        "Total number of results store operations",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref STORE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "results_store_operation_duration_seconds",
        "Results store operation duration in seconds",
        &["operation"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0]
    )
    .unwrap();

    pub static ref RESULTS_LOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "results_loads_total",
        "Prior-results load outcomes per survey creation",
        &["outcome"]
    )
    .unwrap();

    // Business Metrics
    pub static ref SURVEYS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "surveys_total",
        "Total number of survey flows",
        &["status"]
    )
    .unwrap();

    pub static ref SURVEYS_ACTIVE: IntGauge = register_int_gauge!(
        "surveys_active",
        "Number of survey flows currently in progress"
    )
    .unwrap();

    pub static ref ANSWER_SELECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answer_selections_total",
        "Total number of answer selection changes",
        &["action"]
    )
    .unwrap();

    pub static ref PREFETCH_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "prefetch_requests_total",
        "Total number of image prefetch requests",
        &["outcome"]
    )
    .unwrap();

    pub static ref SSE_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sse_connections_active",
        "Number of active SSE connections"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track a results store operation with metrics
pub async fn track_store_operation<F, T>(operation: &str, future: F) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration);

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Just verify that all metrics are properly registered
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
        let _ = SURVEYS_TOTAL.with_label_values(&["created"]).get();
    }

    #[test]
    fn test_render_metrics() {
        // Increment a counter to ensure we have some data
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let result = render_metrics();
        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.contains("http_requests_total"));
    }

    #[tokio::test]
    async fn test_track_store_operation_counts_errors() {
        let failing = track_store_operation("load", async {
            Err::<(), _>(anyhow::anyhow!("disk on fire"))
        })
        .await;
        assert!(failing.is_err());

        let succeeding = track_store_operation("load", async { Ok::<_, anyhow::Error>(42) }).await;
        assert_eq!(succeeding.unwrap(), 42);
    }
}
