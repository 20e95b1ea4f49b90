#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;

use earnflow_api::{
    config::Config,
    create_router,
    services::{
        catalog_service::TaskCatalog,
        results_store::{MemoryResultsStore, ResultsStore},
        AppState,
    },
};

// 2100-01-01; locked for any realistic test run.
pub const FAR_FUTURE_START: i64 = 4_102_444_800;

pub fn tasks_payload() -> String {
    format!(
        r#"[
        {{
            "id": "media-survey",
            "provider": {{"name": "Screen Time Weekly", "image_url": "https://cdn.example.com/stw.png"}},
            "price": 30,
            "min_to_complete": 2.5,
            "start_date": 1500000000,
            "desc": "What you watch and how",
            "tags": ["entertainment"],
            "title": "Media survey",
            "items": [
                {{
                    "id": "frequency",
                    "text": "How often do you stream?",
                    "type": "text",
                    "results": [
                        {{"id": "daily", "text": "Daily"}},
                        {{"id": "weekly", "text": "Weekly"}},
                        {{"id": "rarely", "text": "Rarely"}}
                    ]
                }},
                {{
                    "id": "services",
                    "text": "Which services do you use?",
                    "type": "textmultiple",
                    "results": [
                        {{"id": "svc-a", "text": "StreamA"}},
                        {{"id": "svc-b", "text": "StreamB"}},
                        {{"id": "svc-c", "text": "StreamC"}}
                    ]
                }}
            ]
        }},
        {{
            "id": "future-survey",
            "provider": {{"name": "Tomorrow Inc"}},
            "price": 50,
            "min_to_complete": 1.0,
            "start_date": {FAR_FUTURE_START},
            "desc": "Not yet",
            "tags": [],
            "title": "Future survey",
            "items": [
                {{
                    "id": "q1",
                    "text": "Ready?",
                    "type": "text",
                    "results": [{{"id": "yes", "text": "Yes"}}]
                }}
            ]
        }},
        {{
            "id": "broken-survey",
            "provider": {{"name": "Broken Inc"}},
            "price": 10,
            "min_to_complete": 1.0,
            "start_date": 0,
            "desc": "Bad question type",
            "tags": [],
            "title": "Broken survey",
            "items": [
                {{
                    "id": "q1",
                    "text": "Hm?",
                    "type": "freeform",
                    "results": []
                }}
            ]
        }}
    ]"#
    )
}

fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        tasks_source: "inline".to_string(),
        results_store: "memory".to_string(),
        results_dir: "unused".to_string(),
        prefetch_enabled: false,
        unlock_offset_minutes: 0,
    }
}

/// Build the real router over an inline catalog and an in-memory store; no
/// external services are involved.
pub async fn create_test_app() -> (Router, Arc<AppState>) {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let catalog =
        Arc::new(TaskCatalog::from_payload(&tasks_payload()).expect("test payload must parse"));
    let store: Arc<dyn ResultsStore> = Arc::new(MemoryResultsStore::new());

    let state = Arc::new(AppState::with_parts(test_config(), catalog, store));
    (create_router(state.clone()), state)
}

pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    request(app, "GET", uri, None).await
}

pub async fn post(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    request(app, "POST", uri, Some(body)).await
}

pub async fn create_survey(app: &Router, task_id: &str) -> (StatusCode, serde_json::Value) {
    post(
        app,
        "/api/v1/surveys/",
        serde_json::json!({ "task_id": task_id }),
    )
    .await
}

pub async fn submit_selection(
    app: &Router,
    survey_id: &str,
    question_index: usize,
    answer_id: &str,
    selected: bool,
) -> (StatusCode, serde_json::Value) {
    post(
        app,
        &format!("/api/v1/surveys/{survey_id}/answers"),
        serde_json::json!({
            "question_index": question_index,
            "answer_id": answer_id,
            "selected": selected,
        }),
    )
    .await
}

pub async fn advance(app: &Router, survey_id: &str) -> (StatusCode, serde_json::Value) {
    post(
        app,
        &format!("/api/v1/surveys/{survey_id}/advance"),
        serde_json::json!({}),
    )
    .await
}
