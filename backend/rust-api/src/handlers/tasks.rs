use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::{models::TaskSummary, services::AppState};

/// GET /api/v1/tasks
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = Utc::now().with_timezone(&state.unlock_offset);
    let summaries: Vec<TaskSummary> = state
        .catalog
        .list()
        .iter()
        .map(|task| TaskSummary::from_task(task, &now))
        .collect();

    Json(summaries)
}

/// GET /api/v1/tasks/{id}
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.catalog.get(&task_id) {
        Some(task) => Ok(Json(task.clone())),
        None => Err((
            StatusCode::NOT_FOUND,
            format!("Task not found: {task_id}"),
        )),
    }
}
