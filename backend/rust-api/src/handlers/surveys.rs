use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    models::{CreateSurveyRequest, SubmitSelectionRequest},
    services::{survey_service::SurveyError, AppState},
};

fn status_for(error: &SurveyError) -> StatusCode {
    match error {
        SurveyError::TaskNotFound(_) | SurveyError::SurveyNotFound(_) => StatusCode::NOT_FOUND,
        SurveyError::TaskLocked { .. } => StatusCode::LOCKED,
        SurveyError::QuestionOutOfRange { .. } | SurveyError::UnknownAnswer { .. } => {
            StatusCode::BAD_REQUEST
        }
        SurveyError::NotActiveQuestion { .. }
        | SurveyError::NoSelection
        | SurveyError::AlreadyCompleted
        | SurveyError::NotCompleted => StatusCode::CONFLICT,
    }
}

fn error_response(error: SurveyError) -> (StatusCode, String) {
    (status_for(&error), error.to_string())
}

pub async fn create_survey(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSurveyRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    tracing::info!("Creating survey for task_id={}", req.task_id);

    match state.surveys.create(&req.task_id).await {
        Ok(snapshot) => Ok((StatusCode::CREATED, Json(snapshot))),
        Err(e) => {
            tracing::warn!("Failed to create survey: {}", e);
            Err(error_response(e))
        }
    }
}

pub async fn get_survey(
    State(state): State<Arc<AppState>>,
    Path(survey_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.surveys.get(&survey_id).await {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn submit_selection(
    State(state): State<Arc<AppState>>,
    Path(survey_id): Path<String>,
    Json(req): Json<SubmitSelectionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    match state
        .surveys
        .select(&survey_id, req.question_index, &req.answer_id, req.selected)
        .await
    {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(e) => {
            tracing::warn!("Selection rejected for survey {}: {}", survey_id, e);
            Err(error_response(e))
        }
    }
}

pub async fn advance_survey(
    State(state): State<Arc<AppState>>,
    Path(survey_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.surveys.advance(&survey_id).await {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(e) => {
            tracing::warn!("Advance rejected for survey {}: {}", survey_id, e);
            Err(error_response(e))
        }
    }
}

pub async fn get_results(
    State(state): State<Arc<AppState>>,
    Path(survey_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.surveys.results(&survey_id).await {
        Ok(results) => Ok(Json(results)),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn abandon_survey(
    State(state): State<Arc<AppState>>,
    Path(survey_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.surveys.abandon(&survey_id).await {
        Ok(()) => Ok((StatusCode::NO_CONTENT, ())),
        Err(e) => Err(error_response(e)),
    }
}
