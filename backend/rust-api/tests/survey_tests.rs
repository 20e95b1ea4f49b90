use axum::http::StatusCode;
use serde_json::json;

use earnflow_api::models::{ChosenAnswers, TaskResults};
use earnflow_api::services::results_store::ResultsStore;

mod common;

#[tokio::test]
async fn test_full_survey_flow() {
    let (app, _state) = common::create_test_app().await;

    let (status, survey) = common::create_survey(&app, "media-survey").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(survey["status"], "in_progress");
    assert_eq!(survey["current_question"], 0);
    assert_eq!(survey["selections"], json!([[], []]));
    let survey_id = survey["survey_id"].as_str().unwrap().to_string();

    // Single-selection question: the second pick replaces the first.
    let (status, snapshot) = common::submit_selection(&app, &survey_id, 0, "daily", true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["selections"][0], json!(["daily"]));

    let (_, snapshot) = common::submit_selection(&app, &survey_id, 0, "weekly", true).await;
    assert_eq!(snapshot["selections"][0], json!(["weekly"]));

    let (status, snapshot) = common::advance(&app, &survey_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["current_question"], 1);

    // Multiple-selection question behaves as a set.
    common::submit_selection(&app, &survey_id, 1, "svc-a", true).await;
    common::submit_selection(&app, &survey_id, 1, "svc-b", true).await;
    let (_, snapshot) = common::submit_selection(&app, &survey_id, 1, "svc-a", true).await;
    assert_eq!(snapshot["selections"][1], json!(["svc-a", "svc-b"]));

    let (_, snapshot) = common::submit_selection(&app, &survey_id, 1, "svc-b", false).await;
    assert_eq!(snapshot["selections"][1], json!(["svc-a"]));

    // Advancing past the last question completes the flow.
    let (status, snapshot) = common::advance(&app, &survey_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["status"], "completed");
    assert_eq!(snapshot["current_question"], serde_json::Value::Null);

    let (status, results) =
        common::get(&app, &format!("/api/v1/surveys/{survey_id}/results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        results,
        json!({
            "results": [
                {"question_id": "frequency", "result_ids": ["weekly"]},
                {"question_id": "services", "result_ids": ["svc-a"]},
            ]
        })
    );

    // A fresh flow for the same task now opens in review mode.
    let (status, review) = common::create_survey(&app, "media-survey").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(review["status"], "completed");
    assert_eq!(review["results"], results);
}

#[tokio::test]
async fn test_advance_without_selection_is_rejected() {
    let (app, _state) = common::create_test_app().await;

    let (_, survey) = common::create_survey(&app, "media-survey").await;
    let survey_id = survey["survey_id"].as_str().unwrap();

    let (status, _) = common::advance(&app, survey_id).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Nothing changed.
    let (_, snapshot) = common::get(&app, &format!("/api/v1/surveys/{survey_id}")).await;
    assert_eq!(snapshot["current_question"], 0);

    // Selecting and deselecting leaves the set empty again.
    common::submit_selection(&app, survey_id, 0, "daily", true).await;
    common::submit_selection(&app, survey_id, 0, "daily", false).await;
    let (status, _) = common::advance(&app, survey_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_selection_validation() {
    let (app, _state) = common::create_test_app().await;

    let (_, survey) = common::create_survey(&app, "media-survey").await;
    let survey_id = survey["survey_id"].as_str().unwrap();

    // Not the active question.
    let (status, _) = common::submit_selection(&app, survey_id, 1, "svc-a", true).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Out of range.
    let (status, _) = common::submit_selection(&app, survey_id, 9, "svc-a", true).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown answer id.
    let (status, _) = common::submit_selection(&app, survey_id, 0, "nope", true).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Empty answer id fails request validation.
    let (status, _) = common::submit_selection(&app, survey_id, 0, "", true).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_survey_error_cases() {
    let (app, _state) = common::create_test_app().await;

    let (status, _) = common::create_survey(&app, "missing-task").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::create_survey(&app, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::create_survey(&app, "future-survey").await;
    assert_eq!(status, StatusCode::LOCKED);
}

#[tokio::test]
async fn test_unknown_survey_returns_404() {
    let (app, _state) = common::create_test_app().await;

    let (status, _) = common::get(&app, "/api/v1/surveys/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::advance(&app, "does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_results_before_completion_conflict() {
    let (app, _state) = common::create_test_app().await;

    let (_, survey) = common::create_survey(&app, "media-survey").await;
    let survey_id = survey["survey_id"].as_str().unwrap();

    let (status, _) = common::get(&app, &format!("/api/v1/surveys/{survey_id}/results")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_abandoned_survey_is_discarded() {
    let (app, _state) = common::create_test_app().await;

    let (_, survey) = common::create_survey(&app, "media-survey").await;
    let survey_id = survey["survey_id"].as_str().unwrap();

    let (status, _) = common::request(
        &app,
        "DELETE",
        &format!("/api/v1/surveys/{survey_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = common::get(&app, &format!("/api/v1/surveys/{survey_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_partial_prior_results_resume_at_the_gap() {
    let (app, state) = common::create_test_app().await;

    // Seed the store as if a previous session answered the first question.
    let prior = TaskResults {
        results: vec![ChosenAnswers {
            question_id: "frequency".to_string(),
            result_ids: vec!["rarely".to_string()],
        }],
    };
    state.store.save("media-survey", &prior).await.unwrap();

    let (status, survey) = common::create_survey(&app, "media-survey").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(survey["status"], "in_progress");
    assert_eq!(survey["current_question"], 1);
    assert_eq!(survey["selections"][0], json!(["rarely"]));
    assert_eq!(survey["selections"][1], json!([]));
}
