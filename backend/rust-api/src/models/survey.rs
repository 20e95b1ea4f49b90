use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::results::TaskResults;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyStatus {
    InProgress,
    Completed,
}

/// What the presentation layer sees of a flow: the active question, the
/// per-question selections, and the final results once completed.
#[derive(Debug, Clone, Serialize)]
pub struct SurveySnapshot {
    pub survey_id: String,
    pub task_id: String,
    pub status: SurveyStatus,
    pub current_question: Option<usize>,
    pub selections: Vec<Vec<String>>,
    pub results: Option<TaskResults>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSurveyRequest {
    #[validate(length(min = 1))]
    pub task_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitSelectionRequest {
    pub question_index: usize,
    #[validate(length(min = 1))]
    pub answer_id: String,
    #[serde(default = "default_selected")]
    pub selected: bool,
}

fn default_selected() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SurveyEvent {
    SelectionChanged(SelectionChanged),
    SurveyCompleted(SurveyCompleted),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SelectionChanged {
    pub survey_id: String,
    pub question_index: usize,
    pub selected_answer_ids: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SurveyCompleted {
    pub survey_id: String,
    pub task_id: String,
    pub results: TaskResults,
    pub timestamp: DateTime<Utc>,
}

impl SurveyEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            SurveyEvent::SelectionChanged(_) => "selection-changed",
            SurveyEvent::SurveyCompleted(_) => "survey-completed",
        }
    }
}
