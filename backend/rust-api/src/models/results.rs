use serde::{Deserialize, Serialize};

use super::question::Question;

/// The recorded answer of a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenAnswers {
    pub question_id: String,
    pub result_ids: Vec<String>,
}

/// Everything a user answered for one task. This is the unit persisted in the
/// results store, keyed by task id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResults {
    pub results: Vec<ChosenAnswers>,
}

impl TaskResults {
    pub fn answer_for(&self, question_id: &str) -> Option<&ChosenAnswers> {
        self.results
            .iter()
            .find(|chosen| chosen.question_id == question_id)
    }

    fn is_answered(&self, question: &Question) -> bool {
        self.answer_for(&question.id)
            .is_some_and(|chosen| !chosen.result_ids.is_empty())
    }

    /// True when every question has a non-empty recorded answer; such results
    /// send a new flow straight to the review presentation.
    pub fn covers(&self, questions: &[Question]) -> bool {
        questions.iter().all(|question| self.is_answered(question))
    }

    /// Index of the first question without a recorded answer, where a resumed
    /// flow picks up.
    pub fn first_unanswered(&self, questions: &[Question]) -> Option<usize> {
        questions
            .iter()
            .position(|question| !self.is_answered(question))
    }
}
