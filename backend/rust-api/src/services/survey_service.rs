use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::metrics::{
    track_store_operation, ANSWER_SELECTIONS_TOTAL, RESULTS_LOADS_TOTAL, SURVEYS_ACTIVE,
    SURVEYS_TOTAL,
};
use crate::models::{
    ChosenAnswers, SelectionChanged, SurveyCompleted, SurveyEvent, SurveySnapshot, SurveyStatus,
    Task, TaskResults,
};
use crate::services::catalog_service::TaskCatalog;
use crate::services::prefetch_service::ImagePrefetcher;
use crate::services::results_store::ResultsStore;
use crate::utils::time as unlock;

const EVENT_BUFFER: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Survey not found: {0}")]
    SurveyNotFound(String),
    #[error("Task {task_id} is locked, available {available}")]
    TaskLocked { task_id: String, available: String },
    #[error("Question index {index} is out of range ({count} questions)")]
    QuestionOutOfRange { index: usize, count: usize },
    #[error("Question {index} is not the active question")]
    NotActiveQuestion { index: usize },
    #[error("Answer {answer_id} does not belong to question {index}")]
    UnknownAnswer { index: usize, answer_id: String },
    #[error("Cannot advance: no answer selected for the active question")]
    NoSelection,
    #[error("Survey is already completed")]
    AlreadyCompleted,
    #[error("Survey is not completed yet")]
    NotCompleted,
}

enum FlowState {
    InProgress {
        current: usize,
        selections: Vec<Vec<String>>,
    },
    Completed {
        results: TaskResults,
    },
}

pub enum AdvanceOutcome {
    Moved(usize),
    Completed(TaskResults),
}

/// One survey attempt over one task. All mutation happens through the owning
/// service's lock, so transitions are serialized.
///
/// Selections are kept per question in selection order; single-selection
/// questions hold at most one id, multiple-selection questions behave as a
/// set (inserting a present id is a no-op).
pub struct SurveyFlow {
    pub id: String,
    pub task: Task,
    state: FlowState,
    pub started_at: DateTime<Utc>,
    events: broadcast::Sender<SurveyEvent>,
}

impl SurveyFlow {
    /// Build a flow, applying the resumption rule to any prior results:
    /// covering results skip straight to the review presentation, partial
    /// results resume at the first unanswered question with the recorded
    /// selections pre-filled.
    pub fn new(task: Task, prior: Option<TaskResults>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        // A task with no questions has nothing to ask; the flow is trivially
        // complete rather than stuck on a question that does not exist.
        let state = if task.questions.is_empty() {
            FlowState::Completed {
                results: prior.unwrap_or_default(),
            }
        } else {
            Self::initial_state(&task, prior)
        };

        Self {
            id: Uuid::new_v4().to_string(),
            task,
            state,
            started_at: Utc::now(),
            events,
        }
    }

    fn initial_state(task: &Task, prior: Option<TaskResults>) -> FlowState {
        match prior {
            Some(prior) if prior.covers(&task.questions) => FlowState::Completed { results: prior },
            Some(prior) => {
                let current = prior.first_unanswered(&task.questions).unwrap_or(0);
                let selections = task
                    .questions
                    .iter()
                    .map(|question| {
                        prior
                            .answer_for(&question.id)
                            .map(|chosen| chosen.result_ids.clone())
                            .unwrap_or_default()
                    })
                    .collect();
                FlowState::InProgress {
                    current,
                    selections,
                }
            }
            None => FlowState::InProgress {
                current: 0,
                selections: vec![Vec::new(); task.questions.len()],
            },
        }
    }

    fn check_active(
        current: usize,
        count: usize,
        index: usize,
    ) -> Result<(), SurveyError> {
        if index >= count {
            return Err(SurveyError::QuestionOutOfRange { index, count });
        }
        if index != current {
            return Err(SurveyError::NotActiveQuestion { index });
        }
        Ok(())
    }

    pub fn select_answer(
        &mut self,
        index: usize,
        answer_id: &str,
    ) -> Result<Vec<String>, SurveyError> {
        match &mut self.state {
            FlowState::Completed { .. } => Err(SurveyError::AlreadyCompleted),
            FlowState::InProgress {
                current,
                selections,
            } => {
                Self::check_active(*current, self.task.questions.len(), index)?;

                let question = &self.task.questions[index];
                if !question.has_answer(answer_id) {
                    return Err(SurveyError::UnknownAnswer {
                        index,
                        answer_id: answer_id.to_string(),
                    });
                }

                let selected = &mut selections[index];
                if question.allows_multiple_selection() {
                    if !selected.iter().any(|id| id == answer_id) {
                        selected.push(answer_id.to_string());
                    }
                } else {
                    selected.clear();
                    selected.push(answer_id.to_string());
                }

                Ok(selected.clone())
            }
        }
    }

    pub fn deselect_answer(
        &mut self,
        index: usize,
        answer_id: &str,
    ) -> Result<Vec<String>, SurveyError> {
        match &mut self.state {
            FlowState::Completed { .. } => Err(SurveyError::AlreadyCompleted),
            FlowState::InProgress {
                current,
                selections,
            } => {
                Self::check_active(*current, self.task.questions.len(), index)?;

                let selected = &mut selections[index];
                selected.retain(|id| id != answer_id);
                Ok(selected.clone())
            }
        }
    }

    /// Move to the next question, or complete the flow on the last one. The
    /// active question must have a non-empty selection; otherwise the call is
    /// rejected and nothing changes.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, SurveyError> {
        let outcome = match &mut self.state {
            FlowState::Completed { .. } => return Err(SurveyError::AlreadyCompleted),
            FlowState::InProgress {
                current,
                selections,
            } => {
                let answered = selections
                    .get(*current)
                    .is_some_and(|selected| !selected.is_empty());
                if !answered {
                    return Err(SurveyError::NoSelection);
                }

                if *current + 1 < selections.len() {
                    *current += 1;
                    AdvanceOutcome::Moved(*current)
                } else {
                    let results = TaskResults {
                        results: self
                            .task
                            .questions
                            .iter()
                            .zip(selections.iter())
                            .map(|(question, selected)| ChosenAnswers {
                                question_id: question.id.clone(),
                                result_ids: selected.clone(),
                            })
                            .collect(),
                    };
                    AdvanceOutcome::Completed(results)
                }
            }
        };

        if let AdvanceOutcome::Completed(results) = &outcome {
            self.state = FlowState::Completed {
                results: results.clone(),
            };
        }

        Ok(outcome)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, FlowState::Completed { .. })
    }

    pub fn results(&self) -> Option<&TaskResults> {
        match &self.state {
            FlowState::Completed { results } => Some(results),
            FlowState::InProgress { .. } => None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SurveyEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SurveyEvent) {
        // Nobody listening is fine; events are a courtesy to the
        // presentation layer.
        let _ = self.events.send(event);
    }

    pub fn snapshot(&self) -> SurveySnapshot {
        match &self.state {
            FlowState::InProgress {
                current,
                selections,
            } => SurveySnapshot {
                survey_id: self.id.clone(),
                task_id: self.task.id.clone(),
                status: SurveyStatus::InProgress,
                current_question: Some(*current),
                selections: selections.clone(),
                results: None,
                started_at: self.started_at,
            },
            FlowState::Completed { results } => SurveySnapshot {
                survey_id: self.id.clone(),
                task_id: self.task.id.clone(),
                status: SurveyStatus::Completed,
                current_question: None,
                selections: results
                    .results
                    .iter()
                    .map(|chosen| chosen.result_ids.clone())
                    .collect(),
                results: Some(results.clone()),
                started_at: self.started_at,
            },
        }
    }
}

type SharedLoad = Shared<BoxFuture<'static, Option<TaskResults>>>;

/// Owns every live survey flow and serializes their transitions, the way the
/// presentation thread owned them in the original product.
pub struct SurveyService {
    catalog: Arc<TaskCatalog>,
    store: Arc<dyn ResultsStore>,
    prefetcher: ImagePrefetcher,
    unlock_offset: FixedOffset,
    flows: Mutex<HashMap<String, SurveyFlow>>,
    pending_loads: Mutex<HashMap<String, SharedLoad>>,
}

impl SurveyService {
    pub fn new(
        catalog: Arc<TaskCatalog>,
        store: Arc<dyn ResultsStore>,
        prefetcher: ImagePrefetcher,
        unlock_offset: FixedOffset,
    ) -> Self {
        Self {
            catalog,
            store,
            prefetcher,
            unlock_offset,
            flows: Mutex::new(HashMap::new()),
            pending_loads: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or resume) a flow for `task_id`.
    pub async fn create(&self, task_id: &str) -> Result<SurveySnapshot, SurveyError> {
        let task = self
            .catalog
            .get(task_id)
            .ok_or_else(|| SurveyError::TaskNotFound(task_id.to_string()))?
            .clone();

        let now = Utc::now().with_timezone(&self.unlock_offset);
        let days_to_unlock = task.days_to_unlock(&now);
        if days_to_unlock > 0 {
            return Err(SurveyError::TaskLocked {
                task_id: task.id,
                available: unlock::unlock_label(days_to_unlock, &now),
            });
        }

        self.prefetcher.prefetch_task(&task);
        let prior = self.load_prior(&task.id).await;

        let flow = SurveyFlow::new(task, prior);
        let snapshot = flow.snapshot();

        if flow.is_completed() {
            SURVEYS_TOTAL.with_label_values(&["review"]).inc();
            tracing::info!(
                "Survey {} for task {} opened in review mode",
                flow.id,
                flow.task.id
            );
        } else {
            SURVEYS_TOTAL.with_label_values(&["created"]).inc();
            SURVEYS_ACTIVE.inc();
            tracing::info!(
                "Survey {} created for task {} at question {:?}",
                flow.id,
                flow.task.id,
                snapshot.current_question
            );
        }

        self.flows.lock().await.insert(flow.id.clone(), flow);
        Ok(snapshot)
    }

    /// Load prior results, deduplicating concurrent loads for the same task:
    /// late callers piggy-back on the in-flight future instead of issuing a
    /// second store read.
    async fn load_prior(&self, task_id: &str) -> Option<TaskResults> {
        let (load, initiated) = {
            let mut pending = self.pending_loads.lock().await;
            if let Some(existing) = pending.get(task_id) {
                RESULTS_LOADS_TOTAL
                    .with_label_values(&["deduplicated"])
                    .inc();
                (existing.clone(), false)
            } else {
                let store = self.store.clone();
                let id = task_id.to_string();
                let load: SharedLoad = async move {
                    match track_store_operation("load", store.load(&id)).await {
                        Ok(prior) => prior,
                        Err(e) => {
                            // Not fatal: the flow simply starts fresh.
                            tracing::warn!(
                                "Loading prior results for task {} failed, starting fresh: {}",
                                id,
                                e
                            );
                            None
                        }
                    }
                }
                .boxed()
                .shared();

                pending.insert(task_id.to_string(), load.clone());
                (load, true)
            }
        };

        let prior = load.await;

        if initiated {
            self.pending_loads.lock().await.remove(task_id);
            let outcome = if prior.is_some() { "hit" } else { "miss" };
            RESULTS_LOADS_TOTAL.with_label_values(&[outcome]).inc();
        }

        prior
    }

    pub async fn get(&self, survey_id: &str) -> Result<SurveySnapshot, SurveyError> {
        let flows = self.flows.lock().await;
        let flow = flows
            .get(survey_id)
            .ok_or_else(|| SurveyError::SurveyNotFound(survey_id.to_string()))?;
        Ok(flow.snapshot())
    }

    /// Apply a selection change to the active question and notify
    /// subscribers.
    pub async fn select(
        &self,
        survey_id: &str,
        question_index: usize,
        answer_id: &str,
        selected: bool,
    ) -> Result<SurveySnapshot, SurveyError> {
        let mut flows = self.flows.lock().await;
        let flow = flows
            .get_mut(survey_id)
            .ok_or_else(|| SurveyError::SurveyNotFound(survey_id.to_string()))?;

        let selected_ids = if selected {
            flow.select_answer(question_index, answer_id)?
        } else {
            flow.deselect_answer(question_index, answer_id)?
        };

        ANSWER_SELECTIONS_TOTAL
            .with_label_values(&[if selected { "select" } else { "deselect" }])
            .inc();

        flow.emit(SurveyEvent::SelectionChanged(SelectionChanged {
            survey_id: flow.id.clone(),
            question_index,
            selected_answer_ids: selected_ids,
            timestamp: Utc::now(),
        }));

        Ok(flow.snapshot())
    }

    /// Advance the flow; completing it persists the results and emits the
    /// final event.
    pub async fn advance(&self, survey_id: &str) -> Result<SurveySnapshot, SurveyError> {
        let mut flows = self.flows.lock().await;
        let flow = flows
            .get_mut(survey_id)
            .ok_or_else(|| SurveyError::SurveyNotFound(survey_id.to_string()))?;

        match flow.advance()? {
            AdvanceOutcome::Moved(next) => {
                tracing::debug!("Survey {} advanced to question {}", flow.id, next);
            }
            AdvanceOutcome::Completed(results) => {
                if let Err(e) =
                    track_store_operation("save", self.store.save(&flow.task.id, &results)).await
                {
                    // Completion is terminal either way; the loss is logged.
                    tracing::error!(
                        "Failed to persist results for task {}: {}",
                        flow.task.id,
                        e
                    );
                }

                SURVEYS_TOTAL.with_label_values(&["completed"]).inc();
                SURVEYS_ACTIVE.dec();

                flow.emit(SurveyEvent::SurveyCompleted(SurveyCompleted {
                    survey_id: flow.id.clone(),
                    task_id: flow.task.id.clone(),
                    results,
                    timestamp: Utc::now(),
                }));

                tracing::info!("Survey {} completed for task {}", flow.id, flow.task.id);
            }
        }

        Ok(flow.snapshot())
    }

    pub async fn results(&self, survey_id: &str) -> Result<TaskResults, SurveyError> {
        let flows = self.flows.lock().await;
        let flow = flows
            .get(survey_id)
            .ok_or_else(|| SurveyError::SurveyNotFound(survey_id.to_string()))?;
        flow.results().cloned().ok_or(SurveyError::NotCompleted)
    }

    pub async fn subscribe(
        &self,
        survey_id: &str,
    ) -> Result<broadcast::Receiver<SurveyEvent>, SurveyError> {
        let flows = self.flows.lock().await;
        let flow = flows
            .get(survey_id)
            .ok_or_else(|| SurveyError::SurveyNotFound(survey_id.to_string()))?;
        Ok(flow.subscribe())
    }

    /// Drop a flow. Its session state is discarded; a later create starts a
    /// fresh instance.
    pub async fn abandon(&self, survey_id: &str) -> Result<(), SurveyError> {
        let mut flows = self.flows.lock().await;
        let flow = flows
            .remove(survey_id)
            .ok_or_else(|| SurveyError::SurveyNotFound(survey_id.to_string()))?;

        if !flow.is_completed() {
            SURVEYS_ACTIVE.dec();
        }
        SURVEYS_TOTAL.with_label_values(&["abandoned"]).inc();
        tracing::info!("Survey {} abandoned", survey_id);
        Ok(())
    }
}
