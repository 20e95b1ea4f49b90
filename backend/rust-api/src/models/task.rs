use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::question::{Question, QuestionType};
use crate::utils::time as unlock;

/// Who published the task. The payload calls this `provider`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<Url>,
}

/// An earn-able unit of work: metadata, a release time and an ordered
/// sequence of questions. Field names follow the remote payload; the
/// question ordering is the presentation order and never changes after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "provider")]
    pub author: Author,
    #[serde(rename = "price")]
    pub kin_reward: u64,
    #[serde(rename = "min_to_complete")]
    pub minutes_to_complete: f32,
    #[serde(rename = "items")]
    pub questions: Vec<Question>,
    #[serde(rename = "start_date")]
    pub start_at: i64,
    #[serde(rename = "desc")]
    pub subtitle: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub title: String,
}

impl Task {
    /// Earliest availability as an absolute instant. `start_date` on the wire
    /// is a UTC epoch in seconds.
    pub fn start_date(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.start_at, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whole days until the task unlocks, relative to `now`. Zero means the
    /// task should be presented as available.
    pub fn days_to_unlock<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> u32 {
        unlock::days_to_unlock(now, self.start_date())
    }

    /// User-facing availability label for a still-locked task.
    pub fn next_available_day<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        unlock::unlock_label(self.days_to_unlock(now), now)
    }

    /// Answer images worth warming before the survey starts: every answer
    /// image of every text-and-image question, in presentation order.
    pub fn prefetch_image_urls(&self) -> Vec<Url> {
        self.questions
            .iter()
            .filter(|question| question.kind == QuestionType::TextAndImage)
            .flat_map(|question| question.results.iter())
            .filter_map(|answer| answer.image_url.clone())
            .collect()
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

/// Listing view of a task, with its unlock state already computed.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub kin_reward: u64,
    pub minutes_to_complete: f32,
    pub tags: Vec<String>,
    pub question_count: usize,
    pub unlocked: bool,
    pub days_to_unlock: u32,
    /// Present only while the task is locked; the label contract does not
    /// cover already-unlocked tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<String>,
}

impl TaskSummary {
    pub fn from_task<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        let days_to_unlock = task.days_to_unlock(now);
        let available = (days_to_unlock > 0).then(|| task.next_available_day(now));

        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            subtitle: task.subtitle.clone(),
            author: task.author.name.clone(),
            kin_reward: task.kin_reward,
            minutes_to_complete: task.minutes_to_complete,
            tags: task.tags.clone(),
            question_count: task.questions.len(),
            unlocked: days_to_unlock == 0,
            days_to_unlock,
            available,
        }
    }
}
