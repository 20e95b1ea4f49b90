pub mod question;
pub mod results;
pub mod survey;
pub mod task;

pub use question::{Answer, Question, QuestionType};
pub use results::{ChosenAnswers, TaskResults};
pub use survey::{
    CreateSurveyRequest, SelectionChanged, SubmitSelectionRequest, SurveyCompleted, SurveyEvent,
    SurveySnapshot, SurveyStatus,
};
pub use task::{Author, Task, TaskSummary};
