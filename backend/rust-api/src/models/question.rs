use serde::{Deserialize, Serialize};
use url::Url;

/// Question kind, as spelled in the remote payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "textimage")]
    TextAndImage,
    #[serde(rename = "textmultiple")]
    MultipleText,
    #[serde(rename = "textemoji")]
    TextEmoji,
    #[serde(rename = "tip")]
    Tip,
}

/// A single survey prompt with its ordered answer choices.
///
/// A missing or unknown `type` fails deserialization, which marks the whole
/// task as unusable at catalog load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub image_url: Option<Url>,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub results: Vec<Answer>,
}

/// A selectable answer of a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: String,
    #[serde(default)]
    pub image_url: Option<Url>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Question {
    /// Multiple-choice questions accumulate a set of answers; every other kind
    /// keeps exactly one active selection.
    pub fn allows_multiple_selection(&self) -> bool {
        self.kind == QuestionType::MultipleText
    }

    pub fn has_answer(&self, answer_id: &str) -> bool {
        self.results.iter().any(|answer| answer.id == answer_id)
    }
}

// Identity is the key field alone, so adding payload fields later cannot
// silently change comparisons.
impl PartialEq for Question {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Question {}

#[cfg(test)]
mod tests {
    use super::*;

    fn question_json(kind: &str) -> String {
        format!(
            r#"{{
                "id": "q1",
                "image_url": null,
                "text": "How did you hear about us?",
                "type": "{kind}",
                "results": [
                    {{"id": "a1", "text": "A friend"}},
                    {{"id": "a2", "text": "An ad"}}
                ]
            }}"#
        )
    }

    #[test]
    fn decodes_every_question_type_literal() {
        for (literal, expected) in [
            ("text", QuestionType::Text),
            ("textimage", QuestionType::TextAndImage),
            ("textmultiple", QuestionType::MultipleText),
            ("textemoji", QuestionType::TextEmoji),
            ("tip", QuestionType::Tip),
        ] {
            let question: Question = serde_json::from_str(&question_json(literal)).unwrap();
            assert_eq!(question.kind, expected);
        }
    }

    #[test]
    fn unknown_type_fails_deserialization() {
        let result = serde_json::from_str::<Question>(&question_json("freeform"));
        assert!(result.is_err());
    }

    #[test]
    fn missing_type_fails_deserialization() {
        let json = r#"{"id": "q1", "text": "Hm?", "results": []}"#;
        assert!(serde_json::from_str::<Question>(json).is_err());
    }

    #[test]
    fn only_multiple_text_allows_multiple_selection() {
        for (literal, multiple) in [
            ("text", false),
            ("textimage", false),
            ("textmultiple", true),
            ("textemoji", false),
            ("tip", false),
        ] {
            let question: Question = serde_json::from_str(&question_json(literal)).unwrap();
            assert_eq!(question.allows_multiple_selection(), multiple);
        }
    }

    #[test]
    fn equality_compares_the_id_only() {
        let mut a: Question = serde_json::from_str(&question_json("text")).unwrap();
        let b: Question = serde_json::from_str(&question_json("textemoji")).unwrap();
        a.text = "Completely different prompt".to_string();
        assert_eq!(a, b);
    }
}
