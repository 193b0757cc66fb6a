use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::{Question, Quiz, QuizType, Score};

/// Quiz as it travels over the wire. Also used by the client for quizzes that
/// were generated but never persisted, which is why `_id` is optional.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDto {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub title: String,
    pub quiz_type: QuizType,
    #[serde(default)]
    pub attempted: bool,
    #[serde(default)]
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempted: Option<DateTime<Utc>>,
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl QuizDto {
    /// A freshly generated quiz with no owner and no attempt yet.
    pub fn unsaved(title: &str, quiz_type: QuizType, questions: Vec<Question>) -> Self {
        QuizDto {
            id: None,
            user_id: None,
            title: title.to_string(),
            quiz_type,
            attempted: false,
            score: 0,
            last_attempted: None,
            questions,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn score_from_flags(&self) -> Score {
        crate::models::domain::quiz_question::score_questions(&self.questions)
    }
}

impl From<Quiz> for QuizDto {
    fn from(quiz: Quiz) -> Self {
        QuizDto {
            id: quiz.id.map(|oid| oid.to_hex()),
            user_id: quiz.user_id.map(|oid| oid.to_hex()),
            title: quiz.title,
            quiz_type: quiz.quiz_type,
            attempted: quiz.attempted,
            score: quiz.score,
            last_attempted: quiz.last_attempted,
            questions: quiz.questions,
            created_at: quiz.created_at,
            updated_at: quiz.updated_at,
        }
    }
}
