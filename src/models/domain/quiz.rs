use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::domain::quiz_question::{apply_answers, score_questions, Question, Score};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub user_id: Option<ObjectId>, // Nullable: generation can happen before login
    pub title: String,
    pub quiz_type: QuizType,
    #[serde(default)]
    pub attempted: bool,
    #[serde(default)]
    pub score: u8,
    #[serde(default)]
    pub last_attempted: Option<DateTime<Utc>>,
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum QuizType {
    #[default]
    #[serde(rename = "multiple-choice")]
    MultipleChoice,
    #[serde(rename = "boolean")]
    Boolean,
}

impl QuizType {
    pub const ALL: [QuizType; 2] = [QuizType::MultipleChoice, QuizType::Boolean];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuizType::MultipleChoice => "multiple-choice",
            QuizType::Boolean => "boolean",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        QuizType::ALL
            .into_iter()
            .find(|t| t.as_str() == value.trim())
    }
}

impl std::fmt::Display for QuizType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Quiz {
    pub fn new_completed(
        user_id: ObjectId,
        title: &str,
        quiz_type: QuizType,
        questions: Vec<Question>,
        last_attempted: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        let score = score_questions(&questions).percentage;
        Quiz {
            id: None,
            user_id: Some(user_id),
            title: title.trim().to_string(),
            quiz_type,
            attempted: true,
            score,
            last_attempted: Some(last_attempted.unwrap_or(now)),
            questions,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn is_owned_by(&self, user_id: &ObjectId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }

    /// Replaces the recorded attempt: every `user_answer` flag, the score and the
    /// timestamp. Question text and correctness flags are left untouched.
    pub fn record_attempt(&mut self, answers: &[Option<String>]) -> Score {
        apply_answers(&mut self.questions, answers);
        let score = score_questions(&self.questions);

        let now = Utc::now();
        self.score = score.percentage;
        self.attempted = true;
        self.last_attempted = Some(now);
        self.updated_at = Some(now);
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::quiz_question::Choice;

    fn boolean_question(text: &str, answer_is_true: bool) -> Question {
        Question {
            question_text: text.to_string(),
            explanation: Some("because".to_string()),
            choices: vec![
                Choice::new("True", answer_is_true),
                Choice::new("False", !answer_is_true),
            ],
        }
    }

    #[test]
    fn quiz_type_uses_wire_names() {
        let json = serde_json::to_string(&QuizType::MultipleChoice).expect("serialize");
        assert_eq!(json, "\"multiple-choice\"");

        let parsed: QuizType = serde_json::from_str("\"boolean\"").expect("deserialize");
        assert_eq!(parsed, QuizType::Boolean);
    }

    #[test]
    fn quiz_type_rejects_unknown_variant() {
        assert!(serde_json::from_str::<QuizType>("\"essay\"").is_err());
        assert_eq!(QuizType::parse("essay"), None);
        assert_eq!(QuizType::parse(" boolean "), Some(QuizType::Boolean));
    }

    #[test]
    fn record_attempt_rewrites_flags_but_not_questions() {
        let owner = ObjectId::new();
        let mut quiz = Quiz::new_completed(
            owner,
            "  Facts  ",
            QuizType::Boolean,
            vec![boolean_question("A", true), boolean_question("B", false)],
            None,
        );
        assert_eq!(quiz.title, "Facts");
        assert!(quiz.is_owned_by(&owner));

        let before_text: Vec<String> = quiz.questions.iter().map(|q| q.question_text.clone()).collect();
        let score = quiz.record_attempt(&[Some("True".into()), Some("True".into())]);

        assert_eq!(score.percentage, 50);
        assert_eq!(quiz.score, 50);
        assert!(quiz.attempted);
        assert!(quiz.last_attempted.is_some());
        let after_text: Vec<String> = quiz.questions.iter().map(|q| q.question_text.clone()).collect();
        assert_eq!(before_text, after_text);
        assert!(quiz.questions[0].choices[0].is_correct);
        assert!(quiz.questions[1].choices[1].is_correct);
    }

    #[test]
    fn new_completed_derives_score_from_flags() {
        let mut questions = vec![boolean_question("A", true), boolean_question("B", true)];
        questions[0].choices[0].user_answer = true;
        questions[1].choices[1].user_answer = true;

        let quiz = Quiz::new_completed(ObjectId::new(), "T", QuizType::Boolean, questions, None);
        assert_eq!(quiz.score, 50);
    }
}
