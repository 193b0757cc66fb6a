use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub text: String,
    pub is_correct: bool,
    /// Whether the test-taker picked this choice on the most recent attempt.
    #[serde(default)]
    pub user_answer: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
    pub percentage: u8,
}

impl Question {
    pub fn correct_choice(&self) -> Option<&Choice> {
        self.choices.iter().find(|c| c.is_correct)
    }

    pub fn is_answered_correctly(&self) -> bool {
        self.choices.iter().any(|c| c.is_correct && c.user_answer)
    }
}

impl Choice {
    pub fn new(text: &str, is_correct: bool) -> Self {
        Choice {
            text: text.to_string(),
            is_correct,
            user_answer: false,
        }
    }
}

/// Recomputes every `user_answer` flag from the raw per-question answers.
///
/// A choice is selected when its text equals the answer given for its question;
/// questions without an answer end up with every flag cleared.
pub fn apply_answers(questions: &mut [Question], answers: &[Option<String>]) {
    for (index, question) in questions.iter_mut().enumerate() {
        let answer = answers.get(index).and_then(|a| a.as_deref());
        for choice in &mut question.choices {
            choice.user_answer = answer == Some(choice.text.as_str());
        }
    }
}

/// Scores a question set purely from its `is_correct`/`user_answer` flags.
pub fn score_questions(questions: &[Question]) -> Score {
    let total = questions.len();
    let correct = questions
        .iter()
        .filter(|q| q.is_answered_correctly())
        .count();

    let percentage = if total == 0 {
        0
    } else {
        ((correct as f64 / total as f64) * 100.0).round() as u8
    };

    Score {
        correct,
        total,
        percentage,
    }
}
