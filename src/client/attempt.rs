use chrono::{DateTime, Utc};

use crate::client::api::QuizApi;
use crate::client::attempt_cache::{AttemptCache, CachedAttempt};
use crate::client::errors::{AttemptError, AttemptResult};
use crate::client::stores::{QuizStore, UserStore};
use crate::models::domain::quiz_question::{apply_answers, score_questions};
use crate::models::dto::{
    request::{SaveQuizRequest, UpdateQuizRequest},
    QuizDto,
};

const TITLE_SUFFIX_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Uninitialized,
    FreshUnanswered,
    /// A cached submission was found on load; shown as submitted.
    Restored,
    InProgress,
    Submitted,
    ResultsHidden,
    Persisted,
}

impl AttemptState {
    pub fn is_submitted(self) -> bool {
        matches!(
            self,
            AttemptState::Restored
                | AttemptState::Submitted
                | AttemptState::ResultsHidden
                | AttemptState::Persisted
        )
    }
}

/// What a successful save did on the server.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    Created(QuizDto),
    Updated(QuizDto),
}

/// One pass through a quiz: answering, submitting, reviewing and saving.
#[derive(Debug, Clone)]
pub struct AttemptSession {
    state: AttemptState,
    attempt_id: Option<String>,
    quiz: Option<QuizDto>,
    answers: Vec<Option<String>>,
    result: Option<CachedAttempt>,
}

impl Default for AttemptSession {
    fn default() -> Self {
        Self {
            state: AttemptState::Uninitialized,
            attempt_id: None,
            quiz: None,
            answers: Vec::new(),
            result: None,
        }
    }
}

impl AttemptSession {
    /// Opens the current quiz, restoring a cached submission when one exists
    /// for this attempt.
    pub fn load(
        users: &mut UserStore,
        quizzes: &QuizStore,
        cache: &AttemptCache,
        now: DateTime<Utc>,
    ) -> AttemptResult<Self> {
        cache.sweep(now)?;

        let Some(quiz) = quizzes.current_quiz().cloned() else {
            return Ok(Self::default());
        };

        let attempt_id = match &quiz.id {
            Some(quiz_id) => users.resume_saved(quiz_id)?,
            None => users.get_or_generate_attempt_id()?,
        };

        let session = match cache.load(&attempt_id, now)? {
            Some(cached) => {
                log::debug!("Restoring submitted attempt {}", attempt_id);
                let result = rescore(cached, &quiz);
                Self {
                    state: AttemptState::Restored,
                    attempt_id: Some(attempt_id),
                    answers: result.user_answers.clone(),
                    quiz: Some(quiz),
                    result: Some(result),
                }
            }
            None => Self {
                state: AttemptState::FreshUnanswered,
                attempt_id: Some(attempt_id),
                answers: vec![None; quiz.questions.len()],
                quiz: Some(quiz),
                result: None,
            },
        };
        Ok(session)
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn attempt_id(&self) -> Option<&str> {
        self.attempt_id.as_deref()
    }

    pub fn quiz(&self) -> Option<&QuizDto> {
        self.quiz.as_ref()
    }

    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    /// The scored submission, with `userAnswer` flags, once submitted.
    pub fn result(&self) -> Option<&CachedAttempt> {
        self.result.as_ref()
    }

    pub fn results_visible(&self) -> bool {
        matches!(
            self.state,
            AttemptState::Restored | AttemptState::Submitted | AttemptState::Persisted
        )
    }

    pub fn unanswered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_none()).count()
    }

    /// Ignored once the attempt has been submitted.
    pub fn select_answer(&mut self, question: usize, answer: &str) -> AttemptResult<()> {
        if self.state.is_submitted() {
            return Ok(());
        }
        if self.quiz.is_none() {
            return Err(AttemptError::NoQuiz);
        }
        let slot = self
            .answers
            .get_mut(question)
            .ok_or(AttemptError::QuestionOutOfRange(question))?;

        *slot = Some(answer.to_string());
        self.state = AttemptState::InProgress;
        Ok(())
    }

    pub fn submit(&mut self, cache: &AttemptCache, now: DateTime<Utc>) -> AttemptResult<&CachedAttempt> {
        if self.state.is_submitted() {
            return Err(AttemptError::AlreadySubmitted);
        }
        let (Some(quiz), Some(attempt_id)) = (&self.quiz, &self.attempt_id) else {
            return Err(AttemptError::NoQuiz);
        };

        let unanswered = self.unanswered_count();
        if unanswered > 0 {
            return Err(AttemptError::Unanswered(unanswered));
        }

        let entry = cache.record(attempt_id, quiz, &self.answers, now)?;
        self.state = AttemptState::Submitted;
        Ok(self.result.insert(entry))
    }

    pub fn hide_results(&mut self) {
        if matches!(self.state, AttemptState::Submitted | AttemptState::Restored) {
            self.state = AttemptState::ResultsHidden;
        }
    }

    pub fn show_results(&mut self) {
        if self.state == AttemptState::ResultsHidden {
            self.state = AttemptState::Submitted;
        }
    }

    /// Saves the submission to the server: a quiz without a server id is
    /// created under a suffixed title, a known quiz gets its attempt updated.
    /// On failure nothing local changes and the call may be retried.
    pub async fn persist(
        &mut self,
        api: &dyn QuizApi,
        users: &mut UserStore,
        quizzes: &mut QuizStore,
        cache: &AttemptCache,
    ) -> AttemptResult<PersistOutcome> {
        if !self.state.is_submitted() {
            return Err(AttemptError::NotSubmitted);
        }
        let (Some(result), Some(attempt_id)) = (self.result.clone(), self.attempt_id.clone()) else {
            return Err(AttemptError::NotSubmitted);
        };

        let server_id = result
            .quiz
            .id
            .clone()
            .or_else(|| quizzes.updated_quiz().and_then(|q| q.id.clone()));

        let outcome = match server_id {
            None => {
                let request = SaveQuizRequest {
                    title: unique_title(&result.quiz.title),
                    questions: result.quiz.questions.clone(),
                    quiz_type: result.quiz.quiz_type,
                    score: Some(i64::from(result.score)),
                    last_attempted: Some(result.submitted_at),
                };
                let saved = api.save_quiz(&request).await?;
                PersistOutcome::Created(saved.quiz)
            }
            Some(quiz_id) => {
                let request = UpdateQuizRequest {
                    user_answers: result.user_answers.clone(),
                    score: Some(i64::from(result.score)),
                };
                let updated = api.update_quiz(&quiz_id, &request).await?;
                quizzes.clear_updated_quiz()?;
                PersistOutcome::Updated(updated)
            }
        };

        cache.mark_saved(&attempt_id)?;
        users.clear_attempt_id()?;
        self.state = AttemptState::Persisted;
        Ok(outcome)
    }
}

/// Only the raw answers are taken from the cache; flags and score are
/// recomputed against the quiz as it is now.
fn rescore(mut cached: CachedAttempt, quiz: &QuizDto) -> CachedAttempt {
    cached.user_answers.resize(quiz.questions.len(), None);
    let mut scored = quiz.clone();
    apply_answers(&mut scored.questions, &cached.user_answers);
    cached.score = score_questions(&scored.questions).percentage;
    cached.quiz = scored;
    cached
}

/// `<title>_<7 random chars>` so repeated saves never collide on title.
pub fn unique_title(title: &str) -> String {
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(TITLE_SUFFIX_LEN)
        .collect();
    format!("{}_{}", title, suffix)
}
