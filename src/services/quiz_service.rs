use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::{
    auth::{require_quiz_owner, Claims},
    errors::{AppError, AppResult},
    models::domain::Quiz,
    models::dto::{
        request::{SaveQuizRequest, UpdateQuizRequest},
        response::SavedQuizDto,
        QuizDto,
    },
    repositories::{QuizRepository, UserRepository},
};

pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    users: Arc<dyn UserRepository>,
}

impl QuizService {
    pub fn new(quizzes: Arc<dyn QuizRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { quizzes, users }
    }

    async fn get_owned(&self, claims: &Claims, quiz_id: &str) -> AppResult<Quiz> {
        let id = ObjectId::parse_str(quiz_id)?;
        let quiz = self
            .quizzes
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

        require_quiz_owner(claims, &quiz)?;
        Ok(quiz)
    }

    /// Persists a completed attempt for the authenticated user. The stored score
    /// is derived from the submitted `userAnswer` flags.
    pub async fn save(&self, claims: &Claims, request: SaveQuizRequest) -> AppResult<SavedQuizDto> {
        request.check()?;
        let user_id = claims.user_id()?;

        let quiz = Quiz::new_completed(
            user_id,
            &request.title,
            request.quiz_type,
            request.questions,
            request.last_attempted,
        );
        if let Some(claimed) = request.score {
            if claimed != i64::from(quiz.score) {
                log::warn!(
                    "Client score {} differs from derived score {} for '{}'",
                    claimed,
                    quiz.score,
                    quiz.title
                );
            }
        }

        let quiz = self.quizzes.create(quiz).await?;
        let quiz_id = quiz
            .id
            .ok_or_else(|| AppError::InternalError("Created quiz has no id".to_string()))?;

        let Some(user) = self.users.push_quiz(&user_id, &quiz_id).await? else {
            self.quizzes.delete(&quiz_id).await?;
            return Err(AppError::NotFound("User not found".to_string()));
        };

        log::info!("Saved quiz {} for user {}", quiz_id, user.username);
        Ok(SavedQuizDto {
            quiz: quiz.into(),
            user: user.into(),
        })
    }

    /// Records a re-attempt: answers are re-applied and the score recomputed.
    pub async fn update_attempt(
        &self,
        claims: &Claims,
        quiz_id: &str,
        request: UpdateQuizRequest,
    ) -> AppResult<QuizDto> {
        let claimed_score = request.check()?;
        let mut quiz = self.get_owned(claims, quiz_id).await?;

        if request.user_answers.len() != quiz.questions.len() {
            return Err(AppError::ValidationError(format!(
                "Expected {} answers but received {}",
                quiz.questions.len(),
                request.user_answers.len()
            )));
        }

        let score = quiz.record_attempt(&request.user_answers);
        if claimed_score != i64::from(score.percentage) {
            log::warn!(
                "Client score {} differs from recomputed score {} for quiz {}",
                claimed_score,
                score.percentage,
                quiz_id
            );
        }

        let quiz = self.quizzes.update(quiz).await?;
        log::info!("Updated attempt for quiz {} ({}%)", quiz_id, score.percentage);
        Ok(quiz.into())
    }

    pub async fn delete(&self, claims: &Claims, quiz_id: &str) -> AppResult<()> {
        let quiz = self.get_owned(claims, quiz_id).await?;
        let id = quiz
            .id
            .ok_or_else(|| AppError::InternalError("Stored quiz has no id".to_string()))?;

        if !self.quizzes.delete(&id).await? {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }
        self.users.pull_quiz(&claims.user_id()?, &id).await?;

        log::info!("Deleted quiz {}", id);
        Ok(())
    }

    pub async fn get(&self, claims: &Claims, quiz_id: &str) -> AppResult<QuizDto> {
        Ok(self.get_owned(claims, quiz_id).await?.into())
    }
}
