use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::client::api::QuizApi;
use crate::client::attempt::AttemptSession;
use crate::client::attempt_cache::AttemptCache;
use crate::client::errors::{AttemptResult, ClientResult};
use crate::client::input::{generation_request, GenerationInput, QuizOptions};
use crate::client::storage::KeyValueStore;
use crate::client::stores::{saved_attempt_id, QuizStore, UserStore};
use crate::models::dto::{request::LoginRequest, QuizDto, UserDto};

/// Client-side application state: both containers plus the attempt cache,
/// all backed by one key/value store.
pub struct ClientShell {
    pub users: UserStore,
    pub quizzes: QuizStore,
    pub cache: AttemptCache,
}

impl ClientShell {
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            users: UserStore::load(store.clone()),
            quizzes: QuizStore::load(store.clone()),
            cache: AttemptCache::new(store),
        }
    }

    /// Re-applies a persisted access token to the API client.
    pub fn restore_session(&self, api: &dyn QuizApi) {
        api.set_access_token(self.users.access_token().map(str::to_string));
    }

    pub async fn login(&mut self, api: &dyn QuizApi, request: &LoginRequest) -> ClientResult<UserDto> {
        let response = api.login(request).await?;
        api.set_access_token(Some(response.access_token.clone()));
        self.users.login(response.user.clone(), response.access_token)?;
        log::info!("Logged in as {}", response.user.username);
        Ok(response.user)
    }

    /// Local state is cleared even if the server call fails.
    pub async fn logout(&mut self, api: &dyn QuizApi) -> ClientResult<()> {
        let remote = api.logout().await;
        api.set_access_token(None);
        self.users.logout()?;
        remote
    }

    /// Generates a quiz, makes it current and starts a fresh attempt id.
    pub async fn generate(
        &mut self,
        api: &dyn QuizApi,
        input: GenerationInput,
        options: &QuizOptions,
    ) -> ClientResult<QuizDto> {
        let request = generation_request(input, options)?;
        let quiz = api.generate_quiz(&request).await?;

        self.users.begin_generation()?;
        self.quizzes.set_update_quiz(None)?;
        self.quizzes.set_number_of_questions(options.num_questions)?;
        self.quizzes.set_current_quiz(Some(quiz.clone()))?;
        Ok(quiz)
    }

    /// Opens a quiz from the user's history for another attempt. Any earlier
    /// submission of it is dropped so the attempt starts unanswered.
    pub fn reattempt(&mut self, quiz: QuizDto) -> ClientResult<()> {
        if let Some(quiz_id) = &quiz.id {
            self.cache.remove(&saved_attempt_id(quiz_id))?;
        }
        self.quizzes.set_update_quiz(Some(quiz.clone()))?;
        self.quizzes.set_current_quiz(Some(quiz))
    }

    pub fn start_attempt(&mut self, now: DateTime<Utc>) -> AttemptResult<AttemptSession> {
        AttemptSession::load(&mut self.users, &self.quizzes, &self.cache, now)
    }

    pub async fn persist(
        &mut self,
        api: &dyn QuizApi,
        session: &mut AttemptSession,
    ) -> AttemptResult<crate::client::attempt::PersistOutcome> {
        session
            .persist(api, &mut self.users, &mut self.quizzes, &self.cache)
            .await
    }
}
