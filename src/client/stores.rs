use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::errors::ClientResult;
use crate::client::storage::{load_json, save_json, KeyValueStore};
use crate::models::dto::{QuizDto, UserDto};

pub const USER_STATE_KEY: &str = "quiz-storage";
pub const QUIZ_STATE_KEY: &str = "quiz-store";
pub const DEFAULT_NUMBER_OF_QUESTIONS: u8 = 5;

/// Attempt identifier for a quiz that already exists on the server.
pub fn saved_attempt_id(quiz_id: &str) -> String {
    format!("saved-{}", quiz_id)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    #[serde(default)]
    pub current_user: Option<UserDto>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub current_attempt_id: Option<String>,
}

/// Authenticated-user container. Every mutation is written through.
pub struct UserStore {
    store: Arc<dyn KeyValueStore>,
    state: UserState,
}

impl UserStore {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let state = load_json(store.as_ref(), USER_STATE_KEY).unwrap_or_default();
        Self { store, state }
    }

    pub fn state(&self) -> &UserState {
        &self.state
    }

    pub fn current_user(&self) -> Option<&UserDto> {
        self.state.current_user.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.state.access_token.as_deref()
    }

    fn persist(&self) -> ClientResult<()> {
        save_json(self.store.as_ref(), USER_STATE_KEY, &self.state)
    }

    pub fn login(&mut self, user: UserDto, access_token: String) -> ClientResult<()> {
        self.state.current_user = Some(user);
        self.state.access_token = Some(access_token);
        self.persist()
    }

    pub fn logout(&mut self) -> ClientResult<()> {
        self.state = UserState::default();
        self.persist()
    }

    pub fn attempt_id(&self) -> Option<&str> {
        self.state.current_attempt_id.as_deref()
    }

    pub fn get_or_generate_attempt_id(&mut self) -> ClientResult<String> {
        if let Some(id) = &self.state.current_attempt_id {
            return Ok(id.clone());
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.set_attempt_id(&id)?;
        Ok(id)
    }

    /// A new generation always gets a fresh identifier.
    pub fn begin_generation(&mut self) -> ClientResult<String> {
        self.state.current_attempt_id = None;
        self.get_or_generate_attempt_id()
    }

    pub fn resume_saved(&mut self, quiz_id: &str) -> ClientResult<String> {
        let id = saved_attempt_id(quiz_id);
        self.set_attempt_id(&id)?;
        Ok(id)
    }

    pub fn set_attempt_id(&mut self, id: &str) -> ClientResult<()> {
        self.state.current_attempt_id = Some(id.to_string());
        self.persist()
    }

    pub fn clear_attempt_id(&mut self) -> ClientResult<()> {
        self.state.current_attempt_id = None;
        self.persist()
    }

    pub fn update_details(&mut self, email: Option<String>, username: Option<String>) -> ClientResult<()> {
        if let Some(user) = self.state.current_user.as_mut() {
            if let Some(email) = email {
                user.email = email;
            }
            if let Some(username) = username {
                user.username = username;
            }
        }
        self.persist()
    }

    pub fn update_avatar(&mut self, url: &str) -> ClientResult<()> {
        if let Some(user) = self.state.current_user.as_mut() {
            user.avatar = url.to_string();
        }
        self.persist()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizState {
    #[serde(default)]
    pub current_quiz: Option<QuizDto>,
    /// Set while a saved quiz is being re-attempted.
    #[serde(default)]
    pub updated_quiz: Option<QuizDto>,
    #[serde(default = "default_number_of_questions")]
    pub number_of_questions: u8,
}

fn default_number_of_questions() -> u8 {
    DEFAULT_NUMBER_OF_QUESTIONS
}

impl Default for QuizState {
    fn default() -> Self {
        Self {
            current_quiz: None,
            updated_quiz: None,
            number_of_questions: DEFAULT_NUMBER_OF_QUESTIONS,
        }
    }
}

/// In-progress-quiz container.
pub struct QuizStore {
    store: Arc<dyn KeyValueStore>,
    state: QuizState,
}

impl QuizStore {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let state = load_json(store.as_ref(), QUIZ_STATE_KEY).unwrap_or_default();
        Self { store, state }
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn current_quiz(&self) -> Option<&QuizDto> {
        self.state.current_quiz.as_ref()
    }

    pub fn updated_quiz(&self) -> Option<&QuizDto> {
        self.state.updated_quiz.as_ref()
    }

    fn persist(&self) -> ClientResult<()> {
        save_json(self.store.as_ref(), QUIZ_STATE_KEY, &self.state)
    }

    pub fn set_current_quiz(&mut self, quiz: Option<QuizDto>) -> ClientResult<()> {
        self.state.current_quiz = quiz;
        self.persist()
    }

    pub fn set_number_of_questions(&mut self, count: u8) -> ClientResult<()> {
        self.state.number_of_questions = count;
        self.persist()
    }

    pub fn set_update_quiz(&mut self, quiz: Option<QuizDto>) -> ClientResult<()> {
        self.state.updated_quiz = quiz;
        self.persist()
    }

    pub fn clear_updated_quiz(&mut self) -> ClientResult<()> {
        self.set_update_quiz(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::storage::MemoryStore;
    use crate::models::domain::QuizType;

    fn user() -> UserDto {
        UserDto {
            id: "64b7f0c2a1b2c3d4e5f60718".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            avatar: "https://img/a.png".to_string(),
            user_quizzes: vec![],
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_begin_generation_never_reuses_an_id() {
        let mut users = UserStore::load(Arc::new(MemoryStore::new()));
        let first = users.begin_generation().unwrap();
        let second = users.begin_generation().unwrap();

        assert_ne!(first, second);
        assert_eq!(users.attempt_id(), Some(second.as_str()));
    }

    #[test]
    fn test_get_or_generate_is_stable() {
        let mut users = UserStore::load(Arc::new(MemoryStore::new()));
        let id = users.get_or_generate_attempt_id().unwrap();
        assert_eq!(users.get_or_generate_attempt_id().unwrap(), id);
    }

    #[test]
    fn test_resume_saved_is_deterministic() {
        let mut users = UserStore::load(Arc::new(MemoryStore::new()));
        assert_eq!(users.resume_saved("abc").unwrap(), "saved-abc");
        assert_eq!(users.resume_saved("abc").unwrap(), "saved-abc");
    }

    #[test]
    fn test_user_state_persists_and_logout_clears() {
        let backing: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        {
            let mut users = UserStore::load(backing.clone());
            users.login(user(), "token".to_string()).unwrap();
            users.update_avatar("https://img/b.png").unwrap();
            users.begin_generation().unwrap();
        }

        let mut reloaded = UserStore::load(backing.clone());
        assert_eq!(reloaded.current_user().unwrap().avatar, "https://img/b.png");
        assert_eq!(reloaded.access_token(), Some("token"));

        reloaded.logout().unwrap();
        let reloaded = UserStore::load(backing);
        assert!(reloaded.current_user().is_none());
        assert!(reloaded.attempt_id().is_none());
    }

    #[test]
    fn test_quiz_state_defaults_and_updated_slot() {
        let backing: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut quizzes = QuizStore::load(backing.clone());
        assert_eq!(quizzes.state().number_of_questions, 5);

        let quiz = QuizDto::unsaved("Draft", QuizType::Boolean, vec![]);
        quizzes.set_update_quiz(Some(quiz.clone())).unwrap();
        assert_eq!(QuizStore::load(backing.clone()).updated_quiz(), Some(&quiz));

        quizzes.clear_updated_quiz().unwrap();
        assert!(QuizStore::load(backing).updated_quiz().is_none());
    }

    #[test]
    fn test_corrupt_state_falls_back_to_default() {
        let backing: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        backing.set(QUIZ_STATE_KEY, "{{{".to_string()).unwrap();
        let quizzes = QuizStore::load(backing);
        assert_eq!(quizzes.state(), &QuizState::default());
    }
}
