#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use quizzii_server::{
    app_state::AppState,
    config::Config,
    errors::{AppError, AppResult},
    models::domain::{Quiz, User},
    repositories::{QuizRepository, UserRepository},
    services::{
        generation_service::TextGenerator,
        media_service::{ImageUpload, MediaStore, StoredImage},
    },
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    pub users: Arc<RwLock<HashMap<ObjectId, User>>>,
    /// When set, `update` fails as if the database were unreachable.
    pub fail_updates: AtomicBool,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, mut user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(AppError::AlreadyExists("duplicate key".to_string()));
        }
        let id = *user.id.get_or_insert_with(ObjectId::new);
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| {
                username == Some(u.username.as_str()) || email == Some(u.email.as_str())
            })
            .cloned())
    }

    async fn find_conflict(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<&ObjectId>,
    ) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|u| u.id.as_ref() != exclude)
            .find(|u| {
                username == Some(u.username.as_str()) || email == Some(u.email.as_str())
            })
            .cloned())
    }

    async fn update(&self, user: User) -> AppResult<User> {
        let id = user
            .id
            .ok_or_else(|| AppError::InternalError("missing id".to_string()))?;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("connection reset".to_string()));
        }
        let mut users = self.users.write().await;
        if !users.contains_key(&id) {
            return Err(AppError::NotFound(format!("User with id '{}' not found", id)));
        }
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn push_quiz(&self, user_id: &ObjectId, quiz_id: &ObjectId) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(user_id).map(|user| {
            user.user_quizzes.push(*quiz_id);
            user.clone()
        }))
    }

    async fn pull_quiz(&self, user_id: &ObjectId, quiz_id: &ObjectId) -> AppResult<()> {
        if let Some(user) = self.users.write().await.get_mut(user_id) {
            user.user_quizzes.retain(|id| id != quiz_id);
        }
        Ok(())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuizRepository {
    pub quizzes: Arc<RwLock<HashMap<ObjectId, Quiz>>>,
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn create(&self, mut quiz: Quiz) -> AppResult<Quiz> {
        let id = *quiz.id.get_or_insert_with(ObjectId::new);
        self.quizzes.write().await.insert(id, quiz.clone());
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(ids.iter().filter_map(|id| quizzes.get(id).cloned()).collect())
    }

    async fn update(&self, quiz: Quiz) -> AppResult<Quiz> {
        let id = quiz
            .id
            .ok_or_else(|| AppError::InternalError("missing id".to_string()))?;
        let mut quizzes = self.quizzes.write().await;
        if !quizzes.contains_key(&id) {
            return Err(AppError::NotFound(format!("Quiz with id '{}' not found", id)));
        }
        quizzes.insert(id, quiz.clone());
        Ok(quiz)
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        Ok(self.quizzes.write().await.remove(id).is_some())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Returns a canned completion.
pub struct StubGenerator {
    pub response: String,
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn complete(&self, _prompt: &str) -> AppResult<String> {
        Ok(self.response.clone())
    }
}

/// Records uploads and deletions instead of talking to an image host.
#[derive(Default)]
pub struct StubMediaStore {
    pub uploaded: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_deletes: bool,
    pub counter: AtomicUsize,
}

#[async_trait]
impl MediaStore for StubMediaStore {
    async fn upload_image(&self, image: ImageUpload) -> AppResult<StoredImage> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let public_id = format!("avatar_{}", n);
        self.uploaded.lock().unwrap().push(image.file_name);
        Ok(StoredImage {
            url: format!("https://images.test/{}.png", public_id),
            public_id,
        })
    }

    async fn delete_image(&self, public_id: &str) -> AppResult<()> {
        if self.fail_deletes {
            return Err(AppError::UpstreamError("delete failed".to_string()));
        }
        self.deleted.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

pub const BOOLEAN_QUIZ_JSON: &str = r#"```json
{
  "title": "Water",
  "questions": [
    {"questionText": "Water boils at 100C at sea level", "explanation": "It does.",
     "choices": [{"text": "True", "isCorrect": true}, {"text": "False", "isCorrect": false}]},
    {"questionText": "Ice sinks in water", "explanation": "It floats.",
     "choices": [{"text": "True", "isCorrect": false}, {"text": "False", "isCorrect": true}]}
  ]
}
```"#;

pub struct TestContext {
    pub state: Arc<AppState>,
    pub users: Arc<InMemoryUserRepository>,
    pub quizzes: Arc<InMemoryQuizRepository>,
    pub media: Arc<StubMediaStore>,
}

pub fn context_with(generator_response: &str, media: StubMediaStore) -> TestContext {
    let users = Arc::new(InMemoryUserRepository::default());
    let quizzes = Arc::new(InMemoryQuizRepository::default());
    let media = Arc::new(media);
    let generator = Arc::new(StubGenerator {
        response: generator_response.to_string(),
    });

    let state = AppState::from_parts(
        Config::test_config(),
        users.clone(),
        quizzes.clone(),
        generator,
        media.clone(),
        None,
    );

    TestContext {
        state: Arc::new(state),
        users,
        quizzes,
        media,
    }
}

pub fn context() -> TestContext {
    context_with(BOOLEAN_QUIZ_JSON, StubMediaStore::default())
}

pub const BOUNDARY: &str = "----quizziitestboundary";

/// Builds a multipart/form-data body with text fields and an optional avatar.
pub fn multipart_body(fields: &[(&str, &str)], avatar: Option<&[u8]>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = avatar {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Initialises the full route tree over a [`TestContext`].
#[macro_export]
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.state.clone()))
                .app_data(actix_web::web::Data::from($ctx.state.jwt_service.clone()))
                .wrap(quizzii_server::middleware::RequestIdMiddleware)
                .configure(quizzii_server::handlers::configure),
        )
        .await
    };
}
