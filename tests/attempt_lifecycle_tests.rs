mod common;

use std::sync::{Arc, RwLock};

use actix_web::ResponseError;
use async_trait::async_trait;
use chrono::{Duration, Utc};

use quizzii_server::{
    app_state::AppState,
    auth::Claims,
    client::{
        api::RegisterForm,
        attempt_cache::cache_key,
        errors::{ClientError, ClientResult},
        input::{GenerationInput, QuizOptions},
        AttemptError, AttemptState, ClientShell, KeyValueStore, MemoryStore, PersistOutcome, QuizApi,
    },
    errors::AppError,
    models::domain::QuizType,
    models::dto::{
        request::{
            ChangeDetailsRequest, ChangePasswordRequest, GenerateQuizRequest, LoginRequest,
            RegisterRequest, SaveQuizRequest, UpdateQuizRequest,
        },
        response::{LoginResponse, SavedQuizDto, UserQuizzesDto},
        QuizDto, UserDto,
    },
    services::media_service::ImageUpload,
};

use common::context;

/// Drives the services directly, standing in for the HTTP transport.
struct InProcessApi {
    state: Arc<AppState>,
    token: RwLock<Option<String>>,
}

fn api_error(err: AppError) -> ClientError {
    ClientError::Api {
        status: err.status_code().as_u16(),
        message: err.to_string(),
    }
}

impl InProcessApi {
    fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            token: RwLock::new(None),
        }
    }

    fn claims(&self) -> ClientResult<Claims> {
        let token = self.token.read().unwrap().clone().ok_or(ClientError::Api {
            status: 401,
            message: "Unauthorized request".to_string(),
        })?;
        self.state.jwt_service.validate_token(&token).map_err(api_error)
    }
}

#[async_trait]
impl QuizApi for InProcessApi {
    fn set_access_token(&self, token: Option<String>) {
        *self.token.write().unwrap() = token;
    }

    async fn register(&self, form: RegisterForm) -> ClientResult<UserDto> {
        let request =
            RegisterRequest::new(&form.username, &form.email, &form.password).map_err(api_error)?;
        self.state
            .user_service
            .register(request, Some(form.avatar))
            .await
            .map_err(api_error)
    }

    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse> {
        self.state.user_service.login(request.clone()).await.map_err(api_error)
    }

    async fn logout(&self) -> ClientResult<()> {
        let user_id = self.claims()?.user_id().map_err(api_error)?;
        self.state.user_service.logout(&user_id).await.map_err(api_error)
    }

    async fn current_user(&self) -> ClientResult<UserDto> {
        let user_id = self.claims()?.user_id().map_err(api_error)?;
        self.state.user_service.current_user(&user_id).await.map_err(api_error)
    }

    async fn all_quizzes(&self) -> ClientResult<UserQuizzesDto> {
        let user_id = self.claims()?.user_id().map_err(api_error)?;
        self.state.user_service.all_quizzes(&user_id).await.map_err(api_error)
    }

    async fn change_password(&self, request: &ChangePasswordRequest) -> ClientResult<()> {
        let user_id = self.claims()?.user_id().map_err(api_error)?;
        self.state
            .user_service
            .change_password(&user_id, request.clone())
            .await
            .map_err(api_error)
    }

    async fn change_details(&self, request: &ChangeDetailsRequest) -> ClientResult<UserDto> {
        let user_id = self.claims()?.user_id().map_err(api_error)?;
        self.state
            .user_service
            .change_details(&user_id, request.clone())
            .await
            .map_err(api_error)
    }

    async fn update_avatar(&self, avatar: ImageUpload) -> ClientResult<UserDto> {
        let user_id = self.claims()?.user_id().map_err(api_error)?;
        self.state
            .user_service
            .update_avatar(&user_id, Some(avatar))
            .await
            .map_err(api_error)
    }

    async fn generate_quiz(&self, request: &GenerateQuizRequest) -> ClientResult<QuizDto> {
        let options = request.clone().resolve().map_err(api_error)?;
        self.state.generation_service.generate(options).await.map_err(api_error)
    }

    async fn save_quiz(&self, request: &SaveQuizRequest) -> ClientResult<SavedQuizDto> {
        let claims = self.claims()?;
        self.state.quiz_service.save(&claims, request.clone()).await.map_err(api_error)
    }

    async fn update_quiz(&self, quiz_id: &str, request: &UpdateQuizRequest) -> ClientResult<QuizDto> {
        let claims = self.claims()?;
        self.state
            .quiz_service
            .update_attempt(&claims, quiz_id, request.clone())
            .await
            .map_err(api_error)
    }

    async fn delete_quiz(&self, quiz_id: &str) -> ClientResult<()> {
        let claims = self.claims()?;
        self.state.quiz_service.delete(&claims, quiz_id).await.map_err(api_error)
    }

    async fn get_quiz(&self, quiz_id: &str) -> ClientResult<QuizDto> {
        let claims = self.claims()?;
        self.state.quiz_service.get(&claims, quiz_id).await.map_err(api_error)
    }
}

fn boolean_options() -> QuizOptions {
    QuizOptions {
        quiz_type: QuizType::Boolean,
        num_questions: 2,
        ..Default::default()
    }
}

async fn logged_in_shell(api: &InProcessApi, store: Arc<dyn KeyValueStore>) -> ClientShell {
    api.register(RegisterForm {
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "secret123".to_string(),
        avatar: ImageUpload {
            bytes: vec![1, 2, 3],
            file_name: "me.png".to_string(),
            content_type: Some("image/png".to_string()),
        },
    })
    .await
    .unwrap();

    let mut shell = ClientShell::open(store);
    shell
        .login(
            api,
            &LoginRequest {
                username: Some("alice".to_string()),
                email: None,
                password: "secret123".to_string(),
            },
        )
        .await
        .unwrap();
    shell
}

#[tokio::test]
async fn test_generated_quiz_submit_restore_and_save_twice() {
    let ctx = context();
    let api = InProcessApi::new(ctx.state.clone());
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut shell = logged_in_shell(&api, store.clone()).await;

    let text = GenerationInput::Text("Water boils at 100C. Ice floats.".to_string());
    let quiz = shell.generate(&api, text, &boolean_options()).await.unwrap();
    assert!(quiz.id.is_none());

    let now = Utc::now();
    let mut session = shell.start_attempt(now).unwrap();
    assert_eq!(session.state(), AttemptState::FreshUnanswered);
    let attempt_id = session.attempt_id().unwrap().to_string();

    session.select_answer(0, "True").unwrap();
    assert_eq!(session.state(), AttemptState::InProgress);
    session.select_answer(1, "True").unwrap();
    let score = session.submit(&shell.cache, now).unwrap().score;
    assert_eq!(score, 50);

    // Re-opening the same attempt shows the cached submission.
    let mut restored = shell.start_attempt(now + Duration::minutes(1)).unwrap();
    assert_eq!(restored.state(), AttemptState::Restored);
    assert_eq!(restored.attempt_id(), Some(attempt_id.as_str()));
    assert_eq!(restored.result().unwrap().score, 50);

    let first = shell.persist(&api, &mut restored).await.unwrap();
    assert_eq!(restored.state(), AttemptState::Persisted);
    assert!(shell.users.attempt_id().is_none());
    assert!(store.get(&cache_key(&attempt_id)).is_some());

    let second = shell.persist(&api, &mut restored).await.unwrap();

    let (PersistOutcome::Created(a), PersistOutcome::Created(b)) = (first, second) else {
        panic!("expected two creations");
    };
    assert_ne!(a.title, b.title);
    assert!(a.title.starts_with("Water_"));
    assert_eq!(a.score, 50);
    assert_eq!(ctx.quizzes.quizzes.read().await.len(), 2);

    let listed = api.all_quizzes().await.unwrap();
    assert_eq!(listed.user_quizzes.len(), 2);
}

#[tokio::test]
async fn test_new_generation_never_reuses_previous_attempt() {
    let ctx = context();
    let api = InProcessApi::new(ctx.state.clone());
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut shell = logged_in_shell(&api, store).await;
    let now = Utc::now();

    shell
        .generate(&api, GenerationInput::Text("First text".into()), &boolean_options())
        .await
        .unwrap();
    let mut session = shell.start_attempt(now).unwrap();
    let first_id = session.attempt_id().unwrap().to_string();
    session.select_answer(0, "True").unwrap();
    session.select_answer(1, "False").unwrap();
    session.submit(&shell.cache, now).unwrap();

    shell
        .generate(&api, GenerationInput::Text("Second text".into()), &boolean_options())
        .await
        .unwrap();
    let fresh = shell.start_attempt(now).unwrap();

    assert_eq!(fresh.state(), AttemptState::FreshUnanswered);
    assert_ne!(fresh.attempt_id().unwrap(), first_id);
    assert!(fresh.answers().iter().all(Option::is_none));
}

#[tokio::test]
async fn test_unsaved_submission_expires_after_five_minutes() {
    let ctx = context();
    let api = InProcessApi::new(ctx.state.clone());
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut shell = logged_in_shell(&api, store.clone()).await;
    let now = Utc::now();

    shell
        .generate(&api, GenerationInput::Text("Some text".into()), &boolean_options())
        .await
        .unwrap();
    let mut session = shell.start_attempt(now).unwrap();
    let attempt_id = session.attempt_id().unwrap().to_string();
    session.select_answer(0, "True").unwrap();
    session.select_answer(1, "False").unwrap();
    session.submit(&shell.cache, now).unwrap();

    let later = shell.start_attempt(now + Duration::minutes(6)).unwrap();
    assert_eq!(later.state(), AttemptState::FreshUnanswered);
    assert_eq!(later.attempt_id(), Some(attempt_id.as_str()));
    assert!(store.get(&cache_key(&attempt_id)).is_none());
}

#[tokio::test]
async fn test_reattempt_of_saved_quiz_updates_in_place() {
    let ctx = context();
    let api = InProcessApi::new(ctx.state.clone());
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut shell = logged_in_shell(&api, store).await;
    let now = Utc::now();

    shell
        .generate(&api, GenerationInput::Text("Some text".into()), &boolean_options())
        .await
        .unwrap();
    let mut session = shell.start_attempt(now).unwrap();
    session.select_answer(0, "False").unwrap();
    session.select_answer(1, "True").unwrap();
    session.submit(&shell.cache, now).unwrap();
    let PersistOutcome::Created(saved) = shell.persist(&api, &mut session).await.unwrap() else {
        panic!("expected a creation");
    };
    assert_eq!(saved.score, 0);
    let saved_id = saved.id.clone().unwrap();

    shell.reattempt(saved).unwrap();
    let mut again = shell.start_attempt(now).unwrap();
    assert_eq!(again.attempt_id(), Some(format!("saved-{}", saved_id).as_str()));
    again.select_answer(0, "True").unwrap();
    again.select_answer(1, "False").unwrap();
    again.submit(&shell.cache, now).unwrap();

    let PersistOutcome::Updated(updated) = shell.persist(&api, &mut again).await.unwrap() else {
        panic!("expected an update");
    };
    assert_eq!(updated.id.as_deref(), Some(saved_id.as_str()));
    assert_eq!(updated.score, 100);
    assert!(shell.quizzes.updated_quiz().is_none());
    assert_eq!(ctx.quizzes.quizzes.read().await.len(), 1);

    // a second go within the day starts clean rather than showing the last result
    shell.reattempt(updated).unwrap();
    let mut third = shell.start_attempt(now).unwrap();
    assert_eq!(third.state(), AttemptState::FreshUnanswered);
    assert!(third.result().is_none());
    third.select_answer(0, "True").unwrap();
    third.select_answer(1, "True").unwrap();
    assert_eq!(third.submit(&shell.cache, now).unwrap().score, 50);

    let PersistOutcome::Updated(last) = shell.persist(&api, &mut third).await.unwrap() else {
        panic!("expected an update");
    };
    assert_eq!(last.id.as_deref(), Some(saved_id.as_str()));
    assert_eq!(last.score, 50);
    assert_eq!(ctx.quizzes.quizzes.read().await.len(), 1);
}

#[tokio::test]
async fn test_failed_save_keeps_submission_for_retry() {
    let ctx = context();
    let api = InProcessApi::new(ctx.state.clone());
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut shell = logged_in_shell(&api, store).await;
    let now = Utc::now();

    shell
        .generate(&api, GenerationInput::Text("Some text".into()), &boolean_options())
        .await
        .unwrap();
    let mut session = shell.start_attempt(now).unwrap();
    session.select_answer(0, "True").unwrap();
    session.select_answer(1, "False").unwrap();
    session.submit(&shell.cache, now).unwrap();

    api.set_access_token(None);
    let err = shell.persist(&api, &mut session).await.unwrap_err();
    assert!(matches!(
        err,
        AttemptError::Client(ClientError::Api { status: 401, .. })
    ));
    assert_eq!(session.state(), AttemptState::Submitted);
    assert!(shell.users.attempt_id().is_some());

    shell.restore_session(&api);
    shell.persist(&api, &mut session).await.unwrap();
    assert_eq!(session.state(), AttemptState::Persisted);
}
