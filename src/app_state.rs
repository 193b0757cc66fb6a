use std::sync::Arc;
use std::time::Duration;

use crate::{
    auth::JwtService,
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{MongoQuizRepository, MongoUserRepository, QuizRepository, UserRepository},
    services::{
        generation_service::{GenerationService, OpenAiCompatibleGenerator, TextGenerator},
        media_service::{CloudinaryMediaStore, MediaStore},
        quiz_service::QuizService,
        user_service::UserService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub quiz_service: Arc<QuizService>,
    pub generation_service: Arc<GenerationService>,
    pub jwt_service: Arc<JwtService>,
    pub config: Arc<Config>,
    /// Absent when running on in-memory repositories.
    pub db: Option<Database>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let user_repository = Arc::new(MongoUserRepository::new(db.users()));
        user_repository.ensure_indexes().await?;

        let quiz_repository = Arc::new(MongoQuizRepository::new(db.quizzes()));
        quiz_repository.ensure_indexes().await?;

        let generator = Arc::new(OpenAiCompatibleGenerator::new(&config));
        let media = Arc::new(CloudinaryMediaStore::new(&config)?);

        Ok(Self::from_parts(
            config,
            user_repository,
            quiz_repository,
            generator,
            media,
            Some(db),
        ))
    }

    pub fn from_parts(
        config: Config,
        users: Arc<dyn UserRepository>,
        quizzes: Arc<dyn QuizRepository>,
        generator: Arc<dyn TextGenerator>,
        media: Arc<dyn MediaStore>,
        db: Option<Database>,
    ) -> Self {
        let jwt_service = Arc::new(JwtService::new(
            &config.jwt_secret,
            config.jwt_expiration_hours,
            config.refresh_token_expiration_hours,
        ));

        let user_service = Arc::new(UserService::new(
            users.clone(),
            quizzes.clone(),
            media,
            jwt_service.clone(),
        ));
        let quiz_service = Arc::new(QuizService::new(quizzes, users));
        let generation_service = Arc::new(GenerationService::new(
            generator,
            Duration::from_secs(config.generation_timeout_secs),
        ));

        Self {
            user_service,
            quiz_service,
            generation_service,
            jwt_service,
            config: Arc::new(config),
            db,
        }
    }
}
