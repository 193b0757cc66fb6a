use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::{
    auth::{hash_password, hash_token, verify_password, JwtService},
    errors::{AppError, AppResult},
    models::domain::{Quiz, User},
    models::dto::{
        request::{ChangeDetailsRequest, ChangePasswordRequest, LoginRequest, RegisterRequest},
        response::{LoginResponse, TokenPair, UserQuizzesDto},
        QuizDto, UserDto,
    },
    repositories::{QuizRepository, UserRepository},
    services::media_service::{ImageUpload, MediaStore},
};

pub struct UserService {
    users: Arc<dyn UserRepository>,
    quizzes: Arc<dyn QuizRepository>,
    media: Arc<dyn MediaStore>,
    jwt: Arc<JwtService>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        quizzes: Arc<dyn QuizRepository>,
        media: Arc<dyn MediaStore>,
        jwt: Arc<JwtService>,
    ) -> Self {
        Self {
            users,
            quizzes,
            media,
            jwt,
        }
    }

    async fn get_user(&self, user_id: &ObjectId) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn register(
        &self,
        request: RegisterRequest,
        avatar: Option<ImageUpload>,
    ) -> AppResult<UserDto> {
        let avatar =
            avatar.ok_or_else(|| AppError::ValidationError("Avatar file is required".to_string()))?;

        if self
            .users
            .find_conflict(Some(&request.username), Some(&request.email), None)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyExists(
                "User with email or username already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password)?;
        let stored = self.media.upload_image(avatar).await?;

        let user = User::new(
            &request.username,
            &request.email,
            &password_hash,
            &stored.url,
            Some(stored.public_id.clone()),
        );

        let user = match self.users.create(user).await {
            Ok(user) => user,
            Err(err) => {
                if let Err(cleanup) = self.media.delete_image(&stored.public_id).await {
                    log::warn!("Orphaned avatar {}: {}", stored.public_id, cleanup);
                }
                return Err(err);
            }
        };

        log::info!("Registered user {}", user.username);
        Ok(user.into())
    }

    async fn issue_tokens(&self, mut user: User) -> AppResult<(User, TokenPair)> {
        let user_id = user
            .id_hex()
            .ok_or_else(|| AppError::InternalError("User has no id".to_string()))?;

        let access_token = self.jwt.create_token(&user)?;
        let refresh_token = self.jwt.create_refresh_token(&user_id)?;

        user.refresh_token = Some(hash_token(&refresh_token));
        user.updated_at = Some(chrono::Utc::now());
        let user = self.users.update(user).await?;

        Ok((
            user,
            TokenPair {
                access_token,
                refresh_token,
            },
        ))
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        let (username, email) = request.identity()?;

        let user = self
            .users
            .find_by_login(username.as_deref(), email.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !verify_password(&request.password, &user.password_hash)? {
            log::warn!("Failed login for {}", user.username);
            return Err(AppError::Unauthorized("Invalid user credentials".to_string()));
        }

        let (user, tokens) = self.issue_tokens(user).await?;
        log::info!("User {} logged in", user.username);

        Ok(LoginResponse {
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// Rotates the token pair. The presented refresh token must match the one
    /// currently stored; a reused or superseded token is rejected.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.jwt.validate_refresh_token(refresh_token)?;
        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))?;

        let user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

        if user.refresh_token.as_deref() != Some(hash_token(refresh_token).as_str()) {
            return Err(AppError::Unauthorized(
                "Refresh token is expired or used".to_string(),
            ));
        }

        let (_, tokens) = self.issue_tokens(user).await?;
        Ok(tokens)
    }

    pub async fn logout(&self, user_id: &ObjectId) -> AppResult<()> {
        let mut user = self.get_user(user_id).await?;
        user.refresh_token = None;
        user.updated_at = Some(chrono::Utc::now());
        self.users.update(user).await?;
        Ok(())
    }

    pub async fn current_user(&self, user_id: &ObjectId) -> AppResult<UserDto> {
        Ok(self.get_user(user_id).await?.into())
    }

    /// The user's quizzes, most recently attempted first.
    pub async fn all_quizzes(&self, user_id: &ObjectId) -> AppResult<UserQuizzesDto> {
        let user = self.get_user(user_id).await?;
        let mut quizzes = self.quizzes.find_by_ids(&user.user_quizzes).await?;
        sort_by_last_attempted(&mut quizzes);

        Ok(UserQuizzesDto {
            id: user.id_hex().unwrap_or_default(),
            user_quizzes: quizzes.into_iter().map(QuizDto::from).collect(),
        })
    }

    pub async fn change_password(
        &self,
        user_id: &ObjectId,
        request: ChangePasswordRequest,
    ) -> AppResult<()> {
        let mut user = self.get_user(user_id).await?;

        if !verify_password(&request.old_password, &user.password_hash)? {
            return Err(AppError::Unauthorized("Invalid old password".to_string()));
        }

        user.password_hash = hash_password(&request.new_password)?;
        user.updated_at = Some(chrono::Utc::now());
        self.users.update(user).await?;
        Ok(())
    }

    pub async fn change_details(
        &self,
        user_id: &ObjectId,
        request: ChangeDetailsRequest,
    ) -> AppResult<UserDto> {
        let request = request.normalised()?;

        if let Some(existing) = self
            .users
            .find_conflict(
                request.username.as_deref(),
                request.email.as_deref(),
                Some(user_id),
            )
            .await?
        {
            let field = if request.username.as_deref() == Some(existing.username.as_str()) {
                "Username"
            } else {
                "Email"
            };
            return Err(AppError::AlreadyExists(format!("{} is already taken", field)));
        }

        let mut user = self.get_user(user_id).await?;
        if let Some(email) = request.email {
            user.email = email;
        }
        if let Some(username) = request.username {
            user.username = username;
        }
        user.updated_at = Some(chrono::Utc::now());

        Ok(self.users.update(user).await?.into())
    }

    /// Uploads the new avatar, then deletes the previous image before pointing
    /// the user at the new one.
    pub async fn update_avatar(
        &self,
        user_id: &ObjectId,
        avatar: Option<ImageUpload>,
    ) -> AppResult<UserDto> {
        let avatar =
            avatar.ok_or_else(|| AppError::ValidationError("Avatar file is missing".to_string()))?;
        let mut user = self.get_user(user_id).await?;

        let stored = self.media.upload_image(avatar).await?;

        if let Some(old_public_id) = user.avatar_public_id() {
            if let Err(err) = self.media.delete_image(&old_public_id).await {
                log::error!("Failed to delete old avatar {}: {}", old_public_id, err);
                if let Err(cleanup) = self.media.delete_image(&stored.public_id).await {
                    log::warn!("Orphaned avatar {}: {}", stored.public_id, cleanup);
                }
                return Err(AppError::UpstreamError(
                    "Error while deleting the old avatar".to_string(),
                ));
            }
        }

        let new_public_id = stored.public_id.clone();
        user.avatar = stored.url;
        user.avatar_public_id = Some(stored.public_id);
        user.updated_at = Some(chrono::Utc::now());

        match self.users.update(user).await {
            Ok(user) => Ok(user.into()),
            Err(err) => {
                if let Err(cleanup) = self.media.delete_image(&new_public_id).await {
                    log::warn!("Orphaned avatar {}: {}", new_public_id, cleanup);
                }
                Err(err)
            }
        }
    }
}

pub fn sort_by_last_attempted(quizzes: &mut [Quiz]) {
    // None sorts last
    quizzes.sort_by(|a, b| b.last_attempted.cmp(&a.last_attempted));
}
