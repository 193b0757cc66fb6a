use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::client::errors::{ClientError, ClientResult};
use crate::models::dto::{
    request::{
        ChangeDetailsRequest, ChangePasswordRequest, GenerateQuizRequest, LoginRequest,
        SaveQuizRequest, UpdateQuizRequest,
    },
    response::{LoginResponse, QuizEnvelope, SavedQuizDto, UserQuizzesDto},
    ApiResponse, QuizDto, UserDto,
};
use crate::services::media_service::ImageUpload;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: ImageUpload,
}

/// Typed surface of the backend REST API.
#[async_trait]
pub trait QuizApi: Send + Sync {
    fn set_access_token(&self, token: Option<String>);

    async fn register(&self, form: RegisterForm) -> ClientResult<UserDto>;
    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse>;
    async fn logout(&self) -> ClientResult<()>;
    async fn current_user(&self) -> ClientResult<UserDto>;
    async fn all_quizzes(&self) -> ClientResult<UserQuizzesDto>;
    async fn change_password(&self, request: &ChangePasswordRequest) -> ClientResult<()>;
    async fn change_details(&self, request: &ChangeDetailsRequest) -> ClientResult<UserDto>;
    async fn update_avatar(&self, avatar: ImageUpload) -> ClientResult<UserDto>;

    async fn generate_quiz(&self, request: &GenerateQuizRequest) -> ClientResult<QuizDto>;
    async fn save_quiz(&self, request: &SaveQuizRequest) -> ClientResult<SavedQuizDto>;
    async fn update_quiz(&self, quiz_id: &str, request: &UpdateQuizRequest) -> ClientResult<QuizDto>;
    async fn delete_quiz(&self, quiz_id: &str) -> ClientResult<()>;
    async fn get_quiz(&self, quiz_id: &str) -> ClientResult<QuizDto>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    message: String,
}

pub struct HttpQuizApi {
    client: reqwest::Client,
    base_url: String,
    access_token: RwLock<Option<String>>,
    timeout: Duration,
    generation_timeout: Duration,
}

impl HttpQuizApi {
    /// `base_url` is the API root, e.g. `http://localhost:8080/api/v1`.
    pub fn new(base_url: &str) -> Self {
        Self::with_timeouts(base_url, DEFAULT_TIMEOUT, GENERATION_TIMEOUT)
    }

    pub fn with_timeouts(base_url: &str, timeout: Duration, generation_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: RwLock::new(None),
            timeout,
            generation_timeout,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(self.timeout);

        let token = self.access_token.read().ok().and_then(|t| t.clone());
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        decode(response).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.request(method, path).json(body)).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_slice::<ApiResponse<T>>(&bytes)
        .map(|envelope| envelope.data)
        .map_err(|e| ClientError::Decode(e.to_string()))
}

fn image_part(image: ImageUpload) -> ClientResult<multipart::Part> {
    let part = multipart::Part::bytes(image.bytes).file_name(image.file_name);
    match image.content_type {
        Some(content_type) => part
            .mime_str(&content_type)
            .map_err(|e| ClientError::InvalidInput(e.to_string())),
        None => Ok(part),
    }
}

#[async_trait]
impl QuizApi for HttpQuizApi {
    fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.access_token.write() {
            *slot = token;
        }
    }

    async fn register(&self, form: RegisterForm) -> ClientResult<UserDto> {
        let body = multipart::Form::new()
            .text("username", form.username)
            .text("email", form.email)
            .text("password", form.password)
            .part("avatar", image_part(form.avatar)?);

        self.send(self.request(Method::POST, "/users/register").multipart(body))
            .await
    }

    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse> {
        self.send_json(Method::POST, "/users/login", request).await
    }

    async fn logout(&self) -> ClientResult<()> {
        let _: serde_json::Value = self
            .send(self.request(Method::POST, "/users/logout"))
            .await?;
        Ok(())
    }

    async fn current_user(&self) -> ClientResult<UserDto> {
        self.send(self.request(Method::GET, "/users/current-user")).await
    }

    async fn all_quizzes(&self) -> ClientResult<UserQuizzesDto> {
        self.send(self.request(Method::GET, "/users/allQuizes")).await
    }

    async fn change_password(&self, request: &ChangePasswordRequest) -> ClientResult<()> {
        let _: serde_json::Value = self
            .send_json(Method::PUT, "/users/change-password", request)
            .await?;
        Ok(())
    }

    async fn change_details(&self, request: &ChangeDetailsRequest) -> ClientResult<UserDto> {
        self.send_json(Method::POST, "/users/change-details", request).await
    }

    async fn update_avatar(&self, avatar: ImageUpload) -> ClientResult<UserDto> {
        let body = multipart::Form::new().part("avatar", image_part(avatar)?);
        self.send(self.request(Method::PATCH, "/users/update-avatar").multipart(body))
            .await
    }

    async fn generate_quiz(&self, request: &GenerateQuizRequest) -> ClientResult<QuizDto> {
        let builder = self
            .request(Method::POST, "/quiz/generate-quiz")
            .timeout(self.generation_timeout)
            .json(request);
        let envelope: QuizEnvelope = self.send(builder).await?;
        Ok(envelope.quiz)
    }

    async fn save_quiz(&self, request: &SaveQuizRequest) -> ClientResult<SavedQuizDto> {
        self.send_json(Method::POST, "/quiz/save", request).await
    }

    async fn update_quiz(&self, quiz_id: &str, request: &UpdateQuizRequest) -> ClientResult<QuizDto> {
        let envelope: QuizEnvelope = self
            .send_json(Method::PUT, &format!("/quiz/update-quiz/{}", quiz_id), request)
            .await?;
        Ok(envelope.quiz)
    }

    async fn delete_quiz(&self, quiz_id: &str) -> ClientResult<()> {
        let _: serde_json::Value = self
            .send(self.request(Method::DELETE, &format!("/quiz/delete/{}", quiz_id)))
            .await?;
        Ok(())
    }

    async fn get_quiz(&self, quiz_id: &str) -> ClientResult<QuizDto> {
        let envelope: QuizEnvelope = self
            .send(self.request(Method::GET, &format!("/quiz/getQuiz/{}", quiz_id)))
            .await?;
        Ok(envelope.quiz)
    }
}
