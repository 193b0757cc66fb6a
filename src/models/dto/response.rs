use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::User;
use crate::models::dto::QuizDto;

/// Success envelope shared by every REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(status_code: u16, data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            status_code,
            data,
            message: message.into(),
            success: status_code < 400,
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(200, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(201, data, message)
    }
}

/// Public view of a user; never carries the password or refresh token hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    #[serde(default, rename = "userQuizes")]
    pub user_quizzes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id_hex().unwrap_or_default(),
            username: user.username,
            email: user.email,
            avatar: user.avatar,
            user_quizzes: user.user_quizzes.iter().map(|oid| oid.to_hex()).collect(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserDto,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuizzesDto {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userQuizes")]
    pub user_quizzes: Vec<QuizDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizEnvelope {
    pub quiz: QuizDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedQuizDto {
    pub quiz: QuizDto,
    pub user: UserDto,
}
