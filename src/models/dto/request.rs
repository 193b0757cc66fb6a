use std::borrow::Cow;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::errors::{AppError, AppResult};
use crate::models::domain::{Question, QuizType};

pub const MIN_QUESTIONS: i64 = 1;
pub const MAX_QUESTIONS: i64 = 20;
pub const DEFAULT_QUESTIONS: i64 = 5;
pub const DEFAULT_QUIZ_TITLE: &str = "Generated quiz";
const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 20;

static USERNAME_REGEX: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^[a-z0-9_]+$").expect("USERNAME_REGEX is a valid regex pattern")
});

fn validate_username_length(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    let message = if len < USERNAME_MIN_LEN {
        "Username must be at least 3 characters long"
    } else if len > USERNAME_MAX_LEN {
        "Username must be at most 20 characters long"
    } else {
        return Ok(());
    };
    Err(ValidationError::new("length").with_message(Cow::Borrowed(message)))
}

/// Text fields of the multipart registration form. The avatar file travels
/// separately.
#[derive(Debug, Clone, Validate)]
pub struct RegisterRequest {
    #[validate(
        custom(function = validate_username_length),
        regex(
            path = *USERNAME_REGEX,
            message = "Username may only contain letters, digits and underscores"
        )
    )]
    pub username: String,

    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl RegisterRequest {
    pub fn new(username: &str, email: &str, password: &str) -> AppResult<Self> {
        if [username, email, password].iter().any(|f| f.trim().is_empty()) {
            return Err(AppError::ValidationError("All fields are required".to_string()));
        }

        let request = Self {
            username: username.trim().to_lowercase(),
            email: email.trim().to_lowercase(),
            password: password.to_string(),
        };
        request.validate()?;
        Ok(request)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

impl LoginRequest {
    pub fn identity(&self) -> AppResult<(Option<String>, Option<String>)> {
        let normalise = |v: &Option<String>| {
            v.as_deref()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
        };
        let username = normalise(&self.username);
        let email = normalise(&self.email);

        if username.is_none() && email.is_none() {
            return Err(AppError::ValidationError(
                "username or email is required".to_string(),
            ));
        }
        Ok((username, email))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDetailsRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: Option<String>,

    #[validate(
        custom(function = validate_username_length),
        regex(
            path = *USERNAME_REGEX,
            message = "Username may only contain letters, digits and underscores"
        )
    )]
    pub username: Option<String>,
}

impl ChangeDetailsRequest {
    /// Lowercases and drops blank fields, then validates what is left.
    pub fn normalised(self) -> AppResult<Self> {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
        };
        let request = Self {
            email: clean(self.email),
            username: clean(self.username),
        };

        if request.email.is_none() && request.username.is_none() {
            return Err(AppError::ValidationError(
                "at least one field (email or username) is required".to_string(),
            ));
        }
        request.validate()?;
        Ok(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub quiz_type: Option<String>,
    #[serde(default)]
    pub num_questions: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// A generation request with defaults applied and every field checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub text: String,
    pub quiz_type: QuizType,
    pub num_questions: u8,
    pub difficulty: Difficulty,
    pub title: String,
}

impl GenerateQuizRequest {
    pub fn resolve(self) -> AppResult<GenerationOptions> {
        if self.text.trim().is_empty() {
            return Err(AppError::ValidationError(
                "text content is required to generate a quiz".to_string(),
            ));
        }

        let num_questions = self.num_questions.unwrap_or(DEFAULT_QUESTIONS);
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&num_questions) {
            return Err(AppError::ValidationError(format!(
                "number of questions must be between {} and {}",
                MIN_QUESTIONS, MAX_QUESTIONS
            )));
        }

        let quiz_type = match non_blank(self.quiz_type) {
            None => QuizType::default(),
            Some(raw) => QuizType::parse(&raw).ok_or_else(|| {
                let valid: Vec<&str> = QuizType::ALL.iter().map(|t| t.as_str()).collect();
                AppError::ValidationError(format!(
                    "Invalid quiz type. Must be one of: {}",
                    valid.join(", ")
                ))
            })?,
        };

        let difficulty = match non_blank(self.difficulty) {
            None => Difficulty::Medium,
            Some(raw) => Difficulty::parse(&raw)
                .ok_or_else(|| AppError::ValidationError("invalid difficulty".to_string()))?,
        };

        Ok(GenerationOptions {
            text: self.text,
            quiz_type,
            num_questions: num_questions as u8,
            difficulty,
            title: non_blank(self.title).unwrap_or_else(|| DEFAULT_QUIZ_TITLE.to_string()),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveQuizRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub quiz_type: QuizType,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub last_attempted: Option<DateTime<Utc>>,
}

impl SaveQuizRequest {
    pub fn check(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::ValidationError("Quiz title is required".to_string()));
        }
        if self.questions.is_empty() {
            return Err(AppError::ValidationError(
                "Questions array is required and cannot be empty".to_string(),
            ));
        }
        if let Some(score) = self.score {
            check_score(score)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizRequest {
    pub user_answers: Vec<Option<String>>,
    #[serde(default)]
    pub score: Option<i64>,
}

impl UpdateQuizRequest {
    pub fn check(&self) -> AppResult<i64> {
        let score = self
            .score
            .ok_or_else(|| AppError::ValidationError("Score is required".to_string()))?;
        check_score(score)?;
        Ok(score)
    }
}

fn check_score(score: i64) -> AppResult<()> {
    if !(0..=100).contains(&score) {
        return Err(AppError::ValidationError(
            "Score must be a percentage between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
