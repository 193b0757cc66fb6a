use crate::client::errors::{ClientError, ClientResult};
use crate::models::domain::QuizType;
use crate::models::dto::request::{Difficulty, GenerateQuizRequest};
use crate::services::generation_service::MAX_SOURCE_CHARS;

/// Source material a quiz is generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationInput {
    Text(String),
    /// Sent as-is; the server does not fetch the page.
    Url(String),
    Pdf(Vec<u8>),
}

impl GenerationInput {
    pub fn into_content(self) -> ClientResult<String> {
        let content = match self {
            GenerationInput::Text(text) => text,
            GenerationInput::Url(raw) => {
                let parsed = url::Url::parse(raw.trim())
                    .map_err(|e| ClientError::InvalidInput(format!("invalid URL: {}", e)))?;
                if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                    return Err(ClientError::InvalidInput(
                        "URL must be an http(s) address".to_string(),
                    ));
                }
                parsed.to_string()
            }
            GenerationInput::Pdf(bytes) => pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| ClientError::InvalidInput(format!("could not read PDF: {}", e)))?,
        };

        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::InvalidInput(
                "please provide some content to generate a quiz".to_string(),
            ));
        }
        Ok(content.chars().take(MAX_SOURCE_CHARS).collect())
    }
}

/// Options chosen alongside the source material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOptions {
    pub quiz_type: QuizType,
    pub num_questions: u8,
    pub difficulty: Difficulty,
    pub title: Option<String>,
}

impl Default for QuizOptions {
    fn default() -> Self {
        Self {
            quiz_type: QuizType::MultipleChoice,
            num_questions: 5,
            difficulty: Difficulty::Medium,
            title: None,
        }
    }
}

pub fn generation_request(
    input: GenerationInput,
    options: &QuizOptions,
) -> ClientResult<GenerateQuizRequest> {
    Ok(GenerateQuizRequest {
        text: input.into_content()?,
        quiz_type: Some(options.quiz_type.as_str().to_string()),
        num_questions: Some(i64::from(options.num_questions)),
        difficulty: Some(options.difficulty.as_str().to_string()),
        title: options.title.clone(),
    })
}
