use std::sync::Arc;
use std::time::Duration;

use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::domain::{Question, QuizType},
    models::dto::{request::GenerationOptions, QuizDto},
};

pub const MAX_SOURCE_CHARS: usize = 10_000;
const MULTIPLE_CHOICE_OPTIONS: usize = 4;

/// Opaque text-in/text-out completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}

/// Gemini through its OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatibleGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompatibleGenerator {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.gemini_api_key.expose_secret())
            .with_api_base(&config.gemini_base_url);

        Self {
            client: Client::with_config(openai_config),
            model: config.gemini_model.clone(),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleGenerator {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let response: serde_json::Value = self
            .client
            .chat()
            .create_byot(json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .await
            .map_err(|e| {
                log::error!("Quiz generation request failed: {}", e);
                AppError::UpstreamError(format!("failed to generate quiz {}", e))
            })?;

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::UpstreamError("generation service returned no content".to_string())
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("response is not valid quiz JSON: {0}")]
    NotJson(String),

    #[error("response contains no questions")]
    NoQuestions,

    #[error("question {0} has no text")]
    EmptyQuestion(usize),

    #[error("question {index} has {found} correct choices, expected exactly one")]
    CorrectChoiceCount { index: usize, found: usize },

    #[error("question {0} must offer exactly the choices True and False")]
    NotTrueFalse(usize),

    #[error("question {0} has fewer than two choices")]
    TooFewChoices(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuiz {
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct RawQuiz {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    questions: Vec<Question>,
}

pub fn build_prompt(options: &GenerationOptions) -> String {
    let source: String = options.text.chars().take(MAX_SOURCE_CHARS).collect();
    let type_rule = match options.quiz_type {
        QuizType::MultipleChoice => format!(
            "- Include exactly 1 correct answer per question and exactly {} options",
            MULTIPLE_CHOICE_OPTIONS
        ),
        QuizType::Boolean => "- Choices must be \"True\" and \"False\" only".to_string(),
    };

    format!(
        r#"Generate a {quiz_type} quiz based on the following text.

TEXT:
{source}

REQUIREMENTS:
- Number of questions: {count}
- Type: {quiz_type}
- Difficulty: {difficulty}
- Format: JSON

OUTPUT FORMAT:
{{
  "title": "{title}",
  "questions": [
    {{
      "questionText": "Question here",
      "choices": [
        {{"text": "Option A", "isCorrect": true}},
        {{"text": "Option B", "isCorrect": false}}
      ],
      "explanation": "Brief explanation"
    }}
  ]
}}

Important rules:
{type_rule}
- Ensure questions are directly based on the provided text
- Make explanations educational and accurate
- Return ONLY valid JSON, no additional text"#,
        quiz_type = options.quiz_type,
        source = source,
        count = options.num_questions,
        difficulty = options.difficulty.as_str(),
        title = options.title.replace('"', "'"),
        type_rule = type_rule,
    )
}

/// Removes markdown code fences the model tends to wrap JSON in.
pub fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Either a fully valid quiz or a reason; never a partially usable result.
pub fn parse_quiz(
    raw: &str,
    quiz_type: QuizType,
    fallback_title: &str,
) -> Result<ParsedQuiz, ParseFailure> {
    let cleaned = strip_fences(raw);
    let parsed: RawQuiz =
        serde_json::from_str(&cleaned).map_err(|e| ParseFailure::NotJson(e.to_string()))?;

    if parsed.questions.is_empty() {
        return Err(ParseFailure::NoQuestions);
    }

    let mut questions = parsed.questions;
    for (index, question) in questions.iter_mut().enumerate() {
        if question.question_text.trim().is_empty() {
            return Err(ParseFailure::EmptyQuestion(index));
        }
        if question.choices.len() < 2 {
            return Err(ParseFailure::TooFewChoices(index));
        }

        let found = question.choices.iter().filter(|c| c.is_correct).count();
        if found != 1 {
            return Err(ParseFailure::CorrectChoiceCount { index, found });
        }

        if quiz_type == QuizType::Boolean {
            normalise_true_false(index, question)?;
        }

        for choice in &mut question.choices {
            choice.user_answer = false;
        }
    }

    let title = parsed
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| fallback_title.to_string());

    Ok(ParsedQuiz { title, questions })
}

fn normalise_true_false(index: usize, question: &mut Question) -> Result<(), ParseFailure> {
    if question.choices.len() != 2 {
        return Err(ParseFailure::NotTrueFalse(index));
    }

    let mut seen = [false, false];
    for choice in &mut question.choices {
        match choice.text.trim().to_lowercase().as_str() {
            "true" => {
                choice.text = "True".to_string();
                seen[0] = true;
            }
            "false" => {
                choice.text = "False".to_string();
                seen[1] = true;
            }
            _ => return Err(ParseFailure::NotTrueFalse(index)),
        }
    }

    if seen == [true, true] {
        Ok(())
    } else {
        Err(ParseFailure::NotTrueFalse(index))
    }
}

pub struct GenerationService {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl GenerationService {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub async fn generate(&self, options: GenerationOptions) -> AppResult<QuizDto> {
        let prompt = build_prompt(&options);

        let raw = tokio::time::timeout(self.timeout, self.generator.complete(&prompt))
            .await
            .map_err(|_| {
                log::warn!("Quiz generation timed out after {:?}", self.timeout);
                AppError::Timeout("quiz generation took too long".to_string())
            })??;

        let parsed = parse_quiz(&raw, options.quiz_type, &options.title).map_err(|failure| {
            log::error!("failed to parse AI response ({}): {}", failure, raw);
            AppError::GenerationParseFailed(failure.to_string())
        })?;

        log::info!(
            "Generated {} quiz with {} questions",
            options.quiz_type,
            parsed.questions.len()
        );
        Ok(QuizDto::unsaved(&parsed.title, options.quiz_type, parsed.questions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dto::request::{Difficulty, GenerateQuizRequest};

    const MC_RESPONSE: &str = r#"```json
{
  "title": "Cells",
  "questions": [
    {
      "questionText": "What is the powerhouse of the cell?",
      "choices": [
        {"text": "Mitochondria", "isCorrect": true},
        {"text": "Nucleus", "isCorrect": false},
        {"text": "Ribosome", "isCorrect": false},
        {"text": "Golgi", "isCorrect": false}
      ],
      "explanation": "Mitochondria produce ATP."
    }
  ]
}
```"#;

    fn options(quiz_type: QuizType) -> GenerationOptions {
        GenerationOptions {
            text: "Cells have organelles.".to_string(),
            quiz_type,
            num_questions: 1,
            difficulty: Difficulty::Easy,
            title: "Biology".to_string(),
        }
    }

    #[test]
    fn test_parse_fenced_multiple_choice() {
        let parsed = parse_quiz(MC_RESPONSE, QuizType::MultipleChoice, "fallback").unwrap();
        assert_eq!(parsed.title, "Cells");
        assert_eq!(parsed.questions.len(), 1);
        assert_eq!(
            parsed.questions[0].correct_choice().map(|c| c.text.as_str()),
            Some("Mitochondria")
        );
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_quiz("Sorry, I cannot help with that.", QuizType::MultipleChoice, "t"),
            Err(ParseFailure::NotJson(_))
        ));
    }

    #[test]
    fn test_parse_rejects_two_correct_choices() {
        let raw = r#"{"questions":[{"questionText":"Q","choices":[
            {"text":"A","isCorrect":true},{"text":"B","isCorrect":true}]}]}"#;
        assert_eq!(
            parse_quiz(raw, QuizType::MultipleChoice, "t"),
            Err(ParseFailure::CorrectChoiceCount { index: 0, found: 2 })
        );
    }

    #[test]
    fn test_parse_rejects_empty_question_list() {
        assert_eq!(
            parse_quiz(r#"{"title":"x","questions":[]}"#, QuizType::Boolean, "t"),
            Err(ParseFailure::NoQuestions)
        );
    }

    #[test]
    fn test_parse_boolean_normalises_and_falls_back_to_title() {
        let raw = r#"{"questions":[{"questionText":"Sky is blue","choices":[
            {"text":"true","isCorrect":true},{"text":"FALSE","isCorrect":false}]}]}"#;
        let parsed = parse_quiz(raw, QuizType::Boolean, "Requested").unwrap();

        assert_eq!(parsed.title, "Requested");
        let texts: Vec<&str> = parsed.questions[0].choices.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["True", "False"]);
    }

    #[test]
    fn test_parse_boolean_rejects_other_choices() {
        let raw = r#"{"questions":[{"questionText":"Q","choices":[
            {"text":"Yes","isCorrect":true},{"text":"No","isCorrect":false}]}]}"#;
        assert_eq!(
            parse_quiz(raw, QuizType::Boolean, "t"),
            Err(ParseFailure::NotTrueFalse(0))
        );
    }

    #[test]
    fn test_prompt_truncates_source_text() {
        let mut opts = options(QuizType::MultipleChoice);
        opts.text = "x".repeat(MAX_SOURCE_CHARS + 500);
        let prompt = build_prompt(&opts);

        assert!(!prompt.contains(&"x".repeat(MAX_SOURCE_CHARS + 1)));
        assert!(prompt.contains(&"x".repeat(MAX_SOURCE_CHARS)));
        assert!(prompt.contains("Difficulty: easy"));
    }

    #[tokio::test]
    async fn test_generate_returns_unsaved_quiz() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_complete()
            .times(1)
            .returning(|_| Ok(MC_RESPONSE.to_string()));

        let service = GenerationService::new(Arc::new(generator), Duration::from_secs(5));
        let quiz = service.generate(options(QuizType::MultipleChoice)).await.unwrap();

        assert!(quiz.id.is_none());
        assert!(!quiz.attempted);
        assert_eq!(quiz.quiz_type, QuizType::MultipleChoice);
    }

    #[tokio::test]
    async fn test_generate_maps_parse_failure() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_complete()
            .returning(|_| Ok("not json".to_string()));

        let service = GenerationService::new(Arc::new(generator), Duration::from_secs(5));
        let err = service.generate(options(QuizType::Boolean)).await.unwrap_err();
        assert!(matches!(err, AppError::GenerationParseFailed(_)));
    }

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn complete(&self, _prompt: &str) -> AppResult<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(MC_RESPONSE.to_string())
        }
    }

    #[tokio::test]
    async fn test_generate_times_out() {
        let service = GenerationService::new(Arc::new(SlowGenerator), Duration::from_millis(20));
        let err = service
            .generate(options(QuizType::MultipleChoice))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }

    #[test]
    fn test_request_resolves_into_prompt() {
        let opts = GenerateQuizRequest {
            text: "Rust has ownership.".to_string(),
            quiz_type: Some("boolean".to_string()),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        let prompt = build_prompt(&opts);
        assert!(prompt.contains("Generate a boolean quiz"));
        assert!(prompt.contains("\"True\" and \"False\" only"));
    }
}
