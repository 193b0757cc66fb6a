use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("request timed out")]
    TimedOut,

    #[error("server responded {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("local storage error: {0}")]
    Storage(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::TimedOut
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised by the quiz-attempt state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("no quiz is loaded")]
    NoQuiz,

    #[error("question {0} does not exist")]
    QuestionOutOfRange(usize),

    #[error("{0} questions left unattempted")]
    Unanswered(usize),

    #[error("quiz has already been submitted")]
    AlreadySubmitted,

    #[error("quiz must be submitted first")]
    NotSubmitted,

    #[error(transparent)]
    Client(#[from] ClientError),
}

pub type AttemptResult<T> = Result<T, AttemptError>;
