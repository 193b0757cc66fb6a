//! Headless client: state containers, the local attempt cache, the quiz
//! attempt lifecycle and a typed HTTP client for the REST API.

pub mod api;
pub mod attempt;
pub mod attempt_cache;
pub mod errors;
pub mod input;
pub mod shell;
pub mod storage;
pub mod stores;

pub use api::{HttpQuizApi, QuizApi};
pub use attempt::{AttemptSession, AttemptState, PersistOutcome};
pub use attempt_cache::{AttemptCache, CachedAttempt};
pub use errors::{AttemptError, ClientError};
pub use shell::ClientShell;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use stores::{QuizStore, UserStore};
