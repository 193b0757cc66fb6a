pub mod quiz;
pub mod quiz_question;
pub mod user;
pub use quiz::{Quiz, QuizType};
pub use quiz_question::{Choice, Question, Score};
pub use user::User;
