pub mod quiz_dto;
pub mod request;
pub mod response;

pub use quiz_dto::QuizDto;
pub use response::{ApiResponse, UserDto};
