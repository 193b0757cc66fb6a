pub mod generation_service;
pub mod media_service;
pub mod quiz_service;
pub mod user_service;
