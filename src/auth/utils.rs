use crate::{
    auth::Claims,
    errors::{AppError, AppResult},
    models::domain::Quiz,
};

/// Only the owning user may touch a quiz.
pub fn require_quiz_owner(claims: &Claims, quiz: &Quiz) -> AppResult<()> {
    let user_id = claims.user_id()?;
    if !quiz.is_owned_by(&user_id) {
        return Err(AppError::Unauthorized(
            "You are not authorized to access this quiz".to_string(),
        ));
    }
    Ok(())
}
