pub mod health_handler;
pub mod multipart;
pub mod quiz_handler;
pub mod user_handler;

use actix_web::web;

use crate::errors::AppError;

pub const API_PREFIX: &str = "/api/v1";

/// Mounts every route. Protected handlers carry `AuthMiddleware` on their own
/// route so unknown paths still fall through to 404. Expects
/// `Data<Arc<AppState>>` and `Data<JwtService>` to be registered on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into());

    cfg.app_data(json_config)
        .service(health_handler::health_check)
        .service(health_handler::health_check_live)
        .service(health_handler::health_check_ready)
        .service(
            web::scope(API_PREFIX)
                .service(
                    web::scope("/users")
                        .service(user_handler::register)
                        .service(user_handler::login)
                        .service(user_handler::refresh_token)
                        .service(user_handler::logout)
                        .service(user_handler::current_user)
                        .service(user_handler::all_quizzes)
                        .service(user_handler::change_password)
                        .service(user_handler::change_details)
                        .service(user_handler::update_avatar),
                )
                .service(
                    web::scope("/quiz")
                        .service(quiz_handler::generate_quiz)
                        .service(quiz_handler::save_quiz)
                        .service(quiz_handler::update_quiz)
                        .service(quiz_handler::delete_quiz)
                        .service(quiz_handler::get_quiz),
                ),
        );
}
