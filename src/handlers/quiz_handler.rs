use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{AuthMiddleware, AuthenticatedUser},
    errors::AppError,
    models::dto::{
        request::{GenerateQuizRequest, SaveQuizRequest, UpdateQuizRequest},
        response::QuizEnvelope,
        ApiResponse,
    },
};

#[post("/generate-quiz")]
async fn generate_quiz(
    state: web::Data<Arc<AppState>>,
    request: web::Json<GenerateQuizRequest>,
) -> Result<HttpResponse, AppError> {
    let options = request.into_inner().resolve()?;
    let quiz = state.generation_service.generate(options).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        QuizEnvelope { quiz },
        "Quiz generated successfully!",
    )))
}

#[post("/save", wrap = "AuthMiddleware")]
async fn save_quiz(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
    request: web::Json<SaveQuizRequest>,
) -> Result<HttpResponse, AppError> {
    let saved = state.quiz_service.save(&auth.0, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::created(saved, "Quiz saved successfully")))
}

#[put("/update-quiz/{quiz_id}", wrap = "AuthMiddleware")]
async fn update_quiz(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
    quiz_id: web::Path<String>,
    request: web::Json<UpdateQuizRequest>,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .update_attempt(&auth.0, &quiz_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        QuizEnvelope { quiz },
        "Quiz updated successfully",
    )))
}

#[delete("/delete/{quiz_id}", wrap = "AuthMiddleware")]
async fn delete_quiz(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
    quiz_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.quiz_service.delete(&auth.0, &quiz_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        serde_json::json!({}),
        "Quiz deleted successfully",
    )))
}

#[get("/getQuiz/{quiz_id}", wrap = "AuthMiddleware")]
async fn get_quiz(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
    quiz_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.get(&auth.0, &quiz_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        QuizEnvelope { quiz },
        "Quiz fetched successfully",
    )))
}
