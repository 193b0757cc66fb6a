use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{
    cookie::{Cookie, SameSite},
    get, patch, post, put, web, HttpRequest, HttpResponse,
};

use crate::{
    app_state::AppState,
    auth::{AuthMiddleware, AuthenticatedUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    errors::AppError,
    handlers::multipart::read_form,
    models::dto::{
        request::{
            ChangeDetailsRequest, ChangePasswordRequest, LoginRequest, RefreshTokenRequest,
            RegisterRequest,
        },
        ApiResponse,
    },
};

fn token_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(if secure { SameSite::None } else { SameSite::Lax })
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

#[post("/register")]
async fn register(
    state: web::Data<Arc<AppState>>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let form = read_form(payload, "avatar", state.config.max_avatar_bytes).await?;
    let request = RegisterRequest::new(
        form.text("username"),
        form.text("email"),
        form.text("password"),
    )?;

    let user = state.user_service.register(request, form.file).await?;
    Ok(HttpResponse::Created().json(ApiResponse::created(user, "User registered successfully")))
}

#[post("/login")]
async fn login(
    state: web::Data<Arc<AppState>>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state.user_service.login(request.into_inner()).await?;
    let secure = state.config.cookie_secure;

    Ok(HttpResponse::Ok()
        .cookie(token_cookie(
            ACCESS_TOKEN_COOKIE,
            response.access_token.clone(),
            secure,
        ))
        .cookie(token_cookie(
            REFRESH_TOKEN_COOKIE,
            response.refresh_token.clone(),
            secure,
        ))
        .json(ApiResponse::ok(response, "User logged in successfully")))
}

#[post("/refresh-token")]
async fn refresh_token(
    state: web::Data<Arc<AppState>>,
    req: HttpRequest,
    body: Option<web::Json<RefreshTokenRequest>>,
) -> Result<HttpResponse, AppError> {
    let presented = body
        .and_then(|b| b.into_inner().refresh_token)
        .filter(|t| !t.is_empty())
        .or_else(|| req.cookie(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

    let tokens = state.user_service.refresh(&presented).await?;
    let secure = state.config.cookie_secure;

    Ok(HttpResponse::Ok()
        .cookie(token_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone(), secure))
        .cookie(token_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone(), secure))
        .json(ApiResponse::ok(tokens, "Access token refreshed")))
}

#[post("/logout", wrap = "AuthMiddleware")]
async fn logout(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.user_service.logout(&auth.0.user_id()?).await?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(removal_cookie(REFRESH_TOKEN_COOKIE))
        .json(ApiResponse::ok(serde_json::json!({}), "User logged out")))
}

#[get("/current-user", wrap = "AuthMiddleware")]
async fn current_user(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = state.user_service.current_user(&auth.0.user_id()?).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user, "Current user fetched successfully")))
}

#[get("/allQuizes", wrap = "AuthMiddleware")]
async fn all_quizzes(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quizzes = state.user_service.all_quizzes(&auth.0.user_id()?).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(quizzes, "User quizzes fetched successfully")))
}

#[put("/change-password", wrap = "AuthMiddleware")]
async fn change_password(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
    request: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    validator::Validate::validate(&request)?;

    state
        .user_service
        .change_password(&auth.0.user_id()?, request)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    )))
}

#[post("/change-details", wrap = "AuthMiddleware")]
async fn change_details(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
    request: web::Json<ChangeDetailsRequest>,
) -> Result<HttpResponse, AppError> {
    let user = state
        .user_service
        .change_details(&auth.0.user_id()?, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user, "Account details updated successfully")))
}

#[patch("/update-avatar", wrap = "AuthMiddleware")]
async fn update_avatar(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let form = read_form(payload, "avatar", state.config.max_avatar_bytes).await?;
    let user = state
        .user_service
        .update_avatar(&auth.0.user_id()?, form.file)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user, "Avatar updated successfully")))
}
