use super::auth_middleware::CurrentUser;
use super::{AppError, AppState};
use crate::users::{hash_password, is_valid_email, verify_password, UserProfile, UserStoreError};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Signup request body
#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Login request body
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Create account API router
pub fn create_account_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/auth/signup", post(signup))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/me", get(me))
        .with_state(state)
}

/// POST /api/v1/auth/signup
async fn signup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<UserProfile>, AppError> {
    let Json(request) = payload?;
    let email = request.email.trim();
    let username = request.username.trim();

    if !is_valid_email(email) {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required".to_string()));
    }
    if request.password.is_empty() {
        return Err(AppError::BadRequest("Password is required".to_string()));
    }

    // CPU-bound
    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::ServerError(format!("Failed to create user: {}", e)))?
        .map_err(|e| AppError::ServerError(format!("Failed to create user: {}", e)))?;

    let user = state
        .users
        .create(email, username, &password_hash)
        .map_err(|e| match e {
            UserStoreError::EmailTaken | UserStoreError::UsernameTaken => {
                AppError::BadRequest(e.to_string())
            }
            other => AppError::ServerError(format!("Failed to create user: {}", other)),
        })?;

    info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(Json(UserProfile::from(&user)))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(request) = payload?;
    let rejected = || AppError::Unauthorized("Incorrect email or password".to_string());

    let user = state
        .users
        .find_by_email(request.email.trim())
        .map_err(|e| AppError::ServerError(format!("User lookup failed: {}", e)))?
        .ok_or_else(rejected)?;

    // CPU-bound
    let password = request.password;
    let stored_hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| AppError::ServerError(format!("Login failed: {}", e)))?;

    if !matches {
        warn!(user_id = %user.id, "Login rejected: wrong password");
        return Err(rejected());
    }

    let access_token = state
        .jwt
        .issue(&user.email)
        .map_err(|e| AppError::ServerError(e.to_string()))?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// GET /api/v1/auth/me
async fn me(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}
