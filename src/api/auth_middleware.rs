use super::{AppError, AppState};
use crate::auth::{bearer_token, JwtKeys};
use crate::users::{User, UserStore};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use std::sync::Arc;


/// Authentication errors
#[derive(Debug, PartialEq)]
pub enum AuthError {
    /// Missing, malformed, forged or expired token
    InvalidToken(String),
    /// Token is valid but names no existing user
    UnknownUser(String),
    /// User lookup failed
    Store(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            AuthError::UnknownUser(email) => write!(f, "Unknown user: {}", email),
            AuthError::Store(msg) => write!(f, "User lookup failed: {}", msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(msg) => AppError::ServerError(format!("User lookup failed: {}", msg)),
            _ => AppError::Unauthorized("Could not validate credentials".to_string()),
        }
    }
}

/// Resolve the user behind the request's bearer token
///
/// # Flow
/// 1. Extract bearer token from Authorization header
/// 2. Verify JWT signature and expiry
/// 3. Load the user named by the `sub` claim
pub fn authenticate(
    headers: &HeaderMap,
    users: &UserStore,
    jwt: &JwtKeys,
) -> Result<User, AuthError> {
    let token = bearer_token(headers).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    let claims = jwt
        .verify(token)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    users
        .find_by_email(&claims.sub)
        .map_err(|e| AuthError::Store(e.to_string()))?
        .ok_or(AuthError::UnknownUser(claims.sub))
}

/// Extractor for handlers that require a logged-in user.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, &state.users, &state.jwt)
            .map(CurrentUser)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected request authentication");
                AppError::from(e)
            })
    }
}
