// HTTP API: account management, chat proxy, health

pub mod account;
pub mod auth_middleware;
pub mod chat;
pub mod cors;
mod error;
pub mod health;

pub use account::create_account_router;
pub use auth_middleware::{authenticate, AuthError, CurrentUser};
pub use chat::{create_chat_router, extract_answer, QueryRequest, QueryResponse};
pub use cors::cors_layer;
pub use error::AppError;
pub use health::create_health_router;

use crate::amplifi::AmplifiConnector;
use crate::auth::JwtKeys;
use crate::users::UserStore;
use axum::Router;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub connector: Arc<AmplifiConnector>,
    pub users: Arc<UserStore>,
    pub jwt: JwtKeys,
}

/// Create the full API router
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .merge(create_health_router())
        .merge(create_account_router(Arc::clone(&state)))
        .merge(create_chat_router(state))
}
