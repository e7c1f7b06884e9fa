use crate::amplifi::ConnectorError;
use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// Application error types for all endpoints
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    ServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => {
                let body = Json(ErrorResponse { detail: msg });
                return (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, "Bearer")],
                    body,
                )
                    .into_response();
            }
            AppError::ServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<ConnectorError> for AppError {
    fn from(err: ConnectorError) -> Self {
        if err.is_client_error() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::ServerError(format!("Failed to process query: {}", err))
        }
    }
}

/// Malformed or incomplete request bodies are the caller's fault.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}
