use super::auth_middleware::CurrentUser;
use super::{AppError, AppState};
use crate::amplifi::ConnectivityStatus;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const NO_ANSWER: &str = "No answer found.";

/// Chat query request body
#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Logical chat source ("crm", "mail", or an alias). Defaults to CRM.
    #[serde(default)]
    pub chat_source: Option<String>,
}

/// Chat query response
#[derive(Debug, PartialEq, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub contexts: Option<Value>,
}

/// Create chat API router
pub fn create_chat_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/query", post(handle_query))
        .route("/api/v1/test/connection", get(test_connection))
        .with_state(state)
}

/// POST /api/v1/query
///
/// Forwards the query to Amplifi on behalf of an authenticated user and
/// reshapes the upstream payload into `{answer, contexts}`.
async fn handle_query(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(request) = payload?;
    if request.query.trim().is_empty() {
        return Err(AppError::BadRequest("Query must not be empty".to_string()));
    }

    tracing::info!(
        user_id = %user.id,
        chat_source = request.chat_source.as_deref().unwrap_or("-"),
        "Forwarding query to Amplifi"
    );

    let payload = state
        .connector
        .respond(&request.query, request.chat_source.as_deref())
        .await?;

    Ok(Json(extract_answer(&payload)))
}

/// GET /api/v1/test/connection
async fn test_connection(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConnectivityStatus>, AppError> {
    let status = state.connector.check_connectivity().await;
    if status.is_success() {
        Ok(Json(status))
    } else {
        Err(AppError::ServerError(format!(
            "Connection test failed: {}",
            status.message
        )))
    }
}

/// Pull the answer text out of the upstream payload.
///
/// Amplifi has answered in several shapes over time; the first one present wins:
/// - `{"responses": [{"response": "..."}]}`
/// - `{"pydantic_message": [{"model_response": {"content": "..."}}]}`
/// - `{"answer": "..."}`
/// - `{"response": "..."}`
pub fn extract_answer(payload: &Value) -> QueryResponse {
    let answer = if let Some(first) = first_element(payload, "responses") {
        text_or_default(first.get("response"))
    } else if let Some(first) = first_element(payload, "pydantic_message") {
        text_or_default(first.get("model_response").and_then(|m| m.get("content")))
    } else if let Some(answer) = payload.get("answer") {
        text_or_default(Some(answer))
    } else if let Some(response) = payload.get("response") {
        text_or_default(Some(response))
    } else {
        NO_ANSWER.to_string()
    };

    QueryResponse {
        answer,
        contexts: payload.get("contexts").filter(|c| !c.is_null()).cloned(),
    }
}

fn first_element<'a>(payload: &'a Value, key: &str) -> Option<&'a Value> {
    payload.get(key)?.as_array()?.first()
}

fn text_or_default(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => NO_ANSWER.to_string(),
        Some(other) => other.to_string(),
    }
}
