//! Upstream chat call.

use super::error::ConnectorError;
use super::source::ChatSourceConfig;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

/// Chat endpoint path, relative to the API base URL.
pub const CHAT_PATH: &str = "/api/v2/chat";

/// Characters of a non-JSON error body kept in error messages.
const RAW_ERROR_BODY_LIMIT: usize = 500;

#[derive(Serialize)]
struct ChatRequest<'a> {
    chat_app_id: &'a str,
    chat_session_id: &'a str,
    query: &'a str,
}

/// Sends queries to the upstream chat endpoint.
pub struct QueryDispatcher {
    http_client: Client,
    chat_url: String,
}

impl QueryDispatcher {
    pub fn new(http_client: Client, base_url: &str) -> Self {
        Self {
            http_client,
            chat_url: format!("{}{}", base_url, CHAT_PATH),
        }
    }

    /// Posts `query` to the chat session described by `chat` and returns the
    /// upstream JSON payload unmodified.
    pub async fn dispatch(
        &self,
        query: &str,
        chat: &ChatSourceConfig,
        token: &str,
    ) -> Result<Value, ConnectorError> {
        let request = ChatRequest {
            chat_app_id: &chat.chat_app_id,
            chat_session_id: &chat.chat_session_id,
            query,
        };

        tracing::info!(
            url = %self.chat_url,
            chat_app_id = %chat.chat_app_id,
            chat_session_id = %chat.chat_session_id,
            "Calling Amplifi chat endpoint"
        );

        let response = self
            .http_client
            .post(&self.chat_url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Network error calling Amplifi chat endpoint");
                ConnectorError::network(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(ConnectorError::network)?;

        if !status.is_success() {
            let detail = describe_error_body(&body);
            tracing::error!(status = status.as_u16(), detail = %detail, "Amplifi chat call failed");
            return Err(ConnectorError::UpstreamQuery {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(status = status.as_u16(), error = %e, "Amplifi chat response is not JSON");
            ConnectorError::UpstreamQuery {
                status: status.as_u16(),
                detail: format!("malformed response: {}", e),
            }
        })
    }
}

/// Structured JSON when the body parses, otherwise a bounded prefix of the raw
/// text. Empty for an empty body.
fn describe_error_body(body: &str) -> String {
    if body.trim().is_empty() {
        return String::new();
    }

    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let pretty = serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string());
        return format!("Details: {}", pretty);
    }

    let truncated: String = body.chars().take(RAW_ERROR_BODY_LIMIT).collect();
    format!("Response: {}", truncated)
}
