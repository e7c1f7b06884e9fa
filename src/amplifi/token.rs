//! Upstream access token acquisition.
//!
//! Serves the cached token while it is usable, otherwise performs a
//! password-grant login and caches the result.

use super::cache::{CachedToken, TokenCache};
use super::error::ConnectorError;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Token lifetime assumed when the login response omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;

/// Login endpoint path, relative to the API base URL.
pub const LOGIN_PATH: &str = "/api/v2/login/access-token";

/// Password-grant login response.
#[derive(Deserialize, Debug)]
struct LoginResponse {
    #[serde(default)]
    access_token: Option<String>,
    /// Seconds. Some deployments send a float.
    #[serde(default)]
    expires_in: Option<f64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Obtains upstream access tokens, consulting the injected cache first.
pub struct TokenAcquirer {
    http_client: Client,
    login_url: String,
    username: String,
    password: String,
    cache: Arc<dyn TokenCache>,
}

impl TokenAcquirer {
    pub fn new(
        http_client: Client,
        base_url: &str,
        username: String,
        password: String,
        cache: Arc<dyn TokenCache>,
    ) -> Self {
        Self {
            http_client,
            login_url: format!("{}{}", base_url, LOGIN_PATH),
            username,
            password,
            cache,
        }
    }

    /// Returns an access token valid for at least the skew window.
    pub async fn get_valid_token(&self) -> Result<String, ConnectorError> {
        let now = Utc::now().timestamp();

        if let Some(record) = self.cache.load().await {
            if record.is_usable(now) {
                tracing::debug!(expires_at = record.expires_at, "Using cached Amplifi token");
                return Ok(record.access_token);
            }
            tracing::debug!(expires_at = record.expires_at, "Cached Amplifi token expired");
        }

        let record = self.login(now).await?;

        if let Err(e) = self.cache.store(&record).await {
            tracing::warn!(error = %e, "Failed to cache Amplifi token, continuing without cache");
        } else {
            tracing::debug!(expires_at = record.expires_at, "Amplifi token cached");
        }

        Ok(record.access_token)
    }

    async fn login(&self, now: i64) -> Result<CachedToken, ConnectorError> {
        tracing::info!(url = %self.login_url, "Logging in to Amplifi for a new access token");

        let form = [
            ("grant_type", "password"),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.login_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Amplifi login request failed");
                ConnectorError::network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(status = status.as_u16(), body = %body, "Amplifi login rejected");
            return Err(ConnectorError::UpstreamAuth {
                status: Some(status.as_u16()),
                message: format!("login failed with status {}: {}", status, body),
            });
        }

        let login: LoginResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Amplifi login response is not valid JSON");
            ConnectorError::UpstreamAuth {
                status: Some(status.as_u16()),
                message: format!("malformed login response: {}", e),
            }
        })?;

        let access_token = login
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConnectorError::UpstreamAuth {
                status: Some(status.as_u16()),
                message: "login succeeded but response has no 'access_token'".to_string(),
            })?;

        // `as` saturates, so absurd lifetimes clamp instead of overflowing.
        let expires_in = login
            .expires_in
            .map(|secs| secs as i64)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS)
            .max(0);

        tracing::info!(expires_in, "Amplifi access token acquired");

        Ok(CachedToken {
            access_token,
            expires_at: now.saturating_add(expires_in),
            extra: login.extra,
        })
    }
}
