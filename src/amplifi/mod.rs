//! Amplifi upstream integration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       AmplifiConnector                   │
//! │  - respond(query, chat_source)           │
//! │  - check_connectivity()                  │
//! └─────────────────────────────────────────┘
//!      │ 1. resolve        │ 2. token        │ 3. chat call
//!      ↓                   ↓                 ↓
//! ┌────────────┐   ┌────────────────┐   ┌─────────────────┐
//! │ ChatSources│   │ TokenAcquirer  │   │ QueryDispatcher │
//! └────────────┘   └────────────────┘   └─────────────────┘
//!                          ↕
//!                  ┌────────────────┐
//!                  │ dyn TokenCache │
//!                  └────────────────┘
//! ```
//!
//! The chat source is resolved before any network traffic, so a bad source
//! never costs an upstream login.

mod cache;
mod dispatch;
mod error;
mod source;
mod token;

pub use cache::{CachedToken, FileTokenCache, MemoryTokenCache, TokenCache, EXPIRY_SKEW_SECONDS};
pub use dispatch::{QueryDispatcher, CHAT_PATH};
pub use error::ConnectorError;
pub use source::{ChatSource, ChatSourceConfig, ChatSources};
pub use token::{TokenAcquirer, DEFAULT_TOKEN_LIFETIME_SECONDS, LOGIN_PATH};

use crate::config::AmplifiConfig;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Characters of the token exposed by [`AmplifiConnector::check_connectivity`].
pub const TOKEN_PREVIEW_CHARS: usize = 50;

/// Result of a connectivity check.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConnectivityStatus {
    /// "success" or "error"
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_length: Option<usize>,
}

impl ConnectivityStatus {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Entry point for the HTTP layer.
pub struct AmplifiConnector {
    sources: ChatSources,
    acquirer: TokenAcquirer,
    dispatcher: QueryDispatcher,
}

impl AmplifiConnector {
    /// Builds a connector that caches the upstream token in
    /// `config.token_cache_path`.
    pub fn new(config: &AmplifiConfig) -> Result<Self, ConnectorError> {
        let cache = Arc::new(FileTokenCache::new(&config.token_cache_path));
        Self::with_cache(config, cache)
    }

    /// Builds a connector with an explicit token cache backend.
    ///
    /// Fails with [`ConnectorError::Config`] if credentials or any chat
    /// source identifiers are missing.
    pub fn with_cache(
        config: &AmplifiConfig,
        cache: Arc<dyn TokenCache>,
    ) -> Result<Self, ConnectorError> {
        let base_url = config.api_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ConnectorError::Config("api_url is required".to_string()));
        }
        if config.username.is_empty() || config.password.is_empty() {
            return Err(ConnectorError::Config(
                "username and password are required".to_string(),
            ));
        }

        let sources = ChatSources::new(config.crm.clone(), config.mail.clone())?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ConnectorError::Config(format!("failed to build HTTP client: {}", e)))?;

        tracing::info!(
            api_url = %base_url,
            timeout_seconds = config.timeout_seconds,
            "Amplifi connector initialized"
        );

        Ok(Self {
            sources,
            acquirer: TokenAcquirer::new(
                http_client.clone(),
                base_url,
                config.username.clone(),
                config.password.clone(),
                cache,
            ),
            dispatcher: QueryDispatcher::new(http_client, base_url),
        })
    }

    /// Forwards `query` to the chat session selected by `chat_source` and
    /// returns the raw upstream payload.
    pub async fn respond(
        &self,
        query: &str,
        chat_source: Option<&str>,
    ) -> Result<Value, ConnectorError> {
        let chat = self.sources.resolve(chat_source)?;
        let token = self.acquirer.get_valid_token().await?;
        self.dispatcher.dispatch(query, chat, &token).await
    }

    /// Verifies that an upstream token can be obtained. Never calls the chat
    /// endpoint.
    pub async fn check_connectivity(&self) -> ConnectivityStatus {
        match self.acquirer.get_valid_token().await {
            Ok(token) => {
                let preview: String = token.chars().take(TOKEN_PREVIEW_CHARS).collect();
                ConnectivityStatus {
                    status: "success".to_string(),
                    message: "Successfully connected to Amplifi".to_string(),
                    token_preview: Some(format!("{}...", preview)),
                    token_length: Some(token.chars().count()),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Amplifi connectivity check failed");
                ConnectivityStatus {
                    status: "error".to_string(),
                    message: e.to_string(),
                    token_preview: None,
                    token_length: None,
                }
            }
        }
    }
}
