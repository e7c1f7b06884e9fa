//! Persistence for the upstream access token.
//!
//! The cache holds a single record. There is no delete operation: a record
//! stops being used once [`CachedToken::is_usable`] returns false and is
//! overwritten by the next successful login.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Safety margin (seconds) before expiry during which a token is treated as expired.
pub const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Upstream access token plus its absolute expiry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,

    /// Unix epoch seconds.
    pub expires_at: i64,

    /// Any other fields the login response carried (token_type, refresh_token, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CachedToken {
    pub fn new(access_token: impl Into<String>, expires_at: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
            extra: Map::new(),
        }
    }

    /// Whether the token can still be sent upstream at `now` (epoch seconds).
    pub fn is_usable(&self, now: i64) -> bool {
        !self.access_token.is_empty() && self.expires_at > now + EXPIRY_SKEW_SECONDS
    }
}

/// Storage backend for the upstream token.
///
/// Implementations must not assume exclusive access: several requests may
/// load and store concurrently, and the last writer wins.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Returns the stored record, or `None` if absent, unreadable or malformed.
    async fn load(&self) -> Option<CachedToken>;

    /// Overwrites the stored record.
    async fn store(&self, record: &CachedToken) -> Result<()>;
}

/// JSON file backed cache.
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenCache for FileTokenCache {
    async fn load(&self) -> Option<CachedToken> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Token cache not readable");
                return None;
            }
        };

        match serde_json::from_slice::<CachedToken>(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Token cache is corrupt, treating as empty"
                );
                None
            }
        }
    }

    async fn store(&self, record: &CachedToken) -> Result<()> {
        let contents =
            serde_json::to_vec_pretty(record).context("Failed to serialize token record")?;

        // Write beside the target and rename so readers never see a partial file.
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "amplifi_token.json".to_string());
        let tmp_path = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        tokio::fs::write(&tmp_path, &contents)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e).with_context(|| format!("Failed to replace {}", self.path.display()));
        }

        Ok(())
    }
}

/// In-process cache. Lost on restart.
#[derive(Default)]
pub struct MemoryTokenCache {
    record: RwLock<Option<CachedToken>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache pre-populated with `record`.
    pub fn with_record(record: CachedToken) -> Self {
        Self {
            record: RwLock::new(Some(record)),
        }
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn load(&self) -> Option<CachedToken> {
        self.record.read().await.clone()
    }

    async fn store(&self, record: &CachedToken) -> Result<()> {
        *self.record.write().await = Some(record.clone());
        Ok(())
    }
}
