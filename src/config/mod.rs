pub mod env;

pub use env::from_env;

use crate::amplifi::ChatSourceConfig;
use serde::Deserialize;

/// Complete connector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    pub amplifi: AmplifiConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Explicit frontend origin. When unset, CORS allows any origin.
    #[serde(default)]
    pub frontend_url: Option<String>,
    /// Deployment host name (no scheme) added to the allowed origins.
    #[serde(default)]
    pub vercel_url: Option<String>,
}

fn default_port() -> u16 {
    8001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            frontend_url: None,
            vercel_url: None,
        }
    }
}

/// Upstream Amplifi API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AmplifiConfig {
    pub api_url: String,
    pub username: String,
    pub password: String,
    /// Where the upstream access token is cached between requests
    #[serde(default = "default_token_cache_path")]
    pub token_cache_path: String,
    /// Bound on every outbound call (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub crm: ChatSourceConfig,
    #[serde(default)]
    pub mail: ChatSourceConfig,
}

fn default_token_cache_path() -> String {
    "amplifi_token.json".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Local user authentication (JWT) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret_key: String,
    #[serde(default = "default_access_token_expire_minutes")]
    pub access_token_expire_minutes: i64,
}

fn default_access_token_expire_minutes() -> i64 {
    60 * 24 * 7
}

/// User account storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file (":memory:" for a throwaway store)
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "amplifi_connector.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> anyhow::Result<Settings> {
    let contents = std::fs::read_to_string(path)?;
    let config: Settings = toml::from_str(&contents)?;
    Ok(config)
}
