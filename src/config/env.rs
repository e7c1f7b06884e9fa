use super::{
    default_access_token_expire_minutes, default_database_path, default_port,
    default_timeout_seconds, default_token_cache_path, AmplifiConfig, AuthConfig,
    DatabaseConfig, ServerConfig, Settings,
};
use crate::amplifi::ChatSourceConfig;
use anyhow::{anyhow, Context, Result};

/// Build settings from the process environment, after loading `.env` if present.
pub fn from_env() -> Result<Settings> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "Failed to load .env file");
        }
    }
    from_lookup(|key| std::env::var(key).ok())
}

/// Build settings from an arbitrary variable source.
///
/// Chat source identifiers are optional here; the connector rejects
/// incomplete ones when it is constructed.
pub fn from_lookup<F>(lookup: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let require = |key: &str| get(key).ok_or_else(|| anyhow!("{} is required", key));

    let port = match get("PORT") {
        Some(v) => v.parse().context("PORT must be a valid port number")?,
        None => default_port(),
    };

    let timeout_seconds = match get("AMPLIFI_TIMEOUT_SECONDS") {
        Some(v) => v
            .parse()
            .context("AMPLIFI_TIMEOUT_SECONDS must be a whole number of seconds")?,
        None => default_timeout_seconds(),
    };

    let access_token_expire_minutes = match get("ACCESS_TOKEN_EXPIRE_MINUTES") {
        Some(v) => v
            .parse()
            .context("ACCESS_TOKEN_EXPIRE_MINUTES must be a whole number of minutes")?,
        None => default_access_token_expire_minutes(),
    };

    // The CRM source predates the mail source and kept the unprefixed names.
    let crm = ChatSourceConfig {
        chat_app_id: get("AMPLIFI_CRM_CHAT_APP_ID")
            .or_else(|| get("AMPLIFI_CHAT_APP_ID"))
            .unwrap_or_default(),
        chat_session_id: get("AMPLIFI_CRM_CHAT_SESSION_ID")
            .or_else(|| get("AMPLIFI_CHAT_SESSION_ID"))
            .unwrap_or_default(),
    };
    let mail = ChatSourceConfig {
        chat_app_id: get("AMPLIFI_MAIL_CHAT_APP_ID").unwrap_or_default(),
        chat_session_id: get("AMPLIFI_MAIL_CHAT_SESSION_ID").unwrap_or_default(),
    };

    Ok(Settings {
        server: ServerConfig {
            port,
            frontend_url: get("FRONTEND_URL"),
            vercel_url: get("VERCEL_URL"),
        },
        amplifi: AmplifiConfig {
            api_url: require("AMPLIFI_API_URL")?,
            username: require("AMPLIFI_USERNAME")?,
            password: require("AMPLIFI_PASSWORD")?,
            token_cache_path: get("AMPLIFI_TOKEN_CACHE_PATH")
                .unwrap_or_else(default_token_cache_path),
            timeout_seconds,
            crm,
            mail,
        },
        auth: AuthConfig {
            secret_key: require("SECRET_KEY")?,
            access_token_expire_minutes,
        },
        database: DatabaseConfig {
            path: get("DATABASE_PATH").unwrap_or_else(default_database_path),
        },
    })
}
