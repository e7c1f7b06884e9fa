//! Chat source routing.
//!
//! A chat source selects which upstream chat application and session a query
//! is sent to. Callers name it loosely ("Zoho CRM", "zoho_mail", "crm"); this
//! module normalizes the name and maps it to the configured identifiers.

use super::error::ConnectorError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported chat sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChatSource {
    Crm,
    Mail,
}

/// Free-form caller input (already trimmed and lowercased) -> canonical source.
const ALIASES: &[(&str, ChatSource)] = &[
    ("zoho crm", ChatSource::Crm),
    ("zoho_crm", ChatSource::Crm),
    ("zoho-crm", ChatSource::Crm),
    ("zohocrm", ChatSource::Crm),
    ("zoho mail", ChatSource::Mail),
    ("zoho_mail", ChatSource::Mail),
    ("zoho-mail", ChatSource::Mail),
    ("zohomail", ChatSource::Mail),
    ("email", ChatSource::Mail),
];

impl ChatSource {
    pub const ALL: [ChatSource; 2] = [ChatSource::Crm, ChatSource::Mail];

    /// Source used when the caller names none.
    // TODO: require an explicit chat_source once all clients send one.
    pub const DEFAULT: ChatSource = ChatSource::Crm;

    /// Canonical key.
    pub fn key(self) -> &'static str {
        match self {
            ChatSource::Crm => "crm",
            ChatSource::Mail => "mail",
        }
    }

    /// Canonical keys, sorted.
    pub fn valid_keys() -> Vec<String> {
        let mut keys: Vec<String> = Self::ALL.iter().map(|s| s.key().to_string()).collect();
        keys.sort();
        keys
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    /// Normalizes caller input into a chat source.
    ///
    /// Absent or blank input selects [`ChatSource::DEFAULT`]. Otherwise the
    /// input is trimmed and lowercased, looked up in the alias table, and
    /// finally matched against the canonical keys.
    pub fn parse(input: Option<&str>) -> Result<Self, ConnectorError> {
        let normalized = match input.map(|s| s.trim().to_lowercase()) {
            Some(s) if !s.is_empty() => s,
            _ => return Ok(Self::DEFAULT),
        };

        let candidate = ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map(|(_, source)| *source)
            .or_else(|| Self::from_key(&normalized));

        candidate.ok_or_else(|| ConnectorError::InvalidChatSource {
            given: input.unwrap_or_default().to_string(),
            valid: Self::valid_keys(),
        })
    }
}

impl fmt::Display for ChatSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Upstream identifiers for one chat source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSourceConfig {
    #[serde(default)]
    pub chat_app_id: String,
    #[serde(default)]
    pub chat_session_id: String,
}

impl ChatSourceConfig {
    pub fn new(chat_app_id: impl Into<String>, chat_session_id: impl Into<String>) -> Self {
        Self {
            chat_app_id: chat_app_id.into(),
            chat_session_id: chat_session_id.into(),
        }
    }

    fn validate(&self, source: ChatSource) -> Result<(), ConnectorError> {
        if self.chat_app_id.trim().is_empty() {
            return Err(ConnectorError::Config(format!(
                "chat source '{}' is missing chat_app_id",
                source
            )));
        }
        if self.chat_session_id.trim().is_empty() {
            return Err(ConnectorError::Config(format!(
                "chat source '{}' is missing chat_session_id",
                source
            )));
        }
        Ok(())
    }
}

/// Validated identifiers for every [`ChatSource`].
#[derive(Clone, Debug)]
pub struct ChatSources {
    crm: ChatSourceConfig,
    mail: ChatSourceConfig,
}

impl ChatSources {
    /// Fails if any source is missing either identifier.
    pub fn new(crm: ChatSourceConfig, mail: ChatSourceConfig) -> Result<Self, ConnectorError> {
        crm.validate(ChatSource::Crm)?;
        mail.validate(ChatSource::Mail)?;
        Ok(Self { crm, mail })
    }

    pub fn get(&self, source: ChatSource) -> &ChatSourceConfig {
        match source {
            ChatSource::Crm => &self.crm,
            ChatSource::Mail => &self.mail,
        }
    }

    /// Resolves caller input to the identifiers of a configured source.
    pub fn resolve(&self, input: Option<&str>) -> Result<&ChatSourceConfig, ConnectorError> {
        ChatSource::parse(input).map(|source| self.get(source))
    }
}
