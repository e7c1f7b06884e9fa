//! Error taxonomy for the Amplifi connector.

use thiserror::Error;

/// Failures surfaced by [`AmplifiConnector`](super::AmplifiConnector).
///
/// Cache read/write problems never appear here; they degrade to a cache miss
/// and are only logged.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Missing or invalid configuration. Only produced at construction.
    #[error("Invalid Amplifi configuration: {0}")]
    Config(String),

    /// Caller supplied a chat source that does not map to a configured one.
    #[error("Invalid chat_source '{given}'. Valid options: {}", .valid.join(", "))]
    InvalidChatSource { given: String, valid: Vec<String> },

    /// Upstream login rejected the credentials or answered with a malformed body.
    #[error("Failed to get Amplifi access token: {message}")]
    UpstreamAuth { status: Option<u16>, message: String },

    /// Upstream chat call answered with a non-2xx status. `detail` is empty
    /// when the upstream sent no body.
    #[error("Failed to get response from Amplifi chat endpoint. Status: {status}{}", detail_suffix(.detail))]
    UpstreamQuery { status: u16, detail: String },

    /// No response from upstream at all (connect failure, timeout).
    #[error("Network error calling Amplifi: {0}")]
    UpstreamNetwork(String),
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(", {}", detail)
    }
}

impl ConnectorError {
    /// True when the caller, not the service or upstream, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ConnectorError::InvalidChatSource { .. })
    }

    pub(crate) fn network(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ConnectorError::UpstreamNetwork(format!("request timed out: {}", err))
        } else {
            ConnectorError::UpstreamNetwork(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_chat_source_lists_valid_options() {
        let err = ConnectorError::InvalidChatSource {
            given: "fax".to_string(),
            valid: vec!["crm".to_string(), "mail".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid chat_source 'fax'. Valid options: crm, mail"
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn test_upstream_errors_are_server_side() {
        let query = ConnectorError::UpstreamQuery {
            status: 502,
            detail: "Response: bad gateway".to_string(),
        };
        assert!(query.to_string().ends_with("Status: 502, Response: bad gateway"));
        let bare = ConnectorError::UpstreamQuery {
            status: 504,
            detail: String::new(),
        };
        assert!(bare.to_string().ends_with("Status: 504"));
        assert!(!query.is_client_error());
        assert!(!ConnectorError::UpstreamNetwork("refused".to_string()).is_client_error());
        assert!(!ConnectorError::UpstreamAuth {
            status: Some(401),
            message: "nope".to_string()
        }
        .is_client_error());
    }
}
