//! HTTP transport seam.
//!
//! The client is generic over [`Transport`] so tests can substitute a
//! scripted fake and count upstream calls; production uses
//! [`HttpTransport`], a thin wrapper over reqwest with HTTP Basic auth.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::error::JiraError;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// REST API prefix appended to the configured base URL.
const API_PREFIX: &str = "rest/api/3";

/// A raw HTTP reply: status plus body text.
#[derive(Debug, Clone)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

impl TransportReply {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Errors below the HTTP layer (connection refused, timeout, DNS).
/// Always considered transient.
#[derive(Debug, Error)]
#[error("network error: {0}")]
pub struct TransportError(pub String);

/// Issues one authenticated GET against the upstream API.
pub trait Transport: Send + Sync + 'static {
    /// Performs a GET for `path` (relative to the API root) with `query`.
    fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> impl Future<Output = Result<TransportReply, TransportError>> + Send;
}

/// Production transport over reqwest with HTTP Basic authentication
/// (account email + API token).
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    username: String,
    api_token: String,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("api_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Creates the transport after validating the connection settings.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self, JiraError> {
        let base_url = base_url.into();
        let username = username.into();
        let api_token = api_token.into();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(JiraError::InvalidConfig {
                reason: "base URL must start with http:// or https://",
            });
        }
        if username.trim().is_empty() {
            return Err(JiraError::InvalidConfig {
                reason: "username cannot be empty",
            });
        }
        if api_token.trim().is_empty() {
            return Err(JiraError::InvalidConfig {
                reason: "API token cannot be empty",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(JiraError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            api_token,
        })
    }
}

impl Transport for HttpTransport {
    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<TransportReply, TransportError> {
        let url = format!("{}/{API_PREFIX}/{path}", self.base_url);
        tracing::debug!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.api_token))
            .query(query)
            .send()
            .await
            .map_err(|err| TransportError(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError(err.to_string()))?;

        Ok(TransportReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            HttpTransport::new("example.atlassian.net", "a@b.com", "token"),
            Err(JiraError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_empty_credentials() {
        assert!(matches!(
            HttpTransport::new("https://example.atlassian.net", "", "token"),
            Err(JiraError::InvalidConfig { .. })
        ));
        assert!(matches!(
            HttpTransport::new("https://example.atlassian.net", "a@b.com", "  "),
            Err(JiraError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn debug_redacts_api_token() {
        let transport =
            HttpTransport::new("https://example.atlassian.net", "a@b.com", "secret-token")
                .unwrap();
        let debug = format!("{transport:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let transport =
            HttpTransport::new("https://example.atlassian.net/", "a@b.com", "token").unwrap();
        let debug = format!("{transport:?}");
        assert!(debug.contains("https://example.atlassian.net\""));
    }
}
