//! Upstream client errors.

use thiserror::Error;

/// Errors surfaced by the Jira client.
#[derive(Debug, Error)]
pub enum JiraError {
    /// The client configuration was invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },

    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Credentials were rejected. Fatal and non-retryable: the whole run
    /// halts rather than hammering the API.
    #[error("authentication failed (status {status}): check credentials")]
    Auth { status: u16 },

    /// A request failed after exhausting the retry budget, or failed with a
    /// non-retryable status. Tagged with what was being fetched so degraded
    /// runs can report it.
    #[error("fetch failed for {what}: {message}")]
    Fetch { what: String, message: String },

    /// The response body could not be parsed.
    #[error("invalid response for {what}: {message}")]
    InvalidResponse { what: String, message: String },
}

impl JiraError {
    /// Whether this error halts the entire run rather than just one project.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}
