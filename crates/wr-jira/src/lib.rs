//! Jira worklog retrieval for the worklog reporter.
//!
//! Provides the upstream client (authenticated, cache-checked, retrying),
//! raw-issue parsing into classified entries, and the bounded-concurrency
//! fetch orchestrator.

pub mod api;
mod client;
mod error;
mod fetch;
mod parse;
mod retry;
mod transport;

pub use client::{Client, ClientOptions, DateRange};
pub use error::JiraError;
pub use fetch::{FetchError, FetchOptions, FetchOutcome, ProjectFailure, fetch_all};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Transport, TransportError, TransportReply};
