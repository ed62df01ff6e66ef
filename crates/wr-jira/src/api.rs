//! Wire types for the Jira REST API.
//!
//! Deserialization is deliberately lenient: the API omits fields freely, so
//! almost everything defaults. Custom fields arrive flattened into `extra`
//! and are resolved once by the parser.

use std::collections::HashMap;

use serde::Deserialize;

/// One page of an issue search.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<RawIssue>,

    #[serde(default)]
    pub total: u32,

    #[serde(default, rename = "startAt")]
    pub start_at: u32,
}

/// A raw issue with embedded worklog data.
#[derive(Debug, Deserialize)]
pub struct RawIssue {
    pub key: String,

    #[serde(default)]
    pub fields: RawFields,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawFields {
    #[serde(default)]
    pub components: Vec<RawComponent>,

    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default)]
    pub issuetype: Option<RawIssueType>,

    #[serde(default)]
    pub worklog: Option<RawWorklogPage>,

    /// Everything else, including `customfield_*` entries.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawComponent {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawIssueType {
    pub name: String,
}

/// Worklog page, both as embedded in search results and as returned by the
/// per-issue worklog endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RawWorklogPage {
    #[serde(default)]
    pub worklogs: Vec<RawWorklog>,

    #[serde(default)]
    pub total: u32,

    #[serde(default, rename = "startAt")]
    pub start_at: u32,
}

#[derive(Debug, Deserialize)]
pub struct RawWorklog {
    #[serde(default)]
    pub author: Option<RawAuthor>,

    #[serde(default, rename = "timeSpentSeconds")]
    pub time_spent_seconds: i64,

    /// RFC3339-ish timestamp, e.g. `2025-09-03T10:15:30.000+0800`.
    pub started: String,
}

#[derive(Debug, Deserialize)]
pub struct RawAuthor {
    #[serde(default, rename = "accountId")]
    pub account_id: Option<String>,

    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,

    /// Not always present in worklog payloads; absent means active.
    #[serde(default)]
    pub active: Option<bool>,
}

/// Entry in the projects-list response.
#[derive(Debug, Deserialize)]
pub struct RawProject {
    pub key: String,
}
