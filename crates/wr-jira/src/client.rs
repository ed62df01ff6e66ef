//! Authenticated, cache-checked access to the worklog search API.

use std::sync::Arc;

use chrono::NaiveDate;
use wr_cache::{Cache, Fingerprint};
use wr_core::{ClassifierConfig, ProjectKey, WorkEntry};

use crate::api::{RawIssue, RawProject, RawWorklog, RawWorklogPage, SearchResponse};
use crate::error::JiraError;
use crate::parse::entries_for_issue;
use crate::retry::{RetryPolicy, is_transient_status};
use crate::transport::Transport;

/// Issue fields requested from the search endpoint.
const SEARCH_FIELDS: &str = "key,summary,components,labels,issuetype,worklog,customfield_*";

/// Custom field IDs checked for the work-type category, in priority order.
/// Site-specific; overridable through [`ClientOptions`].
const DEFAULT_CATEGORY_FIELDS: [&str; 3] =
    ["customfield_10082", "customfield_10048", "customfield_10081"];

/// Inclusive date range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The full calendar year.
    #[must_use]
    pub fn year(year: i32) -> Self {
        Self {
            // Jan 1 and Dec 31 exist for every year
            start: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
        }
    }
}

/// Tunables for the client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Backoff policy for transient upstream failures.
    pub retry: RetryPolicy,

    /// Term sets for the fallback classification rule.
    pub classifier: ClassifierConfig,

    /// Custom field IDs to inspect for the categorization value.
    pub category_fields: Vec<String>,

    /// Page size for search and worklog pagination.
    pub page_size: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            classifier: ClassifierConfig::default(),
            category_fields: DEFAULT_CATEGORY_FIELDS.map(String::from).to_vec(),
            page_size: 100,
        }
    }
}

/// Classification inputs threaded into the parser.
#[derive(Debug, Clone)]
pub(crate) struct ParseContext {
    pub(crate) classifier: ClassifierConfig,
    pub(crate) category_fields: Vec<String>,
}

/// Upstream client.
///
/// Generic over [`Transport`] so tests can count and script upstream
/// calls. Holds an explicit cache handle scoped to one report run; there is
/// no ambient global state. Safe to share across fetch tasks behind an
/// `Arc`.
#[derive(Debug)]
pub struct Client<T> {
    transport: T,
    cache: Option<Arc<Cache>>,
    retry: RetryPolicy,
    page_size: u32,
    parse_ctx: ParseContext,
}

impl<T: Transport> Client<T> {
    /// Creates a client. `cache` of `None` disables caching entirely.
    #[must_use]
    pub fn new(transport: T, cache: Option<Arc<Cache>>, options: ClientOptions) -> Self {
        Self {
            transport,
            cache,
            retry: options.retry,
            page_size: options.page_size.max(1),
            parse_ctx: ParseContext {
                classifier: options.classifier,
                category_fields: options.category_fields,
            },
        }
    }

    /// Performs a GET with cache lookup and bounded retry.
    ///
    /// Auth failures (401/403) surface immediately without retrying;
    /// transient failures (429, 5xx, network) retry with jittered
    /// exponential backoff until the budget runs out.
    async fn get_json(
        &self,
        what: &str,
        path: &str,
        query: &[(String, String)],
        use_cache: bool,
    ) -> Result<serde_json::Value, JiraError> {
        let fingerprint = Fingerprint::for_request(path, query);
        if use_cache {
            if let Some(cache) = &self.cache {
                if let Some(body) = cache.get(&fingerprint) {
                    return Ok(body);
                }
            }
        }

        let mut attempt: u32 = 0;
        loop {
            let failure = match self.transport.get(path, query).await {
                Ok(reply) if reply.is_success() => {
                    let body: serde_json::Value = serde_json::from_str(&reply.body)
                        .map_err(|err| JiraError::InvalidResponse {
                            what: what.to_string(),
                            message: err.to_string(),
                        })?;
                    if use_cache {
                        if let Some(cache) = &self.cache {
                            cache.put(&fingerprint, &body);
                        }
                    }
                    return Ok(body);
                }
                Ok(reply) if reply.status == 401 || reply.status == 403 => {
                    return Err(JiraError::Auth {
                        status: reply.status,
                    });
                }
                Ok(reply) if is_transient_status(reply.status) => {
                    format!("status {}", reply.status)
                }
                Ok(reply) => {
                    return Err(JiraError::Fetch {
                        what: what.to_string(),
                        message: format!("status {}", reply.status),
                    });
                }
                Err(err) => err.to_string(),
            };

            if !self.retry.should_retry(attempt) {
                return Err(JiraError::Fetch {
                    what: what.to_string(),
                    message: format!("{failure} after {} attempts", attempt + 1),
                });
            }
            let delay = self.retry.delay_for(attempt);
            tracing::warn!(what, %failure, attempt, delay_ms = delay.as_millis(), "retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Checks the configured credentials against the `myself` endpoint.
    /// Never served from cache.
    pub async fn verify_credentials(&self) -> Result<(), JiraError> {
        self.get_json("credential check", "myself", &[], false)
            .await?;
        tracing::debug!("credentials verified");
        Ok(())
    }

    /// Lists all accessible project keys. Used when no allowlist is
    /// configured.
    pub async fn list_projects(&self) -> Result<Vec<ProjectKey>, JiraError> {
        let body = self.get_json("project list", "project", &[], true).await?;
        let projects: Vec<RawProject> =
            serde_json::from_value(body).map_err(|err| JiraError::InvalidResponse {
                what: "project list".to_string(),
                message: err.to_string(),
            })?;
        let keys: Vec<ProjectKey> = projects
            .into_iter()
            .filter_map(|p| ProjectKey::new(p.key).ok())
            .collect();
        tracing::info!(count = keys.len(), "projects discovered");
        Ok(keys)
    }

    /// Fetches one page of issues with worklogs in the date range.
    ///
    /// Returns the raw issues plus the next page cursor, or `None` when the
    /// result set is exhausted. Restartable from any cursor.
    pub async fn fetch_page(
        &self,
        project: &ProjectKey,
        range: &DateRange,
        start_at: u32,
    ) -> Result<(Vec<RawIssue>, Option<u32>), JiraError> {
        let jql = format!(
            "project = {project} AND worklogDate >= \"{}\" AND worklogDate <= \"{}\"",
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d"),
        );
        let query = vec![
            ("jql".to_string(), jql),
            ("fields".to_string(), SEARCH_FIELDS.to_string()),
            ("expand".to_string(), "worklog".to_string()),
            ("maxResults".to_string(), self.page_size.to_string()),
            ("startAt".to_string(), start_at.to_string()),
        ];

        let what = format!("issue search for {project}");
        let body = self.get_json(&what, "search/jql", &query, true).await?;
        let page: SearchResponse =
            serde_json::from_value(body).map_err(|err| JiraError::InvalidResponse {
                what: what.clone(),
                message: err.to_string(),
            })?;

        #[allow(clippy::cast_possible_truncation)]
        let batch = page.issues.len() as u32;
        let next = if batch > 0 && start_at + batch < page.total {
            Some(start_at + batch)
        } else {
            None
        };
        tracing::debug!(
            %project,
            fetched = start_at + batch,
            total = page.total,
            "search page received"
        );
        Ok((page.issues, next))
    }

    /// Fetches the complete worklog list for one issue, paginated.
    ///
    /// The search response embeds only the first chunk of worklogs; issues
    /// with more get their full list from the per-issue endpoint.
    async fn issue_worklogs(&self, issue_key: &str) -> Result<Vec<RawWorklog>, JiraError> {
        let path = format!("issue/{issue_key}/worklog");
        let what = format!("worklogs for {issue_key}");
        let mut worklogs = Vec::new();
        let mut start_at: u32 = 0;

        loop {
            let query = vec![
                ("startAt".to_string(), start_at.to_string()),
                ("maxResults".to_string(), self.page_size.to_string()),
            ];
            let body = self.get_json(&what, &path, &query, true).await?;
            let page: RawWorklogPage =
                serde_json::from_value(body).map_err(|err| JiraError::InvalidResponse {
                    what: what.clone(),
                    message: err.to_string(),
                })?;

            #[allow(clippy::cast_possible_truncation)]
            let batch = page.worklogs.len() as u32;
            worklogs.extend(page.worklogs);
            if batch == 0 || start_at + batch >= page.total {
                break;
            }
            start_at += batch;
        }

        tracing::debug!(issue = issue_key, count = worklogs.len(), "worklogs fetched");
        Ok(worklogs)
    }

    /// Drives full pagination for one project and parses every issue into
    /// classified entries.
    pub async fn fetch_project(
        &self,
        project: &ProjectKey,
        range: &DateRange,
    ) -> Result<Vec<WorkEntry>, JiraError> {
        let mut entries = Vec::new();
        let mut cursor = Some(0_u32);

        while let Some(start_at) = cursor {
            let (issues, next) = self.fetch_page(project, range, start_at).await?;
            for issue in &issues {
                let embedded = issue.fields.worklog.as_ref();
                let total = embedded.map_or(0, |page| page.total);
                #[allow(clippy::cast_possible_truncation)]
                let have = embedded.map_or(0, |page| page.worklogs.len() as u32);

                // The embedded list is complete for most issues; only
                // overflowing ones need the dedicated endpoint.
                let fetched: Vec<RawWorklog>;
                let worklogs: &[RawWorklog] = if total > have {
                    match self.issue_worklogs(&issue.key).await {
                        Ok(all) => {
                            fetched = all;
                            &fetched
                        }
                        Err(err) if err.is_fatal() => return Err(err),
                        Err(err) => {
                            tracing::warn!(
                                issue = %issue.key,
                                error = %err,
                                "falling back to embedded worklogs"
                            );
                            embedded.map_or(&[], |page| page.worklogs.as_slice())
                        }
                    }
                } else {
                    embedded.map_or(&[], |page| page.worklogs.as_slice())
                };

                entries.extend(entries_for_issue(issue, project, worklogs, &self.parse_ctx));
            }
            cursor = next;
        }

        tracing::info!(%project, entries = entries.len(), "project fetched");
        Ok(entries)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::transport::{TransportError, TransportReply};

    /// Scripted transport: per-path reply queues plus a total call counter.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        calls: AtomicUsize,
        replies: Mutex<HashMap<String, VecDeque<TransportReply>>>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn script(&self, path: &str, status: u16, body: &str) {
            self.replies
                .lock()
                .unwrap()
                .entry(path.to_string())
                .or_default()
                .push_back(TransportReply {
                    status,
                    body: body.to_string(),
                });
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for FakeTransport {
        async fn get(
            &self,
            path: &str,
            _query: &[(String, String)],
        ) -> Result<TransportReply, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.replies.lock().unwrap().get_mut(path).and_then(VecDeque::pop_front);
            reply.ok_or_else(|| TransportError(format!("no scripted reply for {path}")))
        }
    }

    pub(crate) fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: 0.0,
        }
    }

    fn options() -> ClientOptions {
        ClientOptions {
            retry: fast_retry(),
            page_size: 2,
            ..ClientOptions::default()
        }
    }

    fn search_body(issues: serde_json::Value, total: u32, start_at: u32) -> String {
        serde_json::json!({ "issues": issues, "total": total, "startAt": start_at }).to_string()
    }

    fn simple_issue(key: &str, hours: u32, started: &str) -> serde_json::Value {
        serde_json::json!({
            "key": key,
            "fields": {
                "components": [{"name": "HR"}],
                "issuetype": {"name": "Story"},
                "worklog": {
                    "total": 1,
                    "worklogs": [{
                        "author": {"accountId": "acc-1", "displayName": "John Doe"},
                        "timeSpentSeconds": hours * 3600,
                        "started": started
                    }]
                }
            }
        })
    }

    #[tokio::test]
    async fn fetch_page_follows_cursor_until_exhausted() {
        let transport = FakeTransport::new();
        transport.script(
            "search/jql",
            200,
            &search_body(
                serde_json::json!([
                    simple_issue("ERP-1", 1, "2025-09-03T10:00:00.000+0800"),
                    simple_issue("ERP-2", 2, "2025-09-10T10:00:00.000+0800"),
                ]),
                3,
                0,
            ),
        );
        transport.script(
            "search/jql",
            200,
            &search_body(
                serde_json::json!([simple_issue("ERP-3", 3, "2025-09-17T10:00:00.000+0800")]),
                3,
                2,
            ),
        );

        let client = Client::new(transport, None, options());
        let project = ProjectKey::new("ERP").unwrap();
        let range = DateRange::year(2025);

        let entries = client.fetch_project(&project, &range).await.unwrap();
        assert_eq!(entries.len(), 3);
        let total: f64 = entries.iter().map(|e| e.hours).sum();
        assert!((total - 6.0).abs() < 1e-9);
        assert_eq!(client.transport.calls(), 2);
    }

    #[tokio::test]
    async fn cached_fingerprint_hits_upstream_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(Cache::open(dir.path(), None).unwrap());

        let transport = FakeTransport::new();
        transport.script("search/jql", 200, &search_body(serde_json::json!([]), 0, 0));

        let client = Client::new(transport, Some(cache), options());
        let project = ProjectKey::new("ERP").unwrap();
        let range = DateRange::year(2025);

        client.fetch_page(&project, &range, 0).await.unwrap();
        client.fetch_page(&project, &range, 0).await.unwrap();
        assert_eq!(client.transport.calls(), 1);
    }

    #[tokio::test]
    async fn disabled_cache_hits_upstream_every_time() {
        let transport = FakeTransport::new();
        transport.script("search/jql", 200, &search_body(serde_json::json!([]), 0, 0));
        transport.script("search/jql", 200, &search_body(serde_json::json!([]), 0, 0));

        let client = Client::new(transport, None, options());
        let project = ProjectKey::new("ERP").unwrap();
        let range = DateRange::year(2025);

        client.fetch_page(&project, &range, 0).await.unwrap();
        client.fetch_page(&project, &range, 0).await.unwrap();
        assert_eq!(client.transport.calls(), 2);
    }

    #[tokio::test]
    async fn transient_failures_retry_then_succeed() {
        let transport = FakeTransport::new();
        transport.script("myself", 500, "oops");
        transport.script("myself", 503, "busy");
        transport.script("myself", 200, "{}");

        let client = Client::new(transport, None, options());
        client.verify_credentials().await.unwrap();
        assert_eq!(client.transport.calls(), 3);
    }

    #[tokio::test]
    async fn retry_budget_exhaustion_surfaces_fetch_error() {
        let transport = FakeTransport::new();
        for _ in 0..3 {
            transport.script("myself", 500, "oops");
        }

        let client = Client::new(transport, None, options());
        let err = client.verify_credentials().await.unwrap_err();
        assert!(matches!(err, JiraError::Fetch { .. }));
        assert_eq!(client.transport.calls(), 3); // max_attempts, no more
    }

    #[tokio::test]
    async fn auth_failure_is_immediate_and_fatal() {
        let transport = FakeTransport::new();
        transport.script("myself", 401, "unauthorized");
        transport.script("myself", 200, "{}"); // must never be reached

        let client = Client::new(transport, None, options());
        let err = client.verify_credentials().await.unwrap_err();
        assert!(matches!(err, JiraError::Auth { status: 401 }));
        assert!(err.is_fatal());
        assert_eq!(client.transport.calls(), 1);
    }

    #[tokio::test]
    async fn overflowing_worklogs_use_issue_endpoint() {
        let transport = FakeTransport::new();
        // Embedded page claims 3 worklogs but carries only 1
        let issue = serde_json::json!({
            "key": "ERP-9",
            "fields": {
                "issuetype": {"name": "Story"},
                "worklog": {
                    "total": 3,
                    "worklogs": [{
                        "timeSpentSeconds": 3600,
                        "started": "2025-02-01T09:00:00.000+0800"
                    }]
                }
            }
        });
        transport.script(
            "search/jql",
            200,
            &search_body(serde_json::json!([issue]), 1, 0),
        );
        transport.script(
            "issue/ERP-9/worklog",
            200,
            &serde_json::json!({
                "total": 3,
                "startAt": 0,
                "worklogs": [
                    {"timeSpentSeconds": 3600, "started": "2025-02-01T09:00:00.000+0800"},
                    {"timeSpentSeconds": 3600, "started": "2025-02-02T09:00:00.000+0800"},
                    {"timeSpentSeconds": 3600, "started": "2025-02-03T09:00:00.000+0800"}
                ]
            })
            .to_string(),
        );

        let client = Client::new(transport, None, options());
        let project = ProjectKey::new("ERP").unwrap();
        let entries = client
            .fetch_project(&project, &DateRange::year(2025))
            .await
            .unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn list_projects_parses_keys() {
        let transport = FakeTransport::new();
        transport.script(
            "project",
            200,
            &serde_json::json!([{"key": "ERP"}, {"key": "CRM"}]).to_string(),
        );

        let client = Client::new(transport, None, options());
        let keys = client.list_projects().await.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].as_str(), "ERP");
    }
}
