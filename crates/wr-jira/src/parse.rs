//! Converts raw issues into classified [`WorkEntry`] records.
//!
//! The categorization custom field is resolved here, exactly once per
//! issue; downstream code only ever sees the fixed [`WorkType`] enum.

use chrono::NaiveDate;
use wr_core::{Contributor, IssueCategorization, IssueKey, ProjectKey, WorkEntry, classify};

use crate::api::{RawFields, RawIssue, RawWorklog};
use crate::client::ParseContext;

/// Extracts a string from the two shapes Jira uses for option-style custom
/// fields: `{"value": "..."}` or a bare string.
fn field_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("value")
            .and_then(serde_json::Value::as_str)
            .map(String::from),
        _ => None,
    }
}

/// Resolves the categorization field from the configured candidates.
///
/// The first candidate holding a recognized category wins; failing that,
/// the first candidate with any value is kept so the classifier can fall
/// through deliberately.
fn resolve_category(fields: &RawFields, candidates: &[String]) -> Option<String> {
    let values: Vec<String> = candidates
        .iter()
        .filter_map(|id| fields.extra.get(id).and_then(field_value))
        .filter(|v| !v.is_empty())
        .collect();

    values
        .iter()
        .find(|v| {
            let v = v.to_lowercase();
            v.contains("maintenance") || v.contains("development")
        })
        .or_else(|| values.first())
        .cloned()
}

/// Builds the classification input for an issue.
pub(crate) fn categorization(fields: &RawFields, candidates: &[String]) -> IssueCategorization {
    IssueCategorization {
        category: resolve_category(fields, candidates),
        issue_type: fields
            .issuetype
            .as_ref()
            .map(|t| t.name.clone())
            .unwrap_or_default(),
        labels: fields.labels.clone(),
    }
}

/// Parses a worklog `started` timestamp down to its calendar date.
///
/// Jira emits `2025-09-03T10:15:30.000+0800`; the date in the author's own
/// offset is what the report buckets on, so no timezone conversion happens.
fn parse_started_date(started: &str) -> Option<NaiveDate> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(started) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_str(started, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.date_naive());
    }
    // Last resort: the leading YYYY-MM-DD
    started
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

fn contributor(worklog: &RawWorklog) -> Contributor {
    worklog.author.as_ref().map_or_else(
        || Contributor::named("Unknown"),
        |author| Contributor {
            account_id: author.account_id.clone(),
            display_name: author
                .display_name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            active: author.active.unwrap_or(true),
        },
    )
}

/// Expands one issue into entries: one per (worklog, component) pair.
///
/// Issues without components yield entries with `component = None`, grouped
/// later under the "Unassigned" sentinel. Malformed worklogs are skipped
/// with a warning rather than failing the issue.
pub(crate) fn entries_for_issue(
    issue: &RawIssue,
    project: &ProjectKey,
    worklogs: &[RawWorklog],
    ctx: &ParseContext,
) -> Vec<WorkEntry> {
    let Ok(issue_key) = IssueKey::new(issue.key.clone()) else {
        tracing::warn!(project = %project, "issue with empty key skipped");
        return Vec::new();
    };

    let cat = categorization(&issue.fields, &ctx.category_fields);
    let work_type = classify(&cat, &ctx.classifier);

    let components: Vec<Option<String>> = if issue.fields.components.is_empty() {
        vec![None]
    } else {
        issue
            .fields
            .components
            .iter()
            .map(|c| Some(c.name.clone()))
            .collect()
    };

    let mut entries = Vec::new();
    for worklog in worklogs {
        let Some(logged_on) = parse_started_date(&worklog.started) else {
            tracing::warn!(
                issue = %issue_key,
                started = %worklog.started,
                "worklog with unparseable date skipped"
            );
            continue;
        };
        if worklog.time_spent_seconds < 0 {
            tracing::warn!(
                issue = %issue_key,
                seconds = worklog.time_spent_seconds,
                "worklog with negative duration skipped"
            );
            continue;
        }

        #[allow(clippy::cast_precision_loss)]
        let hours = worklog.time_spent_seconds as f64 / 3600.0;
        let contributor = contributor(worklog);

        for component in &components {
            entries.push(WorkEntry {
                issue_key: issue_key.clone(),
                project_key: project.clone(),
                component: component.clone(),
                contributor: contributor.clone(),
                hours,
                logged_on,
                work_type,
            });
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use wr_core::{ClassifierConfig, WorkType};

    use super::*;

    fn ctx() -> ParseContext {
        ParseContext {
            classifier: ClassifierConfig::default(),
            category_fields: vec!["customfield_10082".to_string()],
        }
    }

    fn issue(raw: serde_json::Value) -> RawIssue {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn parse_started_date_accepts_jira_offsets() {
        assert_eq!(
            parse_started_date("2025-09-03T10:15:30.000+0800"),
            NaiveDate::from_ymd_opt(2025, 9, 3)
        );
        assert_eq!(
            parse_started_date("2025-09-03T10:15:30.000+08:00"),
            NaiveDate::from_ymd_opt(2025, 9, 3)
        );
        assert_eq!(
            parse_started_date("2025-09-03T23:59:59Z"),
            NaiveDate::from_ymd_opt(2025, 9, 3)
        );
        assert!(parse_started_date("garbage").is_none());
    }

    #[test]
    fn field_value_handles_both_shapes() {
        assert_eq!(
            field_value(&serde_json::json!({"value": "Maintenance"})),
            Some("Maintenance".to_string())
        );
        assert_eq!(
            field_value(&serde_json::json!("Development")),
            Some("Development".to_string())
        );
        assert_eq!(field_value(&serde_json::json!(42)), None);
    }

    #[test]
    fn category_field_drives_classification() {
        let raw = issue(serde_json::json!({
            "key": "ERP-1",
            "fields": {
                "issuetype": {"name": "Story"},
                "customfield_10082": {"value": "Maintenance"},
            }
        }));
        let project = ProjectKey::new("ERP").unwrap();
        let worklogs = vec![RawWorklog {
            author: None,
            time_spent_seconds: 3600,
            started: "2025-09-03T10:00:00.000+0800".to_string(),
        }];
        let entries = entries_for_issue(&raw, &project, &worklogs, &ctx());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].work_type, WorkType::Maintenance);
        assert!(entries[0].component.is_none());
    }

    #[test]
    fn issue_expands_per_component_and_worklog() {
        let raw = issue(serde_json::json!({
            "key": "ERP-2",
            "fields": {
                "components": [{"name": "HR"}, {"name": "Recruitment"}],
                "issuetype": {"name": "Story"},
            }
        }));
        let project = ProjectKey::new("ERP").unwrap();
        let worklogs = vec![
            RawWorklog {
                author: None,
                time_spent_seconds: 3600,
                started: "2025-09-03T10:00:00.000+0800".to_string(),
            },
            RawWorklog {
                author: None,
                time_spent_seconds: 1800,
                started: "2025-09-10T10:00:00.000+0800".to_string(),
            },
        ];
        let entries = entries_for_issue(&raw, &project, &worklogs, &ctx());
        assert_eq!(entries.len(), 4); // 2 worklogs x 2 components
        assert!((entries[0].hours - 1.0).abs() < 1e-9);
        assert!((entries[2].hours - 0.5).abs() < 1e-9);
    }

    #[test]
    fn malformed_worklogs_are_skipped_not_fatal() {
        let raw = issue(serde_json::json!({
            "key": "ERP-3",
            "fields": {"issuetype": {"name": "Story"}}
        }));
        let project = ProjectKey::new("ERP").unwrap();
        let worklogs = vec![
            RawWorklog {
                author: None,
                time_spent_seconds: 3600,
                started: "not-a-date".to_string(),
            },
            RawWorklog {
                author: None,
                time_spent_seconds: -5,
                started: "2025-09-03T10:00:00.000+0800".to_string(),
            },
            RawWorklog {
                author: None,
                time_spent_seconds: 0,
                started: "2025-09-04T10:00:00.000+0800".to_string(),
            },
        ];
        let entries = entries_for_issue(&raw, &project, &worklogs, &ctx());
        // Bad date and negative duration dropped; zero-hour entry kept
        assert_eq!(entries.len(), 1);
        assert!(entries[0].hours.abs() < 1e-9);
    }

    #[test]
    fn contributor_defaults_active_true() {
        let worklog = RawWorklog {
            author: Some(crate::api::RawAuthor {
                account_id: Some("acc-1".to_string()),
                display_name: Some("John Doe".to_string()),
                active: None,
            }),
            time_spent_seconds: 60,
            started: "2025-01-01T00:00:00Z".to_string(),
        };
        let parsed = contributor(&worklog);
        assert!(parsed.active);
        assert_eq!(parsed.display_name, "John Doe");
    }
}
