//! The classified worklog record consumed by aggregation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Contributor, IssueKey, ProjectKey, WorkType};

/// One logged unit of time against an issue, already classified.
///
/// Instances are produced by the upstream parser (one per worklog/component
/// pair) and folded exactly once by the aggregator. They are immutable after
/// construction and do not outlive a single report run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkEntry {
    /// Upstream-unique key of the parent issue.
    pub issue_key: IssueKey,

    /// Project the issue belongs to.
    pub project_key: ProjectKey,

    /// Component the issue is tagged with, if any.
    ///
    /// `None` entries are grouped under the "Unassigned" sentinel component
    /// during aggregation.
    pub component: Option<String>,

    /// Who logged the time.
    pub contributor: Contributor,

    /// Logged duration in hours. Non-negative; zero-hour entries are valid
    /// and still counted by the aggregator.
    pub hours: f64,

    /// Calendar date the time was logged on. All bucketing derives from
    /// this date alone.
    pub logged_on: NaiveDate,

    /// Classification assigned at parse time. Never absent.
    pub work_type: WorkType,
}

impl WorkEntry {
    /// The component name used for grouping, falling back to the sentinel.
    #[must_use]
    pub fn component_name(&self) -> &str {
        self.component
            .as_deref()
            .unwrap_or(crate::types::UNASSIGNED_COMPONENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UNASSIGNED_COMPONENT;

    fn entry(component: Option<&str>) -> WorkEntry {
        WorkEntry {
            issue_key: IssueKey::new("ERP-1").unwrap(),
            project_key: ProjectKey::new("ERP").unwrap(),
            component: component.map(String::from),
            contributor: Contributor::named("John Doe"),
            hours: 1.5,
            logged_on: NaiveDate::from_ymd_opt(2025, 9, 3).unwrap(),
            work_type: WorkType::Development,
        }
    }

    #[test]
    fn component_name_uses_sentinel_when_absent() {
        assert_eq!(entry(Some("HR")).component_name(), "HR");
        assert_eq!(entry(None).component_name(), UNASSIGNED_COMPONENT);
    }
}
