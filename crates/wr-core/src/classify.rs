//! Work-type classification.
//!
//! Classification is a pure function of the issue metadata attached to an
//! entry: the categorization custom field when it holds a recognized value,
//! otherwise a fallback over the issue type name and label set. It never
//! fails; anything unrecognized is Development.

use serde::{Deserialize, Serialize};

use crate::types::WorkType;

/// Term sets driving the fallback classification rule.
///
/// The exact terms are site-specific configuration, not a fixed contract.
/// Matching is case-insensitive; issue types and labels match on substring
/// containment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Issue type names indicating maintenance work.
    pub maintenance_types: Vec<String>,

    /// Label terms indicating maintenance work.
    pub maintenance_labels: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            maintenance_types: ["bug", "hotfix", "support", "incident", "defect"]
                .map(String::from)
                .to_vec(),
            maintenance_labels: ["maintenance", "bugfix", "hotfix", "support", "patch"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Issue metadata relevant to classification.
///
/// The categorization field is resolved from the raw payload once at parse
/// time; classification never reaches back into untyped JSON.
#[derive(Debug, Clone, Default)]
pub struct IssueCategorization {
    /// Value of the categorization custom field, if the issue has one.
    pub category: Option<String>,

    /// The issue type name (e.g., "Bug", "Story").
    pub issue_type: String,

    /// Labels attached to the issue.
    pub labels: Vec<String>,
}

/// Assigns a work type to an issue.
///
/// Primary rule: a categorization field value containing "maintenance" or
/// "development" decides directly. Fallback: a maintenance-indicating issue
/// type or label classifies as Maintenance. Everything else is Development.
#[must_use]
pub fn classify(cat: &IssueCategorization, config: &ClassifierConfig) -> WorkType {
    if let Some(category) = &cat.category {
        let category = category.to_lowercase();
        if category.contains("maintenance") {
            return WorkType::Maintenance;
        }
        if category.contains("development") {
            return WorkType::Development;
        }
    }

    let issue_type = cat.issue_type.to_lowercase();
    if config
        .maintenance_types
        .iter()
        .any(|term| issue_type.contains(&term.to_lowercase()))
    {
        return WorkType::Maintenance;
    }

    let labels: Vec<String> = cat.labels.iter().map(|l| l.to_lowercase()).collect();
    if labels.iter().any(|label| {
        config
            .maintenance_labels
            .iter()
            .any(|term| label.contains(&term.to_lowercase()))
    }) {
        return WorkType::Maintenance;
    }

    WorkType::Development
}
