//! Core domain logic for the worklog reporter.
//!
//! This crate contains the fundamental types and logic for:
//! - Classification: assigning each worklog entry a work type
//! - Bucketing: mapping calendar dates to report time buckets
//! - Aggregation: folding entries into the multi-dimensional report model

pub mod aggregate;
pub mod bucket;
pub mod classify;
pub mod entry;
pub mod report;
pub mod types;

pub use aggregate::{ConsistencyError, aggregate};
pub use bucket::{Bucket, Granularity};
pub use classify::{ClassifierConfig, IssueCategorization, classify};
pub use entry::WorkEntry;
pub use report::{Report, Row, Table};
pub use types::{Contributor, IssueKey, ProjectKey, UNASSIGNED_COMPONENT, WorkType};
