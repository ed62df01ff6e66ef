//! Multi-dimensional worklog aggregation.
//!
//! Folds classified entries into the report model keyed by (project,
//! component, contributor, work type, time bucket). The fold is commutative
//! and associative over entry order, so it runs as a rayon parallel
//! fold/reduce and is insensitive to fetch-task completion order.
//!
//! Before finalizing, the aggregator re-derives every row's yearly total
//! from an independent fold and checks it against the sum of the row's fine
//! buckets. A mismatch means a bucketing defect and surfaces as
//! [`ConsistencyError`] instead of a silently wrong report.

use std::collections::{BTreeSet, HashMap};

use chrono::Datelike;
use rayon::prelude::*;
use thiserror::Error;

use crate::bucket::{Bucket, Granularity, buckets_for_year};
use crate::entry::WorkEntry;
use crate::report::{Report, Table};
use crate::types::{ProjectKey, WorkType};

/// Tolerance for comparing summed hours across folds.
const HOURS_EPSILON: f64 = 1e-6;

/// Internal aggregation-invariant violation. Fatal; indicates a bucketing
/// or folding bug, never bad input data.
#[derive(Debug, Error, Clone, PartialEq)]
#[error(
    "aggregation inconsistency for {project}/{component}/{work_type}: \
     fine buckets sum to {bucket_sum} but yearly fold gives {year_total}"
)]
pub struct ConsistencyError {
    pub project: String,
    pub component: String,
    pub work_type: WorkType,
    pub bucket_sum: f64,
    pub year_total: f64,
}

/// Full aggregation key for one accumulator cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AggregationKey {
    project: ProjectKey,
    component: String,
    contributor_identity: String,
    contributor_name: String,
    work_type: WorkType,
    bucket: Bucket,
}

impl AggregationKey {
    fn for_entry(entry: &WorkEntry, bucket: Bucket) -> Self {
        Self {
            project: entry.project_key.clone(),
            component: entry.component_name().to_string(),
            contributor_identity: entry.contributor.identity().to_string(),
            contributor_name: entry.contributor.display_name.clone(),
            work_type: entry.work_type,
            bucket,
        }
    }
}

/// Mutable accumulator owned by a single aggregation run.
type ReportAccumulator = HashMap<AggregationKey, f64>;

fn merge(mut left: ReportAccumulator, right: ReportAccumulator) -> ReportAccumulator {
    for (key, hours) in right {
        *left.entry(key).or_insert(0.0) += hours;
    }
    left
}

/// Folds entries for `year` into an accumulator at `granularity`.
///
/// Zero-hour entries are folded (they materialize their row with 0 hours);
/// entries outside the year are skipped by the caller's filter.
fn fold(entries: &[WorkEntry], year: i32, granularity: Granularity) -> ReportAccumulator {
    entries
        .par_iter()
        .filter(|entry| entry.logged_on.year() == year)
        .fold(HashMap::new, |mut acc: ReportAccumulator, entry| {
            let bucket = Bucket::for_date(entry.logged_on, granularity);
            let key = AggregationKey::for_entry(entry, bucket);
            *acc.entry(key).or_insert(0.0) += entry.hours;
            acc
        })
        .reduce(HashMap::new, merge)
}

/// Verifies that each row's fine buckets sum to its independently computed
/// yearly total.
fn check_consistency(
    fine: &ReportAccumulator,
    yearly: &ReportAccumulator,
) -> Result<(), ConsistencyError> {
    // Collapse both accumulators to (project, component, work_type) rows.
    let mut fine_rows: HashMap<(String, String, WorkType), f64> = HashMap::new();
    for (key, hours) in fine {
        *fine_rows
            .entry((
                key.project.to_string(),
                key.component.clone(),
                key.work_type,
            ))
            .or_insert(0.0) += hours;
    }

    let mut year_rows: HashMap<(String, String, WorkType), f64> = HashMap::new();
    for (key, hours) in yearly {
        *year_rows
            .entry((
                key.project.to_string(),
                key.component.clone(),
                key.work_type,
            ))
            .or_insert(0.0) += hours;
    }

    for (row, &year_total) in &year_rows {
        let bucket_sum = fine_rows.get(row).copied().unwrap_or(0.0);
        if (bucket_sum - year_total).abs() > HOURS_EPSILON {
            return Err(ConsistencyError {
                project: row.0.clone(),
                component: row.1.clone(),
                work_type: row.2,
                bucket_sum,
                year_total,
            });
        }
    }
    Ok(())
}

/// Aggregates classified entries into a [`Report`] for one year.
///
/// Entries dated outside `year` are excluded without erroring; their count
/// is recorded on the report. The returned report is complete or not
/// produced at all.
pub fn aggregate(
    entries: &[WorkEntry],
    year: i32,
    granularity: Granularity,
) -> Result<Report, ConsistencyError> {
    let skipped_out_of_year = entries
        .iter()
        .filter(|entry| entry.logged_on.year() != year)
        .count();
    if skipped_out_of_year > 0 {
        tracing::debug!(
            skipped = skipped_out_of_year,
            year,
            "entries outside report year excluded"
        );
    }

    let fine = fold(entries, year, granularity);
    let yearly = if granularity == Granularity::Yearly {
        fine.clone()
    } else {
        fold(entries, year, Granularity::Yearly)
    };
    check_consistency(&fine, &yearly)?;

    let overview = build_overview(&yearly);
    let breakdown = build_breakdown(&fine, year, granularity);

    tracing::debug!(
        rows = overview.rows.len(),
        total_hours = overview.grand_total(),
        %granularity,
        "report aggregated"
    );

    Ok(Report {
        year,
        granularity,
        overview,
        breakdown,
        skipped_out_of_year,
    })
}

/// Flat table: rows = (project, component), columns = contributor names.
fn build_overview(yearly: &ReportAccumulator) -> Table {
    let contributors: BTreeSet<String> = yearly
        .keys()
        .map(|key| key.contributor_name.clone())
        .collect();
    let contributors: Vec<String> = contributors.into_iter().collect();

    let mut cells: HashMap<(String, String), Vec<f64>> = HashMap::new();
    for (key, &hours) in yearly {
        let row_key = (key.project.to_string(), key.component.clone());
        let row = cells
            .entry(row_key)
            .or_insert_with(|| vec![0.0; contributors.len()]);
        // Column lookup is by sorted position; contributors is sorted and deduped.
        if let Ok(idx) = contributors.binary_search(&key.contributor_name) {
            row[idx] += hours;
        }
    }

    let mut rows: Vec<(Vec<String>, Vec<f64>)> = cells
        .into_iter()
        .map(|((project, component), values)| (vec![project, component], values))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    Table::build(
        "Team Overview",
        vec!["Project".to_string(), "Component".to_string()],
        contributors,
        rows,
    )
}

/// Breakdown table: rows = (project, component, work type), columns = the
/// full ordered bucket set for the year.
fn build_breakdown(fine: &ReportAccumulator, year: i32, granularity: Granularity) -> Table {
    let buckets = buckets_for_year(year, granularity);
    let bucket_index: HashMap<Bucket, usize> = buckets
        .iter()
        .enumerate()
        .map(|(idx, &bucket)| (bucket, idx))
        .collect();

    let mut cells: HashMap<(String, String, WorkType), Vec<f64>> = HashMap::new();
    for (key, &hours) in fine {
        let row_key = (
            key.project.to_string(),
            key.component.clone(),
            key.work_type,
        );
        let row = cells
            .entry(row_key)
            .or_insert_with(|| vec![0.0; buckets.len()]);
        if let Some(&idx) = bucket_index.get(&key.bucket) {
            row[idx] += hours;
        }
    }

    let mut rows: Vec<((String, String, WorkType), Vec<f64>)> = cells.into_iter().collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let rows = rows
        .into_iter()
        .map(|((project, component, work_type), values)| {
            (
                vec![project, component, work_type.to_string()],
                values,
            )
        })
        .collect();

    Table::build(
        format!("{granularity} breakdown"),
        vec![
            "Project".to_string(),
            "Component".to_string(),
            "Work Type".to_string(),
        ],
        buckets.iter().map(Bucket::label).collect(),
        rows,
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::{Contributor, IssueKey};

    fn entry(
        project: &str,
        component: Option<&str>,
        name: &str,
        date: (i32, u32, u32),
        hours: f64,
        work_type: WorkType,
    ) -> WorkEntry {
        WorkEntry {
            issue_key: IssueKey::new(format!("{project}-1")).unwrap(),
            project_key: ProjectKey::new(project).unwrap(),
            component: component.map(String::from),
            contributor: Contributor::named(name),
            hours,
            logged_on: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            work_type,
        }
    }

    fn sample_entries() -> Vec<WorkEntry> {
        vec![
            entry(
                "ERP",
                Some("HR"),
                "John Doe",
                (2025, 9, 3),
                4.0,
                WorkType::Development,
            ),
            entry(
                "ERP",
                Some("HR"),
                "John Doe",
                (2025, 9, 10),
                2.0,
                WorkType::Development,
            ),
            entry(
                "ERP",
                Some("Recruitment"),
                "Jane Smith",
                (2025, 9, 2),
                8.0,
                WorkType::Development,
            ),
        ]
    }

    fn find_row<'a>(table: &'a Table, labels: &[&str]) -> &'a crate::report::Row {
        table
            .rows
            .iter()
            .find(|row| row.labels.iter().map(String::as_str).eq(labels.iter().copied()))
            .unwrap_or_else(|| panic!("no row {labels:?}"))
    }

    #[test]
    fn yearly_overview_matches_expected_rows() {
        let report = aggregate(&sample_entries(), 2025, Granularity::Yearly).unwrap();
        let overview = &report.overview;
        assert_eq!(overview.columns, vec!["Jane Smith", "John Doe"]);

        let hr = find_row(overview, &["ERP", "HR"]);
        assert!((hr.cells[1] - 6.0).abs() < 1e-9);
        assert!((hr.cells[0]).abs() < 1e-9);
        assert!((hr.total - 6.0).abs() < 1e-9);

        let recruitment = find_row(overview, &["ERP", "Recruitment"]);
        assert!((recruitment.cells[0] - 8.0).abs() < 1e-9);
        assert!((recruitment.total - 8.0).abs() < 1e-9);
    }

    #[test]
    fn weekly_breakdown_buckets_september() {
        let report = aggregate(&sample_entries(), 2025, Granularity::Weekly).unwrap();
        let breakdown = &report.breakdown;

        let sep_w1 = breakdown.columns.iter().position(|c| c == "SepW1").unwrap();
        let sep_w2 = breakdown.columns.iter().position(|c| c == "SepW2").unwrap();

        let hr = find_row(breakdown, &["ERP", "HR", "Development"]);
        assert!((hr.cells[sep_w1] - 4.0).abs() < 1e-9);
        assert!((hr.cells[sep_w2] - 2.0).abs() < 1e-9);
        assert!((hr.total - 6.0).abs() < 1e-9);
    }

    #[test]
    fn cross_granularity_totals_agree() {
        let entries = sample_entries();
        let yearly = aggregate(&entries, 2025, Granularity::Yearly).unwrap();
        for granularity in [
            Granularity::Quarterly,
            Granularity::Monthly,
            Granularity::Weekly,
        ] {
            let report = aggregate(&entries, 2025, granularity).unwrap();
            assert!(
                (report.breakdown.grand_total() - yearly.breakdown.grand_total()).abs() < 1e-9,
                "{granularity} grand total diverged"
            );
        }
    }

    #[test]
    fn missing_component_grouped_under_unassigned() {
        let entries = vec![entry(
            "ERP",
            None,
            "John Doe",
            (2025, 3, 1),
            1.0,
            WorkType::Development,
        )];
        let report = aggregate(&entries, 2025, Granularity::Monthly).unwrap();
        let row = find_row(&report.overview, &["ERP", "Unassigned"]);
        assert!((row.total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_hour_entries_are_kept() {
        let entries = vec![entry(
            "ERP",
            Some("HR"),
            "John Doe",
            (2025, 1, 5),
            0.0,
            WorkType::Development,
        )];
        let report = aggregate(&entries, 2025, Granularity::Yearly).unwrap();
        // The row materializes with zero hours rather than being dropped
        let row = find_row(&report.overview, &["ERP", "HR"]);
        assert!(row.total.abs() < 1e-9);
    }

    #[test]
    fn out_of_year_entries_are_excluded_not_errors() {
        let mut entries = sample_entries();
        entries.push(entry(
            "ERP",
            Some("HR"),
            "John Doe",
            (2024, 12, 31),
            100.0,
            WorkType::Development,
        ));
        let report = aggregate(&entries, 2025, Granularity::Monthly).unwrap();
        assert_eq!(report.skipped_out_of_year, 1);
        assert!((report.overview.grand_total() - 14.0).abs() < 1e-9);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let mut entries = sample_entries();
        let forward = aggregate(&entries, 2025, Granularity::Weekly).unwrap();
        entries.reverse();
        let backward = aggregate(&entries, 2025, Granularity::Weekly).unwrap();
        assert_eq!(forward.breakdown.rows, backward.breakdown.rows);
        assert_eq!(forward.overview.rows, backward.overview.rows);
    }

    #[test]
    fn work_types_form_separate_breakdown_rows() {
        let entries = vec![
            entry(
                "ERP",
                Some("HR"),
                "John Doe",
                (2025, 5, 2),
                3.0,
                WorkType::Development,
            ),
            entry(
                "ERP",
                Some("HR"),
                "John Doe",
                (2025, 5, 9),
                1.0,
                WorkType::Maintenance,
            ),
        ];
        let report = aggregate(&entries, 2025, Granularity::Quarterly).unwrap();
        let dev = find_row(&report.breakdown, &["ERP", "HR", "Development"]);
        let maint = find_row(&report.breakdown, &["ERP", "HR", "Maintenance"]);
        assert!((dev.total - 3.0).abs() < 1e-9);
        assert!((maint.total - 1.0).abs() < 1e-9);
        // Overview collapses work types into one row
        let overview_row = find_row(&report.overview, &["ERP", "HR"]);
        assert!((overview_row.total - 4.0).abs() < 1e-9);
    }
}
