//! Report command: fetch, classify, aggregate, render.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use wr_cache::Cache;
use wr_core::{Granularity, ProjectKey, Report, aggregate};
use wr_jira::{Client, DateRange, FetchOptions, HttpTransport, Transport, fetch_all};

use crate::Config;

/// Resolved report parameters.
#[derive(Debug)]
pub struct ReportArgs {
    pub year: i32,
    pub granularity: Granularity,
    pub output: Option<PathBuf>,
    pub no_cache: bool,
}

pub async fn run(config: &Config, args: &ReportArgs) -> Result<()> {
    let transport = HttpTransport::new(&config.base_url, &config.username, &config.api_token)
        .context("invalid connection settings")?;

    let cache = if config.enable_cache && !args.no_cache {
        let cache = Cache::open(config.cache_path(), config.cache_ttl())
            .context("failed to open response cache")?;
        if let Some(oldest) = cache.oldest_entry_at() {
            eprintln!(
                "Note: responses cached since {} may be reused; pass --no-cache for fresh data.",
                oldest.format("%Y-%m-%d %H:%M UTC")
            );
        }
        Some(Arc::new(cache))
    } else {
        None
    };

    let client = Arc::new(Client::new(transport, cache, config.client_options()));
    client
        .verify_credentials()
        .await
        .context("credential check failed")?;

    let projects = resolve_projects(client.as_ref(), &config.project_keys).await?;
    let options = FetchOptions {
        max_workers: config.max_workers.max(1),
        deadline: config.fetch_deadline(),
    };
    let outcome = fetch_all(
        Arc::clone(&client),
        &projects,
        DateRange::year(args.year),
        &options,
    )
    .await?;

    if outcome.is_degraded() {
        eprintln!(
            "Warning: {} of {} projects failed; the report covers the rest:",
            outcome.failures.len(),
            projects.len()
        );
        for failure in &outcome.failures {
            eprintln!("  - {}: {}", failure.project, failure.error);
        }
    }

    let report = aggregate(&outcome.entries, args.year, args.granularity)
        .context("report totals failed the consistency check")?;
    if report.skipped_out_of_year > 0 {
        tracing::debug!(
            skipped = report.skipped_out_of_year,
            "worklogs outside the report year ignored"
        );
    }

    let csv = render_csv(&report);
    match &args.output {
        Some(path) => {
            std::fs::write(path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

/// Uses the configured allowlist when present, otherwise discovers every
/// accessible project.
async fn resolve_projects<T: Transport>(
    client: &Client<T>,
    allowlist: &[String],
) -> Result<Vec<ProjectKey>> {
    if allowlist.is_empty() {
        return Ok(client.list_projects().await?);
    }
    allowlist
        .iter()
        .map(|key| {
            ProjectKey::new(key.clone()).with_context(|| format!("invalid project key {key:?}"))
        })
        .collect()
}

/// Renders both report tables as one CSV document, blank-line separated.
fn render_csv(report: &Report) -> String {
    let mut out = String::new();
    for table in [&report.overview, &report.breakdown] {
        out.push_str(&csv_line(std::slice::from_ref(&table.title)));
        out.push('\n');
        for row in table.to_csv_rows() {
            out.push_str(&csv_line(&row));
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Joins fields into one CSV record, quoting where needed.
fn csv_line(fields: &[String]) -> String {
    let escaped: Vec<String> = fields
        .iter()
        .map(|field| {
            if field.contains(',') || field.contains('"') || field.contains('\n') {
                format!("\"{}\"", field.replace('"', "\"\""))
            } else {
                field.clone()
            }
        })
        .collect();
    escaped.join(",")
}
