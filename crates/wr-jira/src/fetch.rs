//! Fetch orchestration across projects.
//!
//! Fans one independent task per project out over a bounded tokio worker
//! pool. Each task drives full pagination through the client and fills a
//! private entry buffer; the awaiting caller merges buffers after the
//! tasks finish, so the cache is the only resource shared between tasks.
//!
//! A failing project degrades the run to partial results; it never aborts
//! its siblings. Only auth failures and every-project failure are fatal.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use wr_core::{ProjectKey, WorkEntry};

use crate::client::{Client, DateRange};
use crate::error::JiraError;
use crate::transport::Transport;

/// Run-fatal orchestration failures.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Credentials were rejected; the whole run halts.
    #[error(transparent)]
    Auth(JiraError),

    /// Every configured project failed; there is nothing to report on.
    #[error("all {count} projects failed to fetch")]
    AllProjectsFailed { count: usize },

    /// No projects were configured or discovered.
    #[error("no projects to fetch")]
    NoProjects,
}

/// One project that could not be fetched, preserved for the degraded-run
/// warning.
#[derive(Debug, Clone)]
pub struct ProjectFailure {
    pub project: ProjectKey,
    pub error: String,
}

/// Merged result of a fetch run: entries from every succeeding project
/// plus structured failure records for the rest.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub entries: Vec<WorkEntry>,
    pub failures: Vec<ProjectFailure>,
}

impl FetchOutcome {
    /// Whether some projects failed but the run still produced data.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Orchestrator tunables.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Worker pool size: how many projects fetch concurrently.
    pub max_workers: usize,

    /// Optional overall deadline. Projects still in flight when it expires
    /// are aborted and recorded as failures; finished projects keep their
    /// results.
    pub deadline: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_workers: 8,
            deadline: None,
        }
    }
}

/// Fetches every project's worklog entries through a bounded worker pool.
///
/// Entry order across projects is unspecified; aggregation downstream is
/// commutative so it does not matter.
pub async fn fetch_all<T: Transport>(
    client: Arc<Client<T>>,
    projects: &[ProjectKey],
    range: DateRange,
    options: &FetchOptions,
) -> Result<FetchOutcome, FetchError> {
    if projects.is_empty() {
        return Err(FetchError::NoProjects);
    }

    let semaphore = Arc::new(Semaphore::new(options.max_workers.max(1)));
    let mut tasks: JoinSet<(ProjectKey, Result<Vec<WorkEntry>, JiraError>)> = JoinSet::new();
    let mut pending: HashSet<ProjectKey> = projects.iter().cloned().collect();

    tracing::info!(
        projects = projects.len(),
        workers = options.max_workers,
        "fetching worklogs"
    );

    for project in projects {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        let project = project.clone();
        tasks.spawn(async move {
            // Closed only when the JoinSet is dropped, which also cancels us
            let Ok(_permit) = semaphore.acquire().await else {
                return (
                    project.clone(),
                    Err(JiraError::Fetch {
                        what: format!("project {project}"),
                        message: "worker pool shut down".to_string(),
                    }),
                );
            };
            let result = client.fetch_project(&project, &range).await;
            (project, result)
        });
    }

    let mut outcome = FetchOutcome::default();
    let drain = async {
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((project, Ok(entries))) => {
                    pending.remove(&project);
                    outcome.entries.extend(entries);
                }
                Ok((_project, Err(err))) if err.is_fatal() => {
                    return Err(FetchError::Auth(err));
                }
                Ok((project, Err(err))) => {
                    pending.remove(&project);
                    tracing::warn!(%project, error = %err, "project fetch failed");
                    outcome.failures.push(ProjectFailure {
                        project,
                        error: err.to_string(),
                    });
                }
                Err(join_err) => {
                    // Task panicked or was aborted; attribute it below via
                    // the pending set since the project name is lost here.
                    tracing::error!(error = %join_err, "fetch task did not complete");
                }
            }
        }
        Ok(())
    };

    let drain_result = match options.deadline {
        Some(deadline) => tokio::time::timeout(deadline, drain).await,
        None => Ok(drain.await),
    };

    match drain_result {
        Err(_elapsed) => {
            tasks.abort_all();
            // Tasks that finished before the deadline may still be queued
            // behind it; collect their results before writing off the rest.
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((project, Ok(entries))) => {
                        pending.remove(&project);
                        outcome.entries.extend(entries);
                    }
                    Ok((_project, Err(err))) if err.is_fatal() => {
                        return Err(FetchError::Auth(err));
                    }
                    Ok((project, Err(err))) => {
                        pending.remove(&project);
                        tracing::warn!(%project, error = %err, "project fetch failed");
                        outcome.failures.push(ProjectFailure {
                            project,
                            error: err.to_string(),
                        });
                    }
                    // Aborted mid-flight; attributed below via the pending set
                    Err(_join_err) => {}
                }
            }
            for project in pending.drain() {
                tracing::warn!(%project, "project aborted by overall deadline");
                outcome.failures.push(ProjectFailure {
                    project,
                    error: "aborted by overall fetch deadline".to_string(),
                });
            }
        }
        Ok(finished) => {
            finished?;
            // Panicked tasks leave their project in the pending set
            for project in pending.drain() {
                outcome.failures.push(ProjectFailure {
                    project,
                    error: "fetch task did not complete".to_string(),
                });
            }
        }
    }

    if outcome.failures.len() == projects.len() {
        return Err(FetchError::AllProjectsFailed {
            count: projects.len(),
        });
    }

    tracing::info!(
        entries = outcome.entries.len(),
        failed_projects = outcome.failures.len(),
        "fetch complete"
    );
    Ok(outcome)
}
