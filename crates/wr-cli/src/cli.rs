//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wr_core::Granularity;

/// Jira worklog reporter.
///
/// Pulls worklogs for the configured projects, classifies them into
/// development and maintenance work, and renders spreadsheet-shaped CSV
/// reports.
#[derive(Debug, Parser)]
#[command(name = "wr", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate the worklog report for a year.
    Report {
        /// Report year (defaults to the current year).
        #[arg(long)]
        year: Option<i32>,

        /// One column for the whole year.
        #[arg(long, group = "granularity")]
        yearly: bool,

        /// One column per quarter.
        #[arg(long, group = "granularity")]
        quarterly: bool,

        /// One column per month.
        #[arg(long, group = "granularity")]
        monthly: bool,

        /// One column per week of each month (the default).
        #[arg(long, group = "granularity")]
        weekly: bool,

        /// Write CSV to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Bypass the response cache for this run.
        #[arg(long)]
        no_cache: bool,
    },

    /// List the projects the configured credentials can see.
    Projects,

    /// Response cache maintenance.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache maintenance actions.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Delete every cached response.
    Clear,
}

/// Resolves the mutually-exclusive granularity flags, defaulting to weekly.
#[must_use]
pub fn granularity_from_flags(
    yearly: bool,
    quarterly: bool,
    monthly: bool,
    _weekly: bool,
) -> Granularity {
    if yearly {
        Granularity::Yearly
    } else if quarterly {
        Granularity::Quarterly
    } else if monthly {
        Granularity::Monthly
    } else {
        Granularity::Weekly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_is_the_default_granularity() {
        assert_eq!(
            granularity_from_flags(false, false, false, false),
            Granularity::Weekly
        );
        assert_eq!(
            granularity_from_flags(false, true, false, false),
            Granularity::Quarterly
        );
    }

    #[test]
    fn cli_parses_report_flags() {
        let cli = Cli::parse_from(["wr", "report", "--year", "2025", "--monthly", "--no-cache"]);
        match cli.command {
            Some(Commands::Report {
                year,
                monthly,
                no_cache,
                ..
            }) => {
                assert_eq!(year, Some(2025));
                assert!(monthly);
                assert!(no_cache);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn granularity_flags_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["wr", "report", "--yearly", "--weekly"]).is_err());
    }
}
