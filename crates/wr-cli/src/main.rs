use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wr_cli::commands::{cache, projects, report};
use wr_cli::{CacheAction, Cli, Commands, Config, granularity_from_flags};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    match &cli.command {
        Some(Commands::Report {
            year,
            yearly,
            quarterly,
            monthly,
            weekly,
            output,
            no_cache,
        }) => {
            let args = report::ReportArgs {
                year: year.unwrap_or_else(|| chrono::Utc::now().year()),
                granularity: granularity_from_flags(*yearly, *quarterly, *monthly, *weekly),
                output: output.clone(),
                no_cache: *no_cache,
            };
            report::run(&config, &args).await?;
        }
        Some(Commands::Projects) => {
            projects::run(&mut std::io::stdout(), &config).await?;
        }
        Some(Commands::Cache { action }) => match action {
            CacheAction::Clear => cache::clear(&mut std::io::stdout(), &config)?,
        },
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
