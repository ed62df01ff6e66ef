//! Projects command: list what the configured credentials can see.

use std::io::Write;

use anyhow::{Context, Result};
use wr_jira::{Client, HttpTransport};

use crate::Config;

pub async fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let transport = HttpTransport::new(&config.base_url, &config.username, &config.api_token)
        .context("invalid connection settings")?;
    let client = Client::new(transport, None, config.client_options());

    client
        .verify_credentials()
        .await
        .context("credential check failed")?;
    let mut projects = client.list_projects().await?;
    projects.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));

    if projects.is_empty() {
        writeln!(writer, "No accessible projects.")?;
        return Ok(());
    }
    for project in projects {
        writeln!(writer, "{project}")?;
    }
    Ok(())
}
