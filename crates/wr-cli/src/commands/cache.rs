//! Cache maintenance commands.

use std::io::Write;

use anyhow::{Context, Result};
use wr_cache::Cache;

use crate::Config;

pub fn clear<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let path = config.cache_path();
    if !path.exists() {
        writeln!(writer, "Cache is empty.")?;
        return Ok(());
    }

    let cache = Cache::open(&path, config.cache_ttl()).context("failed to open response cache")?;
    let removed = cache.clear().context("failed to clear response cache")?;
    writeln!(writer, "Removed {removed} cached responses.")?;
    Ok(())
}
