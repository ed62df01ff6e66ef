//! CLI subcommand implementations.

pub mod cache;
pub mod projects;
pub mod report;
