//! Worklog reporter CLI library.
//!
//! This crate provides the CLI interface for the worklog reporter.

mod cli;
pub mod commands;
mod config;

pub use cli::{CacheAction, Cli, Commands, granularity_from_flags};
pub use config::Config;
