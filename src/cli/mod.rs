//! CLI module for atencion
//!
//! This module contains the CLI command handlers and logging setup.

mod commands;
mod logging;

pub use commands::run_command;
pub use logging::{init_logging, log_file_path, LogLevel};

// Re-export Cli from config for convenience
pub use crate::config::Cli;
