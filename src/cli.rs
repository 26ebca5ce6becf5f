// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `opguard`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "opguard",
    version,
    about = "Apply a plan of file operations as one transaction, rolling back on failure.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML).
    ///
    /// Default: `Opguard.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Opguard.toml")]
    pub plan: String,

    /// Log what would happen instead of touching the filesystem.
    ///
    /// Also enabled by `[config].dry_run` or `OPGUARD_DRY_RUN=1`.
    #[arg(long)]
    pub dry_run: bool,

    /// Parse + validate, print the plan, but don't execute anything.
    #[arg(long)]
    pub check: bool,

    /// Show full error details on failure.
    #[arg(long)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `OPGUARD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
