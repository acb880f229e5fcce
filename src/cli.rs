// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `sitewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitewatch",
    version,
    about = "Rebuild and live-reload a static site when its sources change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Sitewatch.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Sitewatch.toml")]
    pub config: String,

    /// Run the startup recipe once and exit, no watching.
    #[arg(long)]
    pub once: bool,

    /// Recipe to run at startup, instead of `[config].startup`.
    #[arg(long, value_name = "NAME")]
    pub recipe: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print tasks, recipes and watch rules, but don't
    /// execute anything.
    #[arg(long)]
    pub dry_run: bool,
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
