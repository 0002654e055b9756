// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `virtmod`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "virtmod",
    version,
    about = "Produce virtual modules from generator files and keep them fresh.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plugin config file (TOML).
    ///
    /// Default: `Virtmod.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Build mode: produce every module once, no watching.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `VIRTMOD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate config, report which ids are virtual, produce nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Module ids to produce, e.g. `data/authors.toml?virtual-module`.
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
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
