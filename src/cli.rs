// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Build front-end assets from a dependency-ordered task graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Relative task paths are resolved against the directory holding it.
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Build in release mode (enables `when = "release"` transforms).
    #[arg(long, global = true)]
    pub release: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run every task once in dependency order.
    Build(BuildArgs),
    /// Build once, then re-run single tasks when their watched files change.
    Watch,
    /// Build, watch and serve the output directory with live reload.
    Serve(ServeArgs),
    /// Remove the output directory.
    Clean,
}

#[derive(Debug, Clone, Default, Args)]
pub struct BuildArgs {
    /// Remove the output directory before building.
    #[arg(long)]
    pub clean: bool,

    /// Parse + validate, print the execution batches, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// Interface to bind; overrides `[server].host`.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to bind; overrides `[server].port`.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,
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
