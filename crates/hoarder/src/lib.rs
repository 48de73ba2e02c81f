//! Library interface for the `hoarder` CLI.
//!
//! This crate exposes the CLI's argument parser and command structure as a library,
//! primarily for documentation generation and testing. The actual entry point is
//! in `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`Commands`] - Available subcommands
//! - [`commands`] - Command implementations
//!
//! # Documentation Generation
//!
//! The [`command()`] function returns the clap `Command` for generating man pages
//! and shell completions via `xtask`.

pub mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    ///
    /// Call this once at startup to set the color mode.
    pub fn apply(self) {
        match self {
            Self::Auto => {} // owo-colors auto-detects by default
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    RUST_LOG                Log filter (e.g., debug, hoarder_core=trace)
    HOARDER_LOG_PATH        Explicit log file path
    HOARDER_LOG_DIR         Log directory
    INPUT_<KEY>             Action input for any config key (e.g., INPUT_HOARD_REPO)
    GITHUB_REPOSITORY       owner/repo used when owner or repository is unset
    GITHUB_TOKEN, GH_TOKEN  Token used when insights_token is unset
    GITHUB_API_URL          API base URL used when api_url is unset
";
/// Command-line interface definition for hoarder.
#[derive(Parser)]
#[command(name = "hoarder")]
#[command(
    about = "Hoard daily GitHub repository insights into a history file",
    long_about = None
)]
#[command(version)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, global = true)]
    pub chdir: Option<PathBuf>,

    /// Only print errors (suppresses warnings/info)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More detail (repeatable; e.g. -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands for the CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Record yesterday's metrics and commit the history files
    Sync(commands::sync::SyncArgs),

    /// Show package information and resolved settings
    Info(commands::info::InfoArgs),

    /// Diagnose configuration and environment
    Doctor(commands::doctor::DoctorArgs),
}

impl Commands {
    /// Configuration overrides carried by the subcommand's flags.
    pub fn overrides(&self) -> Option<hoarder_core::ConfigOverrides> {
        match self {
            Self::Sync(args) => Some(args.overrides()),
            Self::Info(_) | Self::Doctor(_) => None,
        }
    }
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}
