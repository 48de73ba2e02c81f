//! Doctor command: diagnose configuration and environment.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use hoarder_core::{config, git};

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    directories: DirectoryPaths,
    config: ConfigStatus,
    git: GitStatus,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    cache: Option<String>,
    data: Option<String>,
    data_local: Option<String>,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Path to loaded config file, if any
    file: Option<String>,
    /// Whether a config file was found
    found: bool,
}

#[derive(Serialize)]
struct GitStatus {
    inside_repo: bool,
    /// `owner/repo` parsed from the origin remote
    origin: Option<String>,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    /// Current working directory
    cwd: Option<String>,
    /// Relevant environment variables
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

/// Variables worth reporting, and whether their value is a credential.
const ENV_VARS: &[(&str, &str, bool)] = &[
    ("XDG_CONFIG_HOME", "Override config directory", false),
    ("XDG_CACHE_HOME", "Override cache directory", false),
    ("XDG_DATA_HOME", "Override data directory", false),
    ("RUST_LOG", "Log filter directive", false),
    ("HOARDER_LOG_PATH", "Explicit log file path", false),
    ("HOARDER_LOG_DIR", "Log directory", false),
    ("RUNNER_TEMP", "Log directory on GitHub Actions runners", false),
    ("GITHUB_REPOSITORY", "Default source and hoard repository", false),
    ("GITHUB_API_URL", "Default API base URL", false),
    ("GITHUB_TOKEN", "Default token", true),
    ("GH_TOKEN", "Fallback token", true),
];

impl DoctorReport {
    fn gather(cwd: &camino::Utf8Path) -> Self {
        let config_file = config::find_project_config(cwd);
        let inside_repo = git::is_inside_repo().unwrap_or(false);
        let origin = if inside_repo {
            git::origin_slug().ok().flatten().map(|s| s.to_string())
        } else {
            None
        };

        Self {
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                cache: config::user_cache_dir().map(|p| p.to_string()),
                data: config::user_data_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
            config: ConfigStatus {
                found: config_file.is_some(),
                file: config_file.map(|p| p.to_string()),
            },
            git: GitStatus {
                inside_repo,
                origin,
            },
            environment: EnvironmentInfo {
                cwd: Some(cwd.to_string()),
                env_vars: env_vars(|key| std::env::var(key).ok()),
            },
        }
    }
}

fn env_vars(lookup: impl Fn(&str) -> Option<String>) -> Vec<EnvVar> {
    ENV_VARS
        .iter()
        .map(|&(name, description, secret)| EnvVar {
            name,
            value: lookup(name).map(|v| if secret { "<set>".to_string() } else { v }),
            description,
        })
        .collect()
}

/// Run diagnostics and report configuration status.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `cwd` - Current working directory
#[instrument(name = "cmd_doctor", skip_all, fields(json_output))]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing doctor command");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Gathering diagnostics...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let report = DoctorReport::gather(cwd);
    spinner.finish_and_clear();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Configuration".bold().underline());
    if report.config.found {
        println!(
            "  {} Config file: {}",
            "✓".green(),
            report.config.file.as_deref().unwrap_or("").cyan()
        );
    } else {
        println!("  {} No config file found", "○".yellow());
    }
    println!();

    println!("{}", "Git".bold().underline());
    match (report.git.inside_repo, report.git.origin.as_deref()) {
        (true, Some(origin)) => println!("  {} origin: {}", "✓".green(), origin.cyan()),
        (true, None) => println!("  {} No GitHub origin remote", "○".yellow()),
        (false, _) => println!("  {} Not inside a git repository", "○".dimmed()),
    }
    println!();

    println!("{}", "Directories".bold().underline());
    print_dir("  Config", report.directories.config.as_deref());
    print_dir("  Cache", report.directories.cache.as_deref());
    print_dir("  Data", report.directories.data.as_deref());
    print_dir("  Data (local)", report.directories.data_local.as_deref());
    println!();

    println!("{}", "Environment".bold().underline());
    println!("  {}: {}", "Working directory".dimmed(), cwd.cyan());

    let set_vars: Vec<_> = report
        .environment
        .env_vars
        .iter()
        .filter(|v| v.value.is_some())
        .collect();

    if set_vars.is_empty() {
        println!("  {} No relevant variables set", "○".dimmed());
    } else {
        for var in set_vars {
            println!(
                "  {}: {}",
                var.name.dimmed(),
                var.value.as_deref().unwrap_or("").cyan()
            );
        }
    }
    if !report
        .environment
        .env_vars
        .iter()
        .any(|v| v.name.ends_with("_TOKEN") && v.value.is_some())
    {
        println!(
            "  {} No token in the environment; set insights_token to sync",
            "○".yellow()
        );
    }

    Ok(())
}

fn print_dir(label: &str, path: Option<&str>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}
