//! Info command: show package, configuration and resolved sync settings.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use hoarder_core::config::{self, Config};
use hoarder_core::{InvocationContext, SyncSettings};

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    homepage: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            homepage: env!("CARGO_PKG_HOMEPAGE"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &camino::Utf8Path) -> Self {
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
enum SettingsInfo {
    Resolved(Box<SyncSettings>),
    Incomplete { error: String },
}

impl SettingsInfo {
    fn resolve(config: &Config, context: &InvocationContext) -> Self {
        match SyncSettings::resolve(config, context) {
            Ok(settings) => Self::Resolved(Box::new(settings)),
            Err(err) => Self::Incomplete {
                error: err.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
    context: InvocationContext,
    settings: SettingsInfo,
}

/// Print package information.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory for config discovery
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let context = InvocationContext::detect();
    let full_info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, cwd),
        settings: SettingsInfo::resolve(config, &context),
        context,
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&full_info)?);
    } else {
        print_text(&full_info);
    }

    Ok(())
}

fn print_text(info: &FullInfo) {
    println!(
        "{} {}",
        info.package.name.bold(),
        info.package.version.green()
    );
    if !info.package.description.is_empty() {
        println!("{}", info.package.description);
    }
    if !info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), info.package.license);
    }
    if !info.package.repository.is_empty() {
        println!(
            "{}: {}",
            "Repository".dimmed(),
            info.package.repository.cyan()
        );
    }

    println!();
    println!("{}", "Configuration".bold().underline());
    if let Some(ref path) = info.config.config_file {
        println!("{}: {}", "Config file".dimmed(), path.cyan());
    } else {
        println!("{}: {}", "Config file".dimmed(), "none loaded".yellow());
    }
    println!("{}: {}", "Log level".dimmed(), info.config.log_level);
    if let Some(ref dir) = info.config.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }

    println!();
    println!("{}", "Invocation".bold().underline());
    match info.context.repo {
        Some(ref repo) => println!("{}: {}", "Repository".dimmed(), repo.to_string().cyan()),
        None => println!("{}: {}", "Repository".dimmed(), "not detected".yellow()),
    }
    if let Some(ref url) = info.context.api_url {
        println!("{}: {}", "API URL".dimmed(), url);
    }
    println!(
        "{}: {}",
        "Token in environment".dimmed(),
        if info.context.token.is_some() {
            "yes".green().to_string()
        } else {
            "no".yellow().to_string()
        }
    );

    println!();
    println!("{}", "Sync Settings".bold().underline());
    match info.settings {
        SettingsInfo::Resolved(ref settings) => {
            println!("{}: {:?}", "Scope".dimmed(), settings.scope);
            println!(
                "{}: {} @ {} (from {})",
                "Hoard".dimmed(),
                settings.hoard.to_string().cyan(),
                settings.branch.cyan(),
                settings.base_branch
            );
            println!("{}: {}", "Directory".dimmed(), settings.directory);
            println!("{}: {}", "Format".dimmed(), settings.format);
            println!("{}: {}", "API URL".dimmed(), settings.api_url);
        }
        SettingsInfo::Incomplete { ref error } => {
            println!("  {} {}", "○".yellow(), error.yellow());
        }
    }
}
