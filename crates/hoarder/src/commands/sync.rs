//! Sync command: thin CLI layer over `hoarder_core::sync`.

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use hoarder_core::commit::{BranchStatus, CommitOutcome};
use hoarder_core::config::{Config, ConfigOverrides};
use hoarder_core::sync::{self, Forges, RepoReport, RunReport, SyncEvent};
use hoarder_core::{GithubClient, GithubClientConfig, InvocationContext, SyncSettings};

/// Arguments for the `sync` subcommand.
///
/// Every flag overrides the matching configuration key.
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Token used to read repository metrics
    #[arg(long, value_name = "TOKEN")]
    pub insights_token: Option<String>,

    /// Token used to commit to the hoard (defaults to the insights token)
    #[arg(long, value_name = "TOKEN")]
    pub commit_token: Option<String>,

    /// Owner of the source repositories
    #[arg(long)]
    pub owner: Option<String>,

    /// Source repository name (without the owner)
    #[arg(long)]
    pub repository: Option<String>,

    /// Collect every public repository of the owner
    #[arg(long)]
    pub all_repos: bool,

    /// Owner of the repository the history files are committed to
    #[arg(long)]
    pub hoard_owner: Option<String>,

    /// Repository the history files are committed to
    #[arg(long)]
    pub hoard_repo: Option<String>,

    /// Branch of the hoard to commit to
    #[arg(long)]
    pub branch: Option<String>,

    /// Branch a missing hoard branch is created from
    #[arg(long)]
    pub base_branch: Option<String>,

    /// Directory inside the hoard for history files
    #[arg(long)]
    pub directory: Option<String>,

    /// History file format (json or csv)
    #[arg(long)]
    pub format: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,
}

impl SyncArgs {
    /// The flags as a configuration layer.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            insights_token: self.insights_token.clone(),
            commit_token: self.commit_token.clone(),
            owner: self.owner.clone(),
            repository: self.repository.clone(),
            all_repos: self.all_repos.then_some(true),
            hoard_owner: self.hoard_owner.clone(),
            hoard_repo: self.hoard_repo.clone(),
            branch: self.branch.clone(),
            base_branch: self.base_branch.clone(),
            directory: self.directory.clone(),
            format: self.format.clone(),
            api_url: self.api_url.clone(),
        }
    }
}

/// Execute the sync command.
///
/// `config` already carries the [`SyncArgs`] flags as its top layer
/// (see [`SyncArgs::overrides`]).
#[instrument(name = "cmd_sync", skip_all)]
pub fn cmd_sync(global_json: bool, config: &Config) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing sync command");

    let settings = SyncSettings::resolve(config, &InvocationContext::detect())
        .context("invalid sync configuration")?;

    let metrics = GithubClient::new(GithubClientConfig {
        api_url: settings.api_url.clone(),
        token: Some(settings.insights_token.expose().to_string()),
        timeout: settings.http_timeout(),
    });
    let storage = GithubClient::new(GithubClientConfig {
        api_url: settings.api_url.clone(),
        token: Some(settings.commit_token.expose().to_string()),
        timeout: settings.http_timeout(),
    });
    let forges = Forges {
        metrics: &metrics,
        storage: &storage,
    };

    if !global_json {
        println!(
            "\n{}: {} {} {}",
            "Hoard".bold(),
            settings.hoard.to_string().cyan(),
            "on".dimmed(),
            settings.branch.cyan(),
        );
    }

    let today = chrono::Utc::now().date_naive();
    let mut progress = Progress::default();
    let report = sync::run(&settings, &forges, today, |event| {
        if !global_json {
            progress.handle(event);
        }
    });
    progress.clear();
    let report = report.context("sync failed")?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

/// Terminal rendering of [`SyncEvent`]s.
#[derive(Default)]
struct Progress {
    spinner: Option<ProgressBar>,
}

impl Progress {
    fn handle(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::RepositoriesResolved(repos) => {
                println!(
                    "{}: {}",
                    "Repositories".dimmed(),
                    repos
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                println!();
            }
            SyncEvent::RepositoryStarted(repo) => {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(
                    ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner())
                        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
                );
                spinner.set_message(format!("{repo}: gathering insights..."));
                self.spinner = Some(spinner);
            }
            SyncEvent::StatsGathered { repo, stats } => {
                debug!(%repo, ?stats, "stats gathered");
                self.message(format!("{repo}: reading history..."));
            }
            SyncEvent::BranchEnsured { branch, status } => {
                if status == BranchStatus::Created {
                    self.println(format!(
                        "  {} {} {}",
                        "+".green(),
                        "created branch".bold(),
                        branch.cyan()
                    ));
                }
            }
            SyncEvent::HistoryLoaded {
                repo,
                records,
                found,
            } => {
                debug!(%repo, records, found, "history loaded");
                self.message(format!("{repo}: fetching traffic..."));
            }
            SyncEvent::Backfilled { repo, days } => {
                self.message(format!("{repo}: replayed {days} days of traffic..."));
            }
            SyncEvent::RepositoryCompleted(report) => {
                self.clear();
                print_repository(&report);
            }
        }
    }

    fn message(&self, msg: String) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(msg);
            spinner.tick();
        }
    }

    fn println(&self, line: String) {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

fn print_repository(report: &RepoReport) {
    let outcome = match report.outcome {
        CommitOutcome::Committed { ref sha } => {
            format!("committed {}", sha.chars().take(7).collect::<String>())
        }
        CommitOutcome::Unchanged => "unchanged".to_string(),
    };
    let marker = match report.outcome {
        CommitOutcome::Committed { .. } => "✓".green().to_string(),
        CommitOutcome::Unchanged => "–".yellow().to_string(),
    };
    println!(
        "  {} {} {}",
        marker,
        report.repo.to_string().bold(),
        outcome.dimmed()
    );

    let day = &report.yesterday;
    println!(
        "    {} {}  {} {}  {} {}",
        "stars".dimmed(),
        day.stargazers,
        "commits".dimmed(),
        day.commits,
        "contributors".dimmed(),
        day.contributors,
    );
    println!(
        "    {} {} ({} unique)  {} {} ({} unique)",
        "views".dimmed(),
        day.traffic_views,
        day.traffic_uniques,
        "clones".dimmed(),
        day.clones_count,
        day.clones_uniques,
    );
    let backfill = if report.backfilled_days > 0 {
        format!(", {} days backfilled", report.backfilled_days)
    } else {
        String::new()
    };
    println!(
        "    {} {} ({} records{backfill})",
        "file".dimmed(),
        report.path.cyan(),
        report.records,
    );
}

fn print_summary(report: &RunReport) {
    println!();
    println!(
        "{} Recorded {} for {} {} ({} committed)",
        "✓".green().bold(),
        report.today.pred_opt().unwrap_or(report.today),
        report.repositories.len(),
        if report.repositories.len() == 1 {
            "repository"
        } else {
            "repositories"
        },
        report.commits(),
    );
}
