//! Sync orchestrator: one run over every configured repository.
//!
//! For each source repository, in order:
//!
//! 1. Fetch the cumulative stats snapshot.
//! 2. Ensure the hoard branch exists.
//! 3. Load the stored history (a missing file is an empty history).
//! 4. Backfill the replay window when the history is sparse.
//! 5. Merge yesterday's record.
//! 6. Encode and commit.
//!
//! Repositories are processed strictly one after another and the
//! [`CommitCursor`] from each commit feeds the next. The first failure
//! ends the run; nothing is committed for the failing repository and the
//! remaining ones are not visited.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::codec::{self, CodecError};
use crate::commit::{BranchCommitter, BranchStatus, CommitCursor, CommitError, CommitOutcome};
use crate::forge::{CommitStorage, ForgeError, MetricsSource, RepoSlug};
use crate::history::History;
use crate::reconcile;
use crate::record::{DailyRecord, RepoStatsSnapshot};
use crate::settings::{RepoScope, SyncSettings};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors that end a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Neither the organization nor the user listing worked.
    #[error("listing repositories of {owner}: {source}")]
    ListRepositories {
        /// Account whose repositories were requested.
        owner: String,
        /// Failure of the user listing (the fallback).
        #[source]
        source: ForgeError,
    },

    /// A metrics or storage call failed.
    #[error("{repo}: {source}")]
    Forge {
        /// Repository being processed.
        repo: RepoSlug,
        /// Underlying failure.
        #[source]
        source: ForgeError,
    },

    /// The stored history could not be read or written.
    #[error("{repo}: {path}: {source}")]
    Codec {
        /// Repository being processed.
        repo: RepoSlug,
        /// History file path in the hoard.
        path: String,
        /// Underlying failure.
        #[source]
        source: CodecError,
    },

    /// Committing to the hoard failed.
    #[error("{repo}: {source}")]
    Commit {
        /// Repository being processed.
        repo: RepoSlug,
        /// Underlying failure.
        #[source]
        source: CommitError,
    },
}

/// Result alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

// ──────────────────────────────────────────────
// Events and reports
// ──────────────────────────────────────────────

/// Progress notifications for the CLI.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The repositories this run will visit.
    RepositoriesResolved(Vec<RepoSlug>),
    /// Processing of a repository has begun.
    RepositoryStarted(RepoSlug),
    /// The stats snapshot was fetched.
    StatsGathered {
        /// Source repository.
        repo: RepoSlug,
        /// The snapshot used for every record of this run.
        stats: RepoStatsSnapshot,
    },
    /// The hoard branch is ready.
    BranchEnsured {
        /// Branch name.
        branch: String,
        /// Whether it had to be created.
        status: BranchStatus,
    },
    /// The stored history was loaded.
    HistoryLoaded {
        /// Source repository.
        repo: RepoSlug,
        /// Records in the stored file (0 when absent).
        records: usize,
        /// Whether the file existed.
        found: bool,
    },
    /// Sparse history was padded with replayed days.
    Backfilled {
        /// Source repository.
        repo: RepoSlug,
        /// Days replayed.
        days: usize,
    },
    /// The repository is done.
    RepositoryCompleted(RepoReport),
}

/// What happened for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoReport {
    /// Source repository.
    pub repo: RepoSlug,
    /// History file path in the hoard.
    pub path: String,
    /// Yesterday's record as written.
    pub yesterday: DailyRecord,
    /// Days replayed by the backfill (0 when not needed).
    pub backfilled_days: usize,
    /// Records in the committed history.
    pub records: usize,
    /// Result of the commit.
    pub outcome: CommitOutcome,
}

/// What happened across the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// The run's notion of today (UTC).
    pub today: NaiveDate,
    /// Hoard repository.
    pub hoard: RepoSlug,
    /// Hoard branch.
    pub branch: String,
    /// Whether the branch was created by this run.
    pub branch_created: bool,
    /// Per-repository results, in processing order.
    pub repositories: Vec<RepoReport>,
}

impl RunReport {
    /// Number of repositories whose history produced a real commit.
    pub fn commits(&self) -> usize {
        self.repositories
            .iter()
            .filter(|r| matches!(r.outcome, CommitOutcome::Committed { .. }))
            .count()
    }
}

// ──────────────────────────────────────────────
// Run
// ──────────────────────────────────────────────

/// Forge collaborators for one run. Reads and writes may use different
/// credentials, hence two references.
pub struct Forges<'a, M: MetricsSource + ?Sized, C: CommitStorage + ?Sized> {
    /// Reads source repository metrics.
    pub metrics: &'a M,
    /// Reads and writes the hoard.
    pub storage: &'a C,
}

/// List the source repositories a scope covers.
///
/// Organization listing is tried first; on any failure the owner is
/// treated as a user account.
#[instrument(skip(metrics))]
pub fn resolve_repositories<M: MetricsSource + ?Sized>(
    metrics: &M,
    scope: &RepoScope,
) -> SyncResult<Vec<RepoSlug>> {
    let owner = match scope {
        RepoScope::Single(repo) => return Ok(vec![repo.clone()]),
        RepoScope::AllOf(owner) => owner,
    };

    let names = match metrics.list_org_repos(owner) {
        Ok(names) => names,
        Err(err) => {
            warn!(%owner, error = %err, "organization listing failed, trying user");
            metrics
                .list_user_repos(owner)
                .map_err(|source| SyncError::ListRepositories {
                    owner: owner.clone(),
                    source,
                })?
        }
    };
    info!(%owner, count = names.len(), "found repositories");
    Ok(names
        .into_iter()
        .map(|name| RepoSlug::new(owner.clone(), name))
        .collect())
}

/// Run the sync for every repository in `settings`.
///
/// `today` is the current UTC date; yesterday's record is the one the run
/// is for.
#[instrument(skip_all, fields(hoard = %settings.hoard, branch = %settings.branch, %today))]
pub fn run<M, C>(
    settings: &SyncSettings,
    forges: &Forges<'_, M, C>,
    today: NaiveDate,
    mut on_event: impl FnMut(SyncEvent),
) -> SyncResult<RunReport>
where
    M: MetricsSource + ?Sized,
    C: CommitStorage + ?Sized,
{
    let repositories = resolve_repositories(forges.metrics, &settings.scope)?;
    on_event(SyncEvent::RepositoriesResolved(repositories.clone()));

    let committer = BranchCommitter::new(
        forges.storage,
        settings.hoard.clone(),
        settings.branch.clone(),
        settings.retry.stale_read(),
        settings.retry.update_ref(),
    );

    let mut report = RunReport {
        today,
        hoard: settings.hoard.clone(),
        branch: settings.branch.clone(),
        branch_created: false,
        repositories: Vec::with_capacity(repositories.len()),
    };
    let mut cursor = CommitCursor::default();

    for repo in repositories {
        on_event(SyncEvent::RepositoryStarted(repo.clone()));
        let (repo_report, next, branch) =
            sync_repository(settings, forges, &committer, &repo, today, &cursor, &mut on_event)?;
        report.branch_created |= branch == BranchStatus::Created;
        cursor = next;
        on_event(SyncEvent::RepositoryCompleted(repo_report.clone()));
        report.repositories.push(repo_report);
    }

    info!(
        repositories = report.repositories.len(),
        commits = report.commits(),
        "sync complete"
    );
    Ok(report)
}

#[instrument(skip_all, fields(%repo))]
fn sync_repository<M, C>(
    settings: &SyncSettings,
    forges: &Forges<'_, M, C>,
    committer: &BranchCommitter<'_, C>,
    repo: &RepoSlug,
    today: NaiveDate,
    cursor: &CommitCursor,
    on_event: &mut impl FnMut(SyncEvent),
) -> SyncResult<(RepoReport, CommitCursor, BranchStatus)>
where
    M: MetricsSource + ?Sized,
    C: CommitStorage + ?Sized,
{
    let forge_err = |source| SyncError::Forge {
        repo: repo.clone(),
        source,
    };
    let commit_err = |source| SyncError::Commit {
        repo: repo.clone(),
        source,
    };

    info!(%repo, "gathering insights");
    let stats = forges.metrics.repo_stats(repo).map_err(forge_err)?;
    on_event(SyncEvent::StatsGathered {
        repo: repo.clone(),
        stats,
    });

    let branch = committer
        .ensure_branch(&settings.base_branch)
        .map_err(commit_err)?;
    on_event(SyncEvent::BranchEnsured {
        branch: committer.branch().to_string(),
        status: branch,
    });

    let target = settings.target_for(repo);
    let codec_err = |source| SyncError::Codec {
        repo: repo.clone(),
        path: target.path.clone(),
        source,
    };

    let (history, record_count, found) =
        match forges
            .storage
            .file_content(&target.hoard, &target.branch, &target.path)
        {
            Ok(bytes) => {
                let decoded = codec::decode(&bytes, settings.format).map_err(codec_err)?;
                (decoded.history, decoded.record_count, true)
            }
            Err(e) if e.is_not_found() => (History::empty(), 0, false),
            Err(e) => return Err(forge_err(e)),
        };
    on_event(SyncEvent::HistoryLoaded {
        repo: repo.clone(),
        records: record_count,
        found,
    });

    let backfilled_days = if reconcile::needs_backfill(record_count) {
        reconcile::backfill_dates(today).len()
    } else {
        0
    };
    let history =
        reconcile::backfill(forges.metrics, repo, &stats, history, record_count, today)
            .map_err(forge_err)?;
    if backfilled_days > 0 {
        on_event(SyncEvent::Backfilled {
            repo: repo.clone(),
            days: backfilled_days,
        });
    }

    let yesterday = reconcile::fetch_day(forges.metrics, repo, &stats, reconcile::yesterday(today))
        .map_err(forge_err)?;
    let history = history.merge(yesterday.clone());

    let content = codec::encode(&history, settings.format).map_err(codec_err)?;
    let (outcome, next) = committer
        .commit_file(
            &target.path,
            &content,
            &crate::target::commit_message(repo),
            cursor,
        )
        .map_err(commit_err)?;

    Ok((
        RepoReport {
            repo: repo.clone(),
            path: target.path,
            yesterday,
            backfilled_days,
            records: history.len(),
            outcome,
        },
        next,
        branch,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Format;
    use crate::forge::memory::MemoryForge;
    use crate::record::DailyCount;
    use crate::retry::RetrySettings;
    use crate::settings::Secret;

    const BRANCH: &str = "repository-insights";

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn today() -> NaiveDate {
        date("2024-06-20")
    }

    fn widgets() -> RepoSlug {
        RepoSlug::new("octo", "widgets")
    }

    fn settings(scope: RepoScope, format: Format) -> SyncSettings {
        SyncSettings {
            insights_token: Secret::new("r"),
            commit_token: Secret::new("w"),
            scope,
            hoard: RepoSlug::new("octo", "hoard"),
            branch: BRANCH.into(),
            base_branch: "main".into(),
            directory: ".insights".into(),
            format,
            api_url: "http://unused".into(),
            http_timeout_secs: 1,
            retry: RetrySettings {
                stale_read_delay_ms: 0,
                update_ref_delay_ms: 0,
                max_delay_ms: 0,
                max_attempts: 3,
            },
        }
    }

    fn single(format: Format) -> SyncSettings {
        settings(RepoScope::Single(widgets()), format)
    }

    fn stats() -> RepoStatsSnapshot {
        RepoStatsSnapshot {
            stargazers: 42,
            commits: 314,
            contributors: 5,
        }
    }

    fn forge() -> MemoryForge {
        MemoryForge::new()
            .with_stats(widgets(), stats())
            .with_views(
                widgets(),
                vec![DailyCount {
                    date: date("2024-06-19"),
                    count: 17,
                    uniques: 6,
                }],
            )
            .with_clones(
                widgets(),
                vec![DailyCount {
                    date: date("2024-06-19"),
                    count: 3,
                    uniques: 2,
                }],
            )
    }

    fn run_on(forge: &MemoryForge, settings: &SyncSettings) -> SyncResult<RunReport> {
        let forges = Forges {
            metrics: forge,
            storage: forge,
        };
        run(settings, &forges, today(), |_| {})
    }

    fn stored(forge: &MemoryForge, path: &str, format: Format) -> History {
        let text = forge.read_file(BRANCH, path).unwrap();
        codec::decode(text.as_bytes(), format).unwrap().history
    }

    fn seeded_history(days: std::ops::RangeInclusive<u32>) -> History {
        days.map(|d| DailyRecord {
            date: NaiveDate::from_ymd_opt(2024, 6, d).unwrap(),
            stargazers: 1,
            commits: 1,
            contributors: 1,
            traffic_views: 1,
            traffic_uniques: 1,
            clones_count: 1,
            clones_uniques: 1,
        })
        .collect()
    }

    #[test]
    fn fresh_hoard_gets_fourteen_records_in_one_commit() {
        let forge = forge();
        let report = run_on(&forge, &single(Format::Csv)).unwrap();

        assert!(report.branch_created);
        assert_eq!(forge.created_commits().len(), 1);
        let repo = &report.repositories[0];
        assert_eq!(repo.backfilled_days, 13);
        assert_eq!(repo.records, 14);
        assert_eq!(repo.path, ".insights/octo/widgets/insights.csv");

        let history = stored(&forge, &repo.path, Format::Csv);
        assert_eq!(history.len(), 14);
        assert_eq!(history.records()[0].date, date("2024-06-06"));
        assert_eq!(history.records()[13].date, date("2024-06-19"));
        let last = &history.records()[13];
        assert_eq!(last.traffic_views, 17);
        assert_eq!(last.clones_uniques, 2);
        assert!(history.records().iter().all(|r| r.stargazers == 42));
    }

    #[test]
    fn populated_hoard_appends_yesterday() {
        let forge = forge();
        let path = ".insights/octo/widgets/insights.json";
        let existing = seeded_history(4..=17);
        forge.seed_file(BRANCH, path, &codec::encode(&existing, Format::Json).unwrap());

        let report = run_on(&forge, &single(Format::Json)).unwrap();

        assert!(!report.branch_created);
        assert_eq!(report.repositories[0].backfilled_days, 0);
        assert_eq!(forge.traffic_calls().len(), 1);
        assert_eq!(stored(&forge, path, Format::Json).len(), 15);
    }

    #[test]
    fn populated_hoard_replaces_existing_yesterday() {
        let forge = forge();
        let path = ".insights/octo/widgets/insights.csv";
        let existing = seeded_history(6..=19);
        forge.seed_file(BRANCH, path, &codec::encode(&existing, Format::Csv).unwrap());

        run_on(&forge, &single(Format::Csv)).unwrap();

        let history = stored(&forge, path, Format::Csv);
        assert_eq!(history.len(), 14);
        assert_eq!(
            history.get(date("2024-06-19")).map(|r| r.traffic_views),
            Some(17)
        );
    }

    #[test]
    fn sparse_history_is_backfilled() {
        let forge = forge();
        let path = ".insights/octo/widgets/insights.csv";
        forge.seed_file(BRANCH, path, &codec::encode(&seeded_history(1..=12), Format::Csv).unwrap());

        let report = run_on(&forge, &single(Format::Csv)).unwrap();

        assert_eq!(report.repositories[0].backfilled_days, 13);
        // June 1..5 survive, 6..19 come from the replay and yesterday.
        assert_eq!(stored(&forge, path, Format::Csv).len(), 19);
    }

    #[test]
    fn rerun_same_day_is_a_no_op() {
        let forge = forge();
        let settings = single(Format::Csv);
        run_on(&forge, &settings).unwrap();
        let report = run_on(&forge, &settings).unwrap();

        assert_eq!(report.repositories[0].outcome, CommitOutcome::Unchanged);
        assert_eq!(report.commits(), 0);
        assert_eq!(forge.created_commits().len(), 1);
    }

    #[test]
    fn update_race_is_retried() {
        let forge = forge();
        forge.fail_update_ref(1);
        let report = run_on(&forge, &single(Format::Csv)).unwrap();

        assert_eq!(forge.update_ref_calls(), 2);
        assert_eq!(
            report.repositories[0].outcome,
            CommitOutcome::Committed {
                sha: forge.tip(BRANCH).unwrap()
            }
        );
    }

    #[test]
    fn all_repos_falls_back_to_user_and_threads_cursor() {
        let forge = forge()
            .with_user("octo", &["widgets", "gadgets"])
            .with_stats(RepoSlug::new("octo", "gadgets"), stats());
        // After the first commit the ref keeps reporting the old tip for
        // two reads: the branch check and the first guard read.
        forge.lag_ref_reads(2);

        let mut events = Vec::new();
        let report = run(
            &settings(RepoScope::AllOf("octo".into()), Format::Csv),
            &Forges {
                metrics: &forge,
                storage: &forge,
            },
            today(),
            |e| events.push(e),
        )
        .unwrap();

        assert_eq!(report.repositories.len(), 2);
        assert_eq!(report.commits(), 2);
        assert_eq!(forge.created_commits().len(), 2);
        assert!(forge.read_file(BRANCH, ".insights/octo/widgets/insights.csv").is_some());
        assert!(forge.read_file(BRANCH, ".insights/octo/gadgets/insights.csv").is_some());
        assert!(matches!(
            events.first(),
            Some(SyncEvent::RepositoriesResolved(repos)) if repos.len() == 2
        ));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, SyncEvent::Backfilled { days: 13, .. }))
        );
    }

    #[test]
    fn org_listing_is_preferred() {
        let forge = MemoryForge::new()
            .with_org("acme", &["rockets"])
            .with_user("acme", &["wrong"]);
        let repos = resolve_repositories(&forge, &RepoScope::AllOf("acme".into())).unwrap();
        assert_eq!(repos, vec![RepoSlug::new("acme", "rockets")]);
    }

    #[test]
    fn listing_failure_for_both_accounts() {
        let forge = MemoryForge::new();
        let err = resolve_repositories(&forge, &RepoScope::AllOf("ghost".into())).unwrap_err();
        assert!(matches!(err, SyncError::ListRepositories { .. }));
    }

    #[test]
    fn failure_stops_remaining_repositories() {
        let broken = RepoSlug::new("octo", "broken");
        let forge = forge()
            .with_org("octo", &["broken", "widgets"])
            .with_failing_traffic(broken.clone());

        let err = run_on(&forge, &settings(RepoScope::AllOf("octo".into()), Format::Csv))
            .unwrap_err();

        assert!(matches!(err, SyncError::Forge { ref repo, .. } if *repo == broken));
        assert!(forge.created_commits().is_empty());
        assert!(!forge.traffic_calls().contains(&widgets()));
    }

    #[test]
    fn malformed_history_fails_without_commit() {
        let forge = forge();
        let path = ".insights/octo/widgets/insights.csv";
        forge.seed_file(BRANCH, path, "not,the,header\n1,2,3");

        let err = run_on(&forge, &single(Format::Csv)).unwrap_err();

        assert!(matches!(err, SyncError::Codec { .. }));
        assert!(err.to_string().contains("line 1"));
        assert!(forge.created_commits().is_empty());
    }

    #[test]
    fn branch_lookup_failure_is_fatal() {
        let forge = forge();
        forge.fail_get_ref(500);
        let err = run_on(&forge, &single(Format::Csv)).unwrap_err();
        assert!(err.to_string().contains("checking if branch"));
    }

    #[test]
    fn commit_message_names_source() {
        let forge = forge();
        let report = run_on(&forge, &single(Format::Csv)).unwrap();
        let CommitOutcome::Committed { sha } = &report.repositories[0].outcome else {
            panic!("expected a commit");
        };
        assert_eq!(
            forge.commit_message(sha).as_deref(),
            Some("Update insights file for octo/widgets")
        );
    }
}
