//! Backfill of sparse histories.
//!
//! The forge only retains roughly two weeks of per-day traffic, so a missing
//! or thin history file is padded by replaying the days the forge still
//! knows about. Yesterday is never part of the replay; the run merges it
//! separately once the backfill is done.

use chrono::{Days, NaiveDate};
use tracing::{debug, instrument};

use crate::forge::{ForgeResult, MetricsSource, RepoSlug};
use crate::history::History;
use crate::record::{DailyRecord, DayTraffic, RepoStatsSnapshot};

/// Histories with fewer records than this get backfilled.
pub const BACKFILL_THRESHOLD: usize = 13;

/// First replayed day, counted back from today.
pub const OLDEST_OFFSET: u64 = 14;

/// Last replayed day, counted back from today.
pub const NEWEST_OFFSET: u64 = 2;

/// Whether a history holding `record_count` records needs a backfill.
pub const fn needs_backfill(record_count: usize) -> bool {
    record_count < BACKFILL_THRESHOLD
}

/// Dates replayed by a backfill, oldest first: `today - 14 ..= today - 2`.
pub fn backfill_dates(today: NaiveDate) -> Vec<NaiveDate> {
    (NEWEST_OFFSET..=OLDEST_OFFSET)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .collect()
}

/// The day before `today`.
pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today.pred_opt().unwrap_or(today)
}

/// Fetch views and clones for `date` concurrently and build its record.
pub fn fetch_day<S: MetricsSource + ?Sized>(
    source: &S,
    repo: &RepoSlug,
    stats: &RepoStatsSnapshot,
    date: NaiveDate,
) -> ForgeResult<DailyRecord> {
    let (views, clones) = rayon::join(|| source.daily_views(repo), || source.daily_clones(repo));
    Ok(DailyRecord::new(
        date,
        stats,
        DayTraffic::for_date(&views?, date),
        DayTraffic::for_date(&clones?, date),
    ))
}

/// Replay the backfill window into `history` when it is under-populated.
///
/// `record_count` is the number of records the persisted file held. Returns
/// the history unchanged when no backfill is needed. Fetch failures abort
/// the backfill.
#[instrument(skip(source, stats, history), fields(%repo))]
pub fn backfill<S: MetricsSource + ?Sized>(
    source: &S,
    repo: &RepoSlug,
    stats: &RepoStatsSnapshot,
    history: History,
    record_count: usize,
    today: NaiveDate,
) -> ForgeResult<History> {
    if !needs_backfill(record_count) {
        debug!(record_count, "history dense enough, no backfill");
        return Ok(history);
    }

    let dates = backfill_dates(today);
    debug!(record_count, days = dates.len(), "backfilling history");
    dates.into_iter().try_fold(history, |history, date| {
        Ok(history.merge(fetch_day(source, repo, stats, date)?))
    })
}
