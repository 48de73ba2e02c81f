//! Daily metric records and the per-run snapshots they are built from.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the insights time series.
///
/// `stargazers`, `commits` and `contributors` are cumulative snapshots taken
/// when the row was produced; the traffic and clone fields are the figures
/// for `date` itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Calendar day this row describes (the natural key).
    pub date: NaiveDate,
    /// Star count at collection time.
    pub stargazers: u64,
    /// Commit count on the default branch at collection time.
    pub commits: u64,
    /// Distinct authors among the most recent commits.
    pub contributors: u64,
    /// Page views on `date`.
    pub traffic_views: u64,
    /// Unique visitors on `date`.
    pub traffic_uniques: u64,
    /// Clones on `date`.
    pub clones_count: u64,
    /// Unique cloners on `date`.
    pub clones_uniques: u64,
}

impl DailyRecord {
    /// Assemble a row from the run's stats snapshot and one day's traffic.
    pub const fn new(
        date: NaiveDate,
        stats: &RepoStatsSnapshot,
        views: DayTraffic,
        clones: DayTraffic,
    ) -> Self {
        Self {
            date,
            stargazers: stats.stargazers,
            commits: stats.commits,
            contributors: stats.contributors,
            traffic_views: views.count,
            traffic_uniques: views.uniques,
            clones_count: clones.count,
            clones_uniques: clones.uniques,
        }
    }
}

/// Cumulative repository stats, fetched once per repository per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepoStatsSnapshot {
    /// Star count.
    pub stargazers: u64,
    /// Total commits on the default branch.
    pub commits: u64,
    /// Distinct author logins among the sampled commits.
    pub contributors: u64,
}

impl RepoStatsSnapshot {
    /// Build a snapshot from a sample of commit author logins.
    ///
    /// Authors without a linked account (`None`) are skipped and repeated
    /// logins count once.
    pub fn from_commit_authors<'a, I>(stargazers: u64, commits: u64, authors: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let distinct: HashSet<&str> = authors.into_iter().flatten().collect();
        Self {
            stargazers,
            commits,
            contributors: distinct.len() as u64,
        }
    }
}

/// A views or clones figure for a single day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayTraffic {
    /// Total count.
    pub count: u64,
    /// Unique visitors or cloners.
    pub uniques: u64,
}

impl DayTraffic {
    /// Pick the entry for `date`, or zeros when the source has none.
    pub fn for_date(series: &[DailyCount], date: NaiveDate) -> Self {
        series
            .iter()
            .find(|entry| entry.date == date)
            .map(|entry| Self {
                count: entry.count,
                uniques: entry.uniques,
            })
            .unwrap_or_default()
    }
}

/// One entry of a per-day views or clones series as reported by the forge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    /// Day the counts belong to.
    pub date: NaiveDate,
    /// Total count.
    pub count: u64,
    /// Unique count.
    pub uniques: u64,
}
