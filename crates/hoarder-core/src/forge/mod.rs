//! Forge collaborators: metrics reads and git object writes.
//!
//! The core only talks to the forge through two traits:
//!
//! - [`MetricsSource`] - read-only statistics for the source repositories
//! - [`CommitStorage`] - file reads plus the blob/tree/commit/ref object API
//!   of the hoard repository
//!
//! [`github::GithubClient`] implements both over the GitHub REST and GraphQL
//! APIs. Each run uses one client per credential (insights vs. commit token).

pub mod github;

#[cfg(test)]
pub(crate) mod memory;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::record::{DailyCount, RepoStatsSnapshot};

/// Errors reported by forge collaborators.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// The file, ref, or account does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The forge answered with a non-success status.
    #[error("{method} {url} returned HTTP {status}")]
    Status {
        /// HTTP method.
        method: &'static str,
        /// Request URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// The request never got a response.
    #[error("{method} {url} failed: {message}")]
    Transport {
        /// HTTP method.
        method: &'static str,
        /// Request URL.
        url: String,
        /// Underlying transport error.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response from {url}: {message}")]
    Payload {
        /// Request URL.
        url: String,
        /// What was wrong with the body.
        message: String,
    },

    /// The GraphQL endpoint reported errors.
    #[error("GraphQL query failed: {0}")]
    GraphQl(String),
}

impl ForgeError {
    /// Whether this is the recoverable "does not exist" signal.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for forge operations.
pub type ForgeResult<T> = Result<T, ForgeError>;

/// An `owner/name` repository coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepoSlug {
    /// Account that owns the repository.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoSlug {
    /// Build a slug from its parts.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`. Returns `None` when either side is empty or
    /// there are extra separators.
    pub fn parse(s: &str) -> Option<Self> {
        let (owner, name) = s.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Read-only statistics for source repositories.
///
/// `Sync` because a day's views and clones are fetched concurrently.
pub trait MetricsSource: Sync {
    /// Public repositories of an organization.
    fn list_org_repos(&self, org: &str) -> ForgeResult<Vec<String>>;

    /// Public repositories of a user account.
    fn list_user_repos(&self, user: &str) -> ForgeResult<Vec<String>>;

    /// Per-day page views the forge still retains.
    fn daily_views(&self, repo: &RepoSlug) -> ForgeResult<Vec<DailyCount>>;

    /// Per-day clones the forge still retains.
    fn daily_clones(&self, repo: &RepoSlug) -> ForgeResult<Vec<DailyCount>>;

    /// Star count, commit count, and contributor count from recent history.
    fn repo_stats(&self, repo: &RepoSlug) -> ForgeResult<RepoStatsSnapshot>;
}

/// File reads and git object writes against the hoard repository.
pub trait CommitStorage {
    /// Raw content of `path` on `branch`; [`ForgeError::NotFound`] if absent.
    fn file_content(&self, repo: &RepoSlug, branch: &str, path: &str) -> ForgeResult<Vec<u8>>;

    /// Commit SHA that `heads/<branch>` points at.
    fn get_ref(&self, repo: &RepoSlug, branch: &str) -> ForgeResult<String>;

    /// Create `refs/heads/<branch>` at `sha`.
    fn create_ref(&self, repo: &RepoSlug, branch: &str, sha: &str) -> ForgeResult<()>;

    /// Tree SHA of commit `sha`.
    fn commit_tree(&self, repo: &RepoSlug, sha: &str) -> ForgeResult<String>;

    /// Store `content` as a UTF-8 blob, returning its SHA.
    fn create_blob(&self, repo: &RepoSlug, content: &str) -> ForgeResult<String>;

    /// Create a tree from `base_tree` with `path` set to `blob_sha`
    /// (regular file mode), returning the new tree SHA.
    fn create_tree(
        &self,
        repo: &RepoSlug,
        base_tree: &str,
        path: &str,
        blob_sha: &str,
    ) -> ForgeResult<String>;

    /// Create a commit of `tree` with the single parent `parent`.
    fn create_commit(
        &self,
        repo: &RepoSlug,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> ForgeResult<String>;

    /// Fast-forward `heads/<branch>` to `sha`.
    fn update_ref(&self, repo: &RepoSlug, branch: &str, sha: &str) -> ForgeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_parses_owner_and_name() {
        assert_eq!(
            RepoSlug::parse("octo/widgets"),
            Some(RepoSlug::new("octo", "widgets"))
        );
    }

    #[test]
    fn slug_rejects_malformed() {
        assert!(RepoSlug::parse("octo").is_none());
        assert!(RepoSlug::parse("/widgets").is_none());
        assert!(RepoSlug::parse("octo/").is_none());
        assert!(RepoSlug::parse("a/b/c").is_none());
    }

    #[test]
    fn slug_displays_as_path() {
        assert_eq!(RepoSlug::new("octo", "widgets").to_string(), "octo/widgets");
    }

    #[test]
    fn not_found_is_recoverable_signal() {
        assert!(ForgeError::NotFound("x".into()).is_not_found());
        assert!(!ForgeError::GraphQl("boom".into()).is_not_found());
    }
}
