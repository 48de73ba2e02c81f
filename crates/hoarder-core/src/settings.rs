//! Validated settings for a sync run.
//!
//! [`SyncSettings::resolve`] turns the raw layered [`Config`] plus the
//! [`InvocationContext`] into concrete values, applying fallbacks and
//! rejecting anything unusable before a single request is made.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::codec::Format;
use crate::config::Config;
use crate::context::InvocationContext;
use crate::error::{ConfigError, ConfigResult};
use crate::forge::RepoSlug;
use crate::forge::github::DEFAULT_API_URL;
use crate::retry::RetrySettings;
use crate::target::CommitTarget;

/// Branch history files are committed to by default.
pub const DEFAULT_BRANCH: &str = "repository-insights";
/// Branch a new history branch starts from by default.
pub const DEFAULT_BASE_BRANCH: &str = "main";
/// Directory inside the hoard by default.
pub const DEFAULT_DIRECTORY: &str = ".insights";

/// A credential that never shows up in logs or reports.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<redacted>")
    }
}

/// Which source repositories a run covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoScope {
    /// One named repository.
    Single(RepoSlug),
    /// Every public repository of an organization or user.
    AllOf(String),
}

/// Everything a sync run needs, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSettings {
    /// Token for metric reads.
    pub insights_token: Secret,
    /// Token for hoard writes.
    pub commit_token: Secret,
    /// Source repositories.
    pub scope: RepoScope,
    /// Repository the history files are committed to.
    pub hoard: RepoSlug,
    /// Branch of the hoard to commit to.
    pub branch: String,
    /// Branch `branch` is created from when missing.
    pub base_branch: String,
    /// Root directory for history files.
    pub directory: String,
    /// History file format.
    pub format: Format,
    /// REST API base URL.
    pub api_url: String,
    /// Per-request timeout in seconds.
    pub http_timeout_secs: u64,
    /// Commit protocol backoff.
    pub retry: RetrySettings,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl SyncSettings {
    /// Apply fallbacks and validate.
    pub fn resolve(config: &Config, context: &InvocationContext) -> ConfigResult<Self> {
        let format = match non_empty(config.format.as_ref()) {
            Some(raw) => raw.parse::<Format>()?,
            None => Format::default(),
        };

        let insights_token = non_empty(config.insights_token.as_ref())
            .or_else(|| context.token.clone())
            .ok_or(ConfigError::Missing {
                key: "insights_token",
                hint: "set insights_token, INPUT_INSIGHTS_TOKEN, GITHUB_TOKEN or GH_TOKEN",
            })?;
        let commit_token =
            non_empty(config.commit_token.as_ref()).unwrap_or_else(|| insights_token.clone());

        let context_owner = context.repo.as_ref().map(|r| r.owner.clone());
        let context_name = context.repo.as_ref().map(|r| r.name.clone());

        let owner = non_empty(config.owner.as_ref())
            .or_else(|| context_owner.clone())
            .ok_or(ConfigError::Missing {
                key: "owner",
                hint: "set owner or run inside a GitHub repository",
            })?;

        let scope = if config.all_repos.resolve("all_repos")? {
            RepoScope::AllOf(owner)
        } else {
            let name = non_empty(config.repository.as_ref())
                .or_else(|| context_name.clone())
                .ok_or(ConfigError::Missing {
                    key: "repository",
                    hint: "set repository, all_repos, or run inside a GitHub repository",
                })?;
            if name.contains('/') {
                return Err(ConfigError::Invalid {
                    key: "repository",
                    value: name,
                });
            }
            RepoScope::Single(RepoSlug::new(owner, name))
        };

        let hoard_owner = non_empty(config.hoard_owner.as_ref())
            .or(context_owner)
            .ok_or(ConfigError::Missing {
                key: "hoard_owner",
                hint: "set hoard_owner or run inside a GitHub repository",
            })?;
        let hoard_repo = non_empty(config.hoard_repo.as_ref())
            .or(context_name)
            .ok_or(ConfigError::Missing {
                key: "hoard_repo",
                hint: "set hoard_repo or run inside a GitHub repository",
            })?;

        let settings = Self {
            insights_token: Secret::new(insights_token),
            commit_token: Secret::new(commit_token),
            scope,
            hoard: RepoSlug::new(hoard_owner, hoard_repo),
            branch: non_empty(config.branch.as_ref()).unwrap_or_else(|| DEFAULT_BRANCH.into()),
            base_branch: non_empty(config.base_branch.as_ref())
                .unwrap_or_else(|| DEFAULT_BASE_BRANCH.into()),
            directory: non_empty(config.directory.as_ref())
                .unwrap_or_else(|| DEFAULT_DIRECTORY.into()),
            format,
            api_url: non_empty(config.api_url.as_ref())
                .or_else(|| context.api_url.clone())
                .unwrap_or_else(|| DEFAULT_API_URL.into()),
            http_timeout_secs: config.http_timeout_secs,
            retry: config.retry,
        };
        debug!(?settings.scope, hoard = %settings.hoard, format = %settings.format, "settings resolved");
        Ok(settings)
    }

    /// Per-request timeout.
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Where `source`'s history is stored.
    pub fn target_for(&self, source: &RepoSlug) -> CommitTarget {
        CommitTarget::new(
            self.hoard.clone(),
            self.branch.clone(),
            &self.directory,
            source,
            self.format,
        )
    }
}
