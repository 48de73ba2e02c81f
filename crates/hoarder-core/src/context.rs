//! Facts about where the job was invoked from.
//!
//! Inside a GitHub Actions step these come from the runner's environment.
//! Locally the repository falls back to the `origin` remote of the current
//! checkout.

use serde::Serialize;
use tracing::debug;

use crate::forge::RepoSlug;
use crate::git;

/// `owner/repo` of the workflow's repository.
pub const REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";
/// REST API base URL of the runner's GitHub instance.
pub const API_URL_ENV: &str = "GITHUB_API_URL";
/// Token variables consulted, in order, when no token is configured.
pub const TOKEN_ENVS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// Ambient defaults for settings that were not configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvocationContext {
    /// Repository the job runs for.
    pub repo: Option<RepoSlug>,
    /// API base URL advertised by the runner.
    pub api_url: Option<String>,
    /// Token available in the environment.
    #[serde(skip)]
    pub token: Option<String>,
}

impl InvocationContext {
    /// Read the process environment, asking git only when needed.
    pub fn detect() -> Self {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            || git::origin_slug().ok().flatten(),
        )
    }

    /// Build from an environment lookup and a lazy repository fallback.
    ///
    /// Empty variables count as unset.
    pub fn from_lookup<E, G>(env: E, origin: G) -> Self
    where
        E: Fn(&str) -> Option<String>,
        G: FnOnce() -> Option<RepoSlug>,
    {
        let get = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let repo = get(REPOSITORY_ENV)
            .as_deref()
            .and_then(RepoSlug::parse)
            .or_else(origin);
        let context = Self {
            repo,
            api_url: get(API_URL_ENV),
            token: TOKEN_ENVS.iter().find_map(|key| get(*key)),
        };
        debug!(repo = ?context.repo, api_url = ?context.api_url, has_token = context.token.is_some(), "invocation context");
        context
    }
}
