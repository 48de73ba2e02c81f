//! Local git lookups used to infer the invoking repository.
//!
//! Only read-only queries are made, and only when the environment does not
//! already name the repository. All commits go through the forge API.

use std::process::Command;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::forge::RepoSlug;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "remote").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Get the URL of a named remote, or `None` when it is not configured.
#[instrument]
pub fn remote_url(remote: &str) -> GitResult<Option<String>> {
    match git(&["remote", "get-url", remote]) {
        Ok(url) => {
            let url = url.trim().to_string();
            debug!(%remote, %url, "remote URL");
            Ok(Some(url))
        }
        Err(GitError::Command { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Parse the repository coordinate from a remote URL.
///
/// Handles both HTTPS and SSH formats:
/// - `https://github.com/owner/repo.git`
/// - `git@github.com:owner/repo.git`
pub fn parse_remote_slug(url: &str) -> Option<RepoSlug> {
    let path = url.strip_prefix("git@").map_or_else(
        || {
            url.split("//")
                .nth(1)
                .and_then(|after_scheme| after_scheme.split_once('/').map(|(_, path)| path))
        },
        |rest| rest.split_once(':').map(|(_, path)| path),
    )?;

    let path = path.strip_suffix(".git").unwrap_or(path);
    RepoSlug::parse(path)
}

/// Repository coordinate of the `origin` remote of the current checkout.
///
/// `None` outside a checkout, without an origin, or when the URL is not a
/// recognizable forge URL.
#[instrument]
pub fn origin_slug() -> GitResult<Option<RepoSlug>> {
    if !is_inside_repo()? {
        return Ok(None);
    }
    Ok(remote_url("origin")?.as_deref().and_then(parse_remote_slug))
}

/// Check if we're inside a git work tree.
#[instrument]
pub fn is_inside_repo() -> GitResult<bool> {
    match git(&["rev-parse", "--is-inside-work-tree"]) {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Run a git command and return its stdout.
fn git(args: &[&str]) -> GitResult<String> {
    let output = Command::new("git").args(args).output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These run both inside and outside a checkout.

    #[test]
    fn is_inside_repo_returns_bool() {
        assert!(is_inside_repo().is_ok());
    }

    #[test]
    fn origin_slug_does_not_error() {
        if is_inside_repo().unwrap_or(false) {
            assert!(origin_slug().is_ok());
        }
    }

    #[test]
    fn git_error_on_bad_command() {
        assert!(git(&["not-a-real-subcommand"]).is_err());
    }

    #[test]
    fn parse_https() {
        assert_eq!(
            parse_remote_slug("https://github.com/octo/widgets.git"),
            Some(RepoSlug::new("octo", "widgets"))
        );
        assert_eq!(
            parse_remote_slug("https://github.com/octo/widgets"),
            Some(RepoSlug::new("octo", "widgets"))
        );
    }

    #[test]
    fn parse_ssh() {
        assert_eq!(
            parse_remote_slug("git@github.com:octo/widgets.git"),
            Some(RepoSlug::new("octo", "widgets"))
        );
    }

    #[test]
    fn parse_invalid() {
        assert!(parse_remote_slug("not-a-url").is_none());
        assert!(parse_remote_slug("").is_none());
        assert!(parse_remote_slug("https://github.com/octo").is_none());
    }
}
