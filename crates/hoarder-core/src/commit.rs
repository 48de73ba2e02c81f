//! Race-safe commits to a shared branch of the hoard repository.
//!
//! Several jobs may write to the same branch concurrently, so every commit
//! is built on whatever tip the branch has right now and published with a
//! non-forced ref update. A rejected update is treated as a lost race and
//! retried. Writing content the tree already holds produces no commit.
//!
//! Within one run, [`CommitCursor`] carries the tip observed by the previous
//! commit into the next one. When the forge still reports that tip after we
//! committed on top of it, the read is stale and the committer waits for
//! the ref to catch up instead of building on an outdated parent.

use std::thread;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::forge::{CommitStorage, ForgeError, RepoSlug};
use crate::retry::RetryPolicy;

/// Errors from the commit protocol.
#[derive(Error, Debug)]
pub enum CommitError {
    /// Looking up the target branch failed for a reason other than absence.
    #[error("checking if branch {branch} exists: {source}")]
    BranchCheck {
        /// Branch that was being resolved.
        branch: String,
        /// Underlying failure.
        #[source]
        source: ForgeError,
    },

    /// A forge call failed outside the retried paths.
    #[error(transparent)]
    Forge(#[from] ForgeError),

    /// A retry loop ran out of attempts.
    #[error("{operation} gave up after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        /// Which loop gave up.
        operation: &'static str,
        /// Attempts made.
        attempts: u32,
        /// Description of the final failure.
        last_error: String,
    },
}

/// Result alias for commit operations.
pub type CommitResult<T> = Result<T, CommitError>;

/// Whether the branch was already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    /// The branch already existed.
    Existing,
    /// The branch was created from the base branch.
    Created,
}

/// What a commit attempt did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// The tree already had this content; nothing was written.
    Unchanged,
    /// A new commit now heads the branch.
    Committed {
        /// SHA of the new commit.
        sha: String,
    },
}

/// State threaded from one commit to the next within a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitCursor {
    /// Branch tip the previous commit was built on.
    pub observed_tip: Option<String>,
    /// Whether the previous commit advanced the branch.
    pub committed: bool,
}

impl CommitCursor {
    fn is_stale(&self, tip: &str) -> bool {
        self.committed && self.observed_tip.as_deref() == Some(tip)
    }
}

/// Commits single-file changes onto one branch of the hoard repository.
pub struct BranchCommitter<'a, S: CommitStorage + ?Sized> {
    storage: &'a S,
    repo: RepoSlug,
    branch: String,
    stale_read: RetryPolicy,
    update_ref: RetryPolicy,
}

impl<'a, S: CommitStorage + ?Sized> BranchCommitter<'a, S> {
    /// A committer for `repo`'s `branch`.
    pub fn new(
        storage: &'a S,
        repo: RepoSlug,
        branch: impl Into<String>,
        stale_read: RetryPolicy,
        update_ref: RetryPolicy,
    ) -> Self {
        Self {
            storage,
            repo,
            branch: branch.into(),
            stale_read,
            update_ref,
        }
    }

    /// Branch this committer writes to.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Make sure the branch exists, creating it from `base_branch` if not.
    #[instrument(skip(self), fields(hoard = %self.repo, branch = %self.branch))]
    pub fn ensure_branch(&self, base_branch: &str) -> CommitResult<BranchStatus> {
        match self.storage.get_ref(&self.repo, &self.branch) {
            Ok(_) => Ok(BranchStatus::Existing),
            Err(e) if e.is_not_found() => {
                let base = self.storage.get_ref(&self.repo, base_branch)?;
                self.storage.create_ref(&self.repo, &self.branch, &base)?;
                info!(base_branch, %base, "created branch");
                Ok(BranchStatus::Created)
            }
            Err(source) => Err(CommitError::BranchCheck {
                branch: self.branch.clone(),
                source,
            }),
        }
    }

    /// Write `content` to `path` on the branch.
    ///
    /// Returns the outcome together with the cursor for the next commit.
    #[instrument(skip(self, content, cursor), fields(hoard = %self.repo, branch = %self.branch))]
    pub fn commit_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        cursor: &CommitCursor,
    ) -> CommitResult<(CommitOutcome, CommitCursor)> {
        let tip = self.fresh_tip(cursor)?;
        let base_tree = self.storage.commit_tree(&self.repo, &tip)?;
        let blob = self.storage.create_blob(&self.repo, content)?;
        let tree = self
            .storage
            .create_tree(&self.repo, &base_tree, path, &blob)?;

        if tree == base_tree {
            info!(path, "content unchanged, nothing to commit");
            return Ok((
                CommitOutcome::Unchanged,
                CommitCursor {
                    observed_tip: Some(tip),
                    committed: false,
                },
            ));
        }

        let sha = self
            .storage
            .create_commit(&self.repo, message, &tree, &tip)?;
        self.publish(&sha)?;
        info!(path, %sha, parent = %tip, "committed");

        Ok((
            CommitOutcome::Committed { sha },
            CommitCursor {
                observed_tip: Some(tip),
                committed: true,
            },
        ))
    }

    /// Resolve the tip, waiting while it still equals the tip our previous
    /// commit was built on.
    fn fresh_tip(&self, cursor: &CommitCursor) -> CommitResult<String> {
        let mut attempt = 1;
        loop {
            let tip = self.storage.get_ref(&self.repo, &self.branch)?;
            if !cursor.is_stale(&tip) {
                return Ok(tip);
            }
            let Some(delay) = self.stale_read.delay_after(attempt) else {
                return Err(CommitError::ExhaustedRetries {
                    operation: "waiting for branch tip to advance",
                    attempts: attempt,
                    last_error: format!("{} still at {tip}", self.branch),
                });
            };
            debug!(%tip, attempt, ?delay, "branch tip not yet advanced, waiting");
            pause(delay);
            attempt += 1;
        }
    }

    /// Fast-forward the branch to `sha`, retrying rejected updates.
    fn publish(&self, sha: &str) -> CommitResult<()> {
        let mut attempt = 1;
        loop {
            let err = match self.storage.update_ref(&self.repo, &self.branch, sha) {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            let Some(delay) = self.update_ref.delay_after(attempt) else {
                return Err(CommitError::ExhaustedRetries {
                    operation: "updating branch ref",
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            };
            warn!(error = %err, attempt, ?delay, "ref update rejected, retrying");
            pause(delay);
            attempt += 1;
        }
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
