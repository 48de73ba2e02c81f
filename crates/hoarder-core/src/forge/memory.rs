//! In-memory forge for protocol tests.
//!
//! Models just enough of the git object store for the commit protocol:
//! content-addressed blobs and trees (so an identical write yields the
//! identical tree SHA), commits with one parent, and branch refs. Knobs
//! inject the failures the committer has to survive.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

use super::{CommitStorage, ForgeError, ForgeResult, MetricsSource, RepoSlug};
use crate::record::{DailyCount, RepoStatsSnapshot};

fn digest(kind: &str, parts: &[&str]) -> String {
    let mut hasher = DefaultHasher::new();
    kind.hash(&mut hasher);
    parts.hash(&mut hasher);
    format!("{kind}-{:016x}", hasher.finish())
}

#[derive(Debug, Clone)]
struct StoredCommit {
    tree: String,
    message: String,
}

#[derive(Debug, Default)]
struct State {
    blobs: HashMap<String, String>,
    trees: HashMap<String, BTreeMap<String, String>>,
    commits: HashMap<String, StoredCommit>,
    refs: HashMap<String, String>,
    previous_refs: HashMap<String, String>,

    update_ref_failures: usize,
    lagging_reads: usize,
    get_ref_status: Option<u16>,

    update_ref_calls: usize,
    created_commits: Vec<String>,
    created_refs: Vec<(String, String)>,
    traffic_calls: Vec<RepoSlug>,
}

/// Test double implementing both forge traits.
#[derive(Debug, Default)]
pub(crate) struct MemoryForge {
    state: Mutex<State>,
    orgs: HashMap<String, Vec<String>>,
    users: HashMap<String, Vec<String>>,
    stats: HashMap<RepoSlug, RepoStatsSnapshot>,
    views: HashMap<RepoSlug, Vec<DailyCount>>,
    clones: HashMap<RepoSlug, Vec<DailyCount>>,
    failing_traffic: HashSet<RepoSlug>,
}

impl MemoryForge {
    /// A forge whose hoard has a single `main` branch with an empty tree.
    pub(crate) fn new() -> Self {
        let forge = Self::default();
        {
            let mut state = forge.lock();
            let tree = digest("tree", &[]);
            state.trees.insert(tree.clone(), BTreeMap::new());
            let root = digest("commit", &[&tree, "root"]);
            state.commits.insert(
                root.clone(),
                StoredCommit {
                    tree,
                    message: "root".into(),
                },
            );
            state.refs.insert("main".into(), root);
        }
        forge
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ── configuration ────────────────────────────

    pub(crate) fn with_org(mut self, org: &str, repos: &[&str]) -> Self {
        self.orgs
            .insert(org.into(), repos.iter().map(|r| (*r).to_string()).collect());
        self
    }

    pub(crate) fn with_user(mut self, user: &str, repos: &[&str]) -> Self {
        self.users
            .insert(user.into(), repos.iter().map(|r| (*r).to_string()).collect());
        self
    }

    pub(crate) fn with_stats(mut self, repo: RepoSlug, stats: RepoStatsSnapshot) -> Self {
        self.stats.insert(repo, stats);
        self
    }

    pub(crate) fn with_views(mut self, repo: RepoSlug, views: Vec<DailyCount>) -> Self {
        self.views.insert(repo, views);
        self
    }

    pub(crate) fn with_clones(mut self, repo: RepoSlug, clones: Vec<DailyCount>) -> Self {
        self.clones.insert(repo, clones);
        self
    }

    pub(crate) fn with_failing_traffic(mut self, repo: RepoSlug) -> Self {
        self.failing_traffic.insert(repo);
        self
    }

    /// Store `content` at `path` on `branch`, creating the branch from
    /// `main` if needed.
    pub(crate) fn seed_file(&self, branch: &str, path: &str, content: &str) {
        let mut state = self.lock();
        let base = state
            .refs
            .get(branch)
            .or_else(|| state.refs.get("main"))
            .cloned()
            .unwrap_or_default();
        let base_tree = state
            .commits
            .get(&base)
            .map(|c| c.tree.clone())
            .unwrap_or_default();
        let mut entries = state.trees.get(&base_tree).cloned().unwrap_or_default();
        let blob = digest("blob", &[content]);
        state.blobs.insert(blob.clone(), content.to_string());
        entries.insert(path.to_string(), blob);
        let tree = tree_sha(&entries);
        state.trees.insert(tree.clone(), entries);
        let commit = digest("commit", &[&tree, &base, "seed"]);
        state.commits.insert(
            commit.clone(),
            StoredCommit {
                tree,
                message: "seed".into(),
            },
        );
        state.refs.insert(branch.to_string(), commit);
    }

    /// The next `n` ref updates fail with a conflict.
    pub(crate) fn fail_update_ref(&self, n: usize) {
        self.lock().update_ref_failures = n;
    }

    /// The next `n` ref reads return the value before the latest update.
    pub(crate) fn lag_ref_reads(&self, n: usize) {
        self.lock().lagging_reads = n;
    }

    /// Every ref read fails with `status`.
    pub(crate) fn fail_get_ref(&self, status: u16) {
        self.lock().get_ref_status = Some(status);
    }

    // ── inspection ───────────────────────────────

    pub(crate) fn tip(&self, branch: &str) -> Option<String> {
        self.lock().refs.get(branch).cloned()
    }

    pub(crate) fn read_file(&self, branch: &str, path: &str) -> Option<String> {
        let state = self.lock();
        let tip = state.refs.get(branch)?;
        let tree = &state.commits.get(tip)?.tree;
        let blob = state.trees.get(tree)?.get(path)?;
        state.blobs.get(blob).cloned()
    }

    pub(crate) fn commit_message(&self, sha: &str) -> Option<String> {
        self.lock().commits.get(sha).map(|c| c.message.clone())
    }

    pub(crate) fn created_commits(&self) -> Vec<String> {
        self.lock().created_commits.clone()
    }

    pub(crate) fn created_refs(&self) -> Vec<(String, String)> {
        self.lock().created_refs.clone()
    }

    pub(crate) fn update_ref_calls(&self) -> usize {
        self.lock().update_ref_calls
    }

    pub(crate) fn traffic_calls(&self) -> Vec<RepoSlug> {
        self.lock().traffic_calls.clone()
    }
}

fn tree_sha(entries: &BTreeMap<String, String>) -> String {
    let flat: Vec<&str> = entries
        .iter()
        .flat_map(|(path, blob)| [path.as_str(), blob.as_str()])
        .collect();
    digest("tree", &flat)
}

impl MetricsSource for MemoryForge {
    fn list_org_repos(&self, org: &str) -> ForgeResult<Vec<String>> {
        self.orgs
            .get(org)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("org {org}")))
    }

    fn list_user_repos(&self, user: &str) -> ForgeResult<Vec<String>> {
        self.users
            .get(user)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("user {user}")))
    }

    fn daily_views(&self, repo: &RepoSlug) -> ForgeResult<Vec<DailyCount>> {
        self.lock().traffic_calls.push(repo.clone());
        if self.failing_traffic.contains(repo) {
            return Err(ForgeError::Status {
                method: "GET",
                url: format!("views/{repo}"),
                status: 403,
            });
        }
        Ok(self.views.get(repo).cloned().unwrap_or_default())
    }

    fn daily_clones(&self, repo: &RepoSlug) -> ForgeResult<Vec<DailyCount>> {
        Ok(self.clones.get(repo).cloned().unwrap_or_default())
    }

    fn repo_stats(&self, repo: &RepoSlug) -> ForgeResult<RepoStatsSnapshot> {
        Ok(self.stats.get(repo).copied().unwrap_or_default())
    }
}

impl CommitStorage for MemoryForge {
    fn file_content(&self, _repo: &RepoSlug, branch: &str, path: &str) -> ForgeResult<Vec<u8>> {
        self.read_file(branch, path)
            .map(String::into_bytes)
            .ok_or_else(|| ForgeError::NotFound(format!("{branch}:{path}")))
    }

    fn get_ref(&self, _repo: &RepoSlug, branch: &str) -> ForgeResult<String> {
        let mut state = self.lock();
        if let Some(status) = state.get_ref_status {
            return Err(ForgeError::Status {
                method: "GET",
                url: format!("git/ref/heads/{branch}"),
                status,
            });
        }
        if state.lagging_reads > 0
            && let Some(previous) = state.previous_refs.get(branch).cloned()
        {
            state.lagging_reads -= 1;
            return Ok(previous);
        }
        state
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("heads/{branch}")))
    }

    fn create_ref(&self, _repo: &RepoSlug, branch: &str, sha: &str) -> ForgeResult<()> {
        let mut state = self.lock();
        state.refs.insert(branch.to_string(), sha.to_string());
        state.created_refs.push((branch.to_string(), sha.to_string()));
        Ok(())
    }

    fn commit_tree(&self, _repo: &RepoSlug, sha: &str) -> ForgeResult<String> {
        self.lock()
            .commits
            .get(sha)
            .map(|c| c.tree.clone())
            .ok_or_else(|| ForgeError::NotFound(format!("commit {sha}")))
    }

    fn create_blob(&self, _repo: &RepoSlug, content: &str) -> ForgeResult<String> {
        let sha = digest("blob", &[content]);
        self.lock().blobs.insert(sha.clone(), content.to_string());
        Ok(sha)
    }

    fn create_tree(
        &self,
        _repo: &RepoSlug,
        base_tree: &str,
        path: &str,
        blob_sha: &str,
    ) -> ForgeResult<String> {
        let mut state = self.lock();
        let mut entries = state
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("tree {base_tree}")))?;
        entries.insert(path.to_string(), blob_sha.to_string());
        let sha = tree_sha(&entries);
        state.trees.insert(sha.clone(), entries);
        Ok(sha)
    }

    fn create_commit(
        &self,
        _repo: &RepoSlug,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> ForgeResult<String> {
        let mut state = self.lock();
        let nonce = state.created_commits.len().to_string();
        let sha = digest("commit", &[tree, parent, message, &nonce]);
        state.commits.insert(
            sha.clone(),
            StoredCommit {
                tree: tree.to_string(),
                message: message.to_string(),
            },
        );
        state.created_commits.push(sha.clone());
        Ok(sha)
    }

    fn update_ref(&self, _repo: &RepoSlug, branch: &str, sha: &str) -> ForgeResult<()> {
        let mut state = self.lock();
        state.update_ref_calls += 1;
        if state.update_ref_failures > 0 {
            state.update_ref_failures -= 1;
            return Err(ForgeError::Status {
                method: "PATCH",
                url: format!("git/refs/heads/{branch}"),
                status: 422,
            });
        }
        if let Some(old) = state.refs.insert(branch.to_string(), sha.to_string()) {
            state.previous_refs.insert(branch.to_string(), old);
        }
        Ok(())
    }
}
