//! GitHub implementation of the forge collaborators.
//!
//! Statistics come from the REST traffic endpoints and a GraphQL query for
//! stars and recent commit authors. Writes go through the git data API
//! (blobs, trees, commits, refs), so no local checkout is ever needed.

use std::fmt;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use super::{CommitStorage, ForgeError, ForgeResult, MetricsSource, RepoSlug};
use crate::record::{DailyCount, RepoStatsSnapshot};

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("hoarder/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

/// Commits sampled for the contributor count.
pub const CONTRIBUTOR_SAMPLE: u32 = 100;

const STATS_QUERY: &str = r"
query($owner: String!, $name: String!, $sample: Int!) {
  repository(owner: $owner, name: $name) {
    stargazerCount
    defaultBranchRef {
      target {
        ... on Commit {
          history(first: $sample) {
            totalCount
            nodes { author { user { login } } }
          }
        }
      }
    }
  }
}";

/// Connection settings for [`GithubClient`].
#[derive(Clone)]
pub struct GithubClientConfig {
    /// REST base URL (e.g. `https://api.github.com` or `https://ghe.example/api/v3`).
    pub api_url: String,
    /// Bearer token, if any.
    pub token: Option<String>,
    /// Overall per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for GithubClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClientConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Blocking GitHub API client.
pub struct GithubClient {
    agent: ureq::Agent,
    api_url: String,
    graphql_url: String,
    authorization: Option<String>,
}

impl fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_url", &self.api_url)
            .field("authenticated", &self.authorization.is_some())
            .finish_non_exhaustive()
    }
}

impl GithubClient {
    /// Build a client for the given endpoint and credential.
    pub fn new(config: GithubClientConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        let api_url = config.api_url.trim_end_matches('/').to_string();
        Self {
            agent,
            graphql_url: graphql_url(&api_url),
            api_url,
            authorization: config.token.map(|t| format!("Bearer {t}")),
        }
    }

    fn repo_url(&self, repo: &RepoSlug, rest: &str) -> String {
        format!("{}/repos/{}/{}/{rest}", self.api_url, repo.owner, repo.name)
    }

    fn prepare<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let request = request
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION);
        match self.authorization {
            Some(ref auth) => request.header("Authorization", auth.as_str()),
            None => request,
        }
    }

    fn get<T: DeserializeOwned>(&self, url: &str) -> ForgeResult<T> {
        debug!(%url, "GET");
        let result = self.prepare(self.agent.get(url)).call();
        read_json("GET", url, result)
    }

    fn post<T: DeserializeOwned>(&self, url: &str, body: &serde_json::Value) -> ForgeResult<T> {
        debug!(%url, "POST");
        let result = self.prepare(self.agent.post(url)).send_json(body);
        read_json("POST", url, result)
    }

    fn patch(&self, url: &str, body: &serde_json::Value) -> ForgeResult<()> {
        debug!(%url, "PATCH");
        self.prepare(self.agent.patch(url))
            .send_json(body)
            .map(drop)
            .map_err(|e| map_error("PATCH", url, e))
    }

    fn list_repos(&self, scope: &str, account: &str) -> ForgeResult<Vec<String>> {
        let mut names = Vec::new();
        let mut page = 1;
        loop {
            let url = format!(
                "{}/{scope}/{account}/repos?type=public&per_page={PAGE_SIZE}&page={page}",
                self.api_url
            );
            let repos: Vec<RepoName> = self.get(&url)?;
            let last_page = repos.len() < PAGE_SIZE;
            names.extend(repos.into_iter().map(|r| r.name));
            if last_page {
                break;
            }
            page += 1;
        }
        debug!(scope, account, count = names.len(), "listed repositories");
        Ok(names)
    }
}

/// GitHub serves GraphQL next to the REST root; Enterprise REST roots end
/// in `/v3` and GraphQL sits at `/api/graphql`.
fn graphql_url(api_url: &str) -> String {
    let root = api_url.strip_suffix("/v3").unwrap_or(api_url);
    format!("{root}/graphql")
}

fn read_json<T: DeserializeOwned>(
    method: &'static str,
    url: &str,
    result: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> ForgeResult<T> {
    let mut response = result.map_err(|e| map_error(method, url, e))?;
    response
        .body_mut()
        .read_json::<T>()
        .map_err(|e| ForgeError::Payload {
            url: url.to_string(),
            message: e.to_string(),
        })
}

fn map_error(method: &'static str, url: &str, err: ureq::Error) -> ForgeError {
    match err {
        ureq::Error::StatusCode(404) => ForgeError::NotFound(url.to_string()),
        ureq::Error::StatusCode(status) => ForgeError::Status {
            method,
            url: url.to_string(),
            status,
        },
        other => ForgeError::Transport {
            method,
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}

// ──────────────────────────────────────────────
// Response shapes
// ──────────────────────────────────────────────

#[derive(Deserialize)]
struct RepoName {
    name: String,
}

#[derive(Deserialize)]
struct TrafficSeries {
    #[serde(default, alias = "clones")]
    views: Vec<TrafficEntry>,
}

#[derive(Deserialize)]
struct TrafficEntry {
    timestamp: String,
    count: u64,
    uniques: u64,
}

#[derive(Deserialize)]
struct ShaObject {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaObject,
}

#[derive(Deserialize)]
struct CommitResponse {
    tree: ShaObject,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlMessage>,
}

#[derive(Deserialize)]
struct GraphQlMessage {
    message: String,
}

#[derive(Deserialize)]
struct StatsData {
    repository: Option<StatsRepository>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsRepository {
    stargazer_count: u64,
    default_branch_ref: Option<BranchRef>,
}

#[derive(Deserialize)]
struct BranchRef {
    target: Option<BranchTarget>,
}

#[derive(Deserialize)]
struct BranchTarget {
    history: Option<CommitHistory>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitHistory {
    total_count: u64,
    #[serde(default)]
    nodes: Vec<HistoryNode>,
}

#[derive(Deserialize)]
struct HistoryNode {
    author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    user: Option<AuthorUser>,
}

#[derive(Deserialize)]
struct AuthorUser {
    login: String,
}

fn daily_counts(url: &str, series: TrafficSeries) -> ForgeResult<Vec<DailyCount>> {
    series
        .views
        .into_iter()
        .map(|entry| {
            let day = entry.timestamp.split('T').next().unwrap_or_default();
            let date = day
                .parse::<NaiveDate>()
                .map_err(|e| ForgeError::Payload {
                    url: url.to_string(),
                    message: format!("bad timestamp {:?}: {e}", entry.timestamp),
                })?;
            Ok(DailyCount {
                date,
                count: entry.count,
                uniques: entry.uniques,
            })
        })
        .collect()
}

fn stats_from_response(
    repo: &RepoSlug,
    response: GraphQlResponse<StatsData>,
) -> ForgeResult<RepoStatsSnapshot> {
    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(ForgeError::GraphQl(messages.join("; ")));
    }

    let repository = response
        .data
        .and_then(|d| d.repository)
        .ok_or_else(|| ForgeError::NotFound(format!("repository {repo}")))?;

    let history = repository
        .default_branch_ref
        .and_then(|r| r.target)
        .and_then(|t| t.history);

    let Some(history) = history else {
        // Empty repository: no default branch yet.
        return Ok(RepoStatsSnapshot {
            stargazers: repository.stargazer_count,
            ..RepoStatsSnapshot::default()
        });
    };

    Ok(RepoStatsSnapshot::from_commit_authors(
        repository.stargazer_count,
        history.total_count,
        history.nodes.iter().map(|node| {
            node.author
                .as_ref()
                .and_then(|a| a.user.as_ref())
                .map(|u| u.login.as_str())
        }),
    ))
}

fn decode_content(path: &str, content: ContentResponse) -> ForgeResult<Vec<u8>> {
    if content.encoding != "base64" {
        return Err(ForgeError::Payload {
            url: path.to_string(),
            message: format!("unsupported content encoding {:?}", content.encoding),
        });
    }
    let packed: String = content
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(packed).map_err(|e| ForgeError::Payload {
        url: path.to_string(),
        message: format!("invalid base64 content: {e}"),
    })
}

// ──────────────────────────────────────────────
// Trait implementations
// ──────────────────────────────────────────────

impl MetricsSource for GithubClient {
    #[instrument(skip(self))]
    fn list_org_repos(&self, org: &str) -> ForgeResult<Vec<String>> {
        self.list_repos("orgs", org)
    }

    #[instrument(skip(self))]
    fn list_user_repos(&self, user: &str) -> ForgeResult<Vec<String>> {
        self.list_repos("users", user)
    }

    fn daily_views(&self, repo: &RepoSlug) -> ForgeResult<Vec<DailyCount>> {
        let url = self.repo_url(repo, "traffic/views?per=day");
        let series: TrafficSeries = self.get(&url)?;
        daily_counts(&url, series)
    }

    fn daily_clones(&self, repo: &RepoSlug) -> ForgeResult<Vec<DailyCount>> {
        let url = self.repo_url(repo, "traffic/clones?per=day");
        let series: TrafficSeries = self.get(&url)?;
        daily_counts(&url, series)
    }

    #[instrument(skip(self), fields(%repo))]
    fn repo_stats(&self, repo: &RepoSlug) -> ForgeResult<RepoStatsSnapshot> {
        let body = json!({
            "query": STATS_QUERY,
            "variables": {
                "owner": repo.owner,
                "name": repo.name,
                "sample": CONTRIBUTOR_SAMPLE,
            },
        });
        let response: GraphQlResponse<StatsData> = self.post(&self.graphql_url, &body)?;
        stats_from_response(repo, response)
    }
}

impl CommitStorage for GithubClient {
    fn file_content(&self, repo: &RepoSlug, branch: &str, path: &str) -> ForgeResult<Vec<u8>> {
        let url = self.repo_url(repo, &format!("contents/{path}?ref={branch}"));
        let content: ContentResponse = self.get(&url)?;
        decode_content(path, content)
    }

    fn get_ref(&self, repo: &RepoSlug, branch: &str) -> ForgeResult<String> {
        let url = self.repo_url(repo, &format!("git/ref/heads/{branch}"));
        let reference: RefResponse = self.get(&url)?;
        Ok(reference.object.sha)
    }

    fn create_ref(&self, repo: &RepoSlug, branch: &str, sha: &str) -> ForgeResult<()> {
        let url = self.repo_url(repo, "git/refs");
        let body = json!({ "ref": format!("refs/heads/{branch}"), "sha": sha });
        let _: RefResponse = self.post(&url, &body)?;
        Ok(())
    }

    fn commit_tree(&self, repo: &RepoSlug, sha: &str) -> ForgeResult<String> {
        let url = self.repo_url(repo, &format!("git/commits/{sha}"));
        let commit: CommitResponse = self.get(&url)?;
        Ok(commit.tree.sha)
    }

    fn create_blob(&self, repo: &RepoSlug, content: &str) -> ForgeResult<String> {
        let url = self.repo_url(repo, "git/blobs");
        let body = json!({ "content": content, "encoding": "utf-8" });
        let blob: ShaObject = self.post(&url, &body)?;
        Ok(blob.sha)
    }

    fn create_tree(
        &self,
        repo: &RepoSlug,
        base_tree: &str,
        path: &str,
        blob_sha: &str,
    ) -> ForgeResult<String> {
        let url = self.repo_url(repo, "git/trees");
        let body = json!({
            "base_tree": base_tree,
            "tree": [{ "path": path, "mode": "100644", "type": "blob", "sha": blob_sha }],
        });
        let tree: ShaObject = self.post(&url, &body)?;
        Ok(tree.sha)
    }

    fn create_commit(
        &self,
        repo: &RepoSlug,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> ForgeResult<String> {
        let url = self.repo_url(repo, "git/commits");
        let body = json!({ "message": message, "tree": tree, "parents": [parent] });
        let commit: ShaObject = self.post(&url, &body)?;
        Ok(commit.sha)
    }

    fn update_ref(&self, repo: &RepoSlug, branch: &str, sha: &str) -> ForgeResult<()> {
        let url = self.repo_url(repo, &format!("git/refs/heads/{branch}"));
        self.patch(&url, &json!({ "sha": sha, "force": false }))
    }
}
