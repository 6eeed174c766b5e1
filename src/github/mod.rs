//! GitHub REST client
//!
//! Used to confirm a repository exists before it is queued, and to gather
//! the activity report shown by `repograph stats`:
//! - Repository information (stars, forks, license, topics)
//! - Contributors, recent pull requests and issues
//! - Weekly commit activity, languages and releases

mod types;

pub use types::{
    AuthorInfo, CommitActivity, ContributorInfo, IssueDetail, IssueStats, Metrics,
    PullRequestDetail, PullRequestStats, ReleaseInfo, RepoStats, RepositoryInfo,
};

use crate::config::GitHubConfig;
use crate::error::{Error, Result};
use crate::repo_name::RepoName;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};
use types::{ApiCommitWeek, ApiContributor, ApiIssue, ApiPullRequest, ApiRelease, ApiRepository};

const MAX_CONTRIBUTORS: u32 = 30;
const MAX_PULL_REQUESTS: u32 = 50;
const MAX_ISSUES: u32 = 50;
const MAX_RELEASES: u32 = 10;
const ACTIVITY_WEEKS: usize = 12;

/// Thin client over the GitHub REST API
pub struct GitHubClient {
    client: Client,
    api_url: String,
}

impl GitHubClient {
    /// Create a client authenticated with the token from `config.token_env`
    pub fn from_config(config: &GitHubConfig) -> Result<Self> {
        let token = config.token();
        if token.is_none() {
            warn!(
                "{} is not set; GitHub requests are unauthenticated and strictly rate limited",
                config.token_env
            );
        }
        Self::new(config, token)
    }

    pub fn new(config: &GitHubConfig, token: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("token {}", token.trim())).map_err(|_| {
                Error::Config(format!("{} is not a valid token", config.token_env))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| Error::GitHub(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET a JSON resource. `None` means GitHub has no such resource (404)
    /// or has not finished computing it yet (202).
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let url = format!("{}/{}", self.api_url, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).query(query).send().await?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.json::<T>().await?)),
            StatusCode::ACCEPTED => {
                debug!("GitHub is still computing {}", url);
                Ok(None)
            }
            StatusCode::NOT_FOUND => {
                warn!("GitHub API 404: {}", url);
                Ok(None)
            }
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimited(
                format!("GitHub API rate limit exceeded: {}", url),
            )),
            status => Err(Error::GitHub(format!("{} returned {}", url, status))),
        }
    }

    /// Basic repository information, `None` if the repository does not exist
    pub async fn repo_info(&self, name: &RepoName) -> Result<Option<RepositoryInfo>> {
        let repo: Option<ApiRepository> = self.get(&repo_path(name, ""), &[]).await?;
        Ok(repo.map(RepositoryInfo::from))
    }

    pub async fn contributors(&self, name: &RepoName) -> Result<Vec<ContributorInfo>> {
        let query = [
            ("per_page", MAX_CONTRIBUTORS.to_string()),
            ("anon", "false".to_string()),
        ];
        let contributors: Option<Vec<ApiContributor>> =
            self.get(&repo_path(name, "/contributors"), &query).await?;
        Ok(contributors
            .unwrap_or_default()
            .into_iter()
            .map(ContributorInfo::from)
            .collect())
    }

    /// The most recently updated pull requests in any state
    pub async fn pull_requests(&self, name: &RepoName) -> Result<PullRequestStats> {
        let query = recent_query(MAX_PULL_REQUESTS);
        let prs: Option<Vec<ApiPullRequest>> =
            self.get(&repo_path(name, "/pulls"), &query).await?;
        Ok(PullRequestStats::from_api(prs.unwrap_or_default()))
    }

    /// The most recently updated issues in any state
    pub async fn issues(&self, name: &RepoName) -> Result<IssueStats> {
        let query = recent_query(MAX_ISSUES);
        let issues: Option<Vec<ApiIssue>> = self.get(&repo_path(name, "/issues"), &query).await?;
        Ok(IssueStats::from_api(issues.unwrap_or_default()))
    }

    /// Weekly commit totals for the last twelve weeks
    pub async fn commit_activity(&self, name: &RepoName) -> Result<Vec<CommitActivity>> {
        let weeks: Vec<ApiCommitWeek> = self
            .get(&repo_path(name, "/stats/commit_activity"), &[])
            .await?
            .unwrap_or_default();
        let skip = weeks.len().saturating_sub(ACTIVITY_WEEKS);
        Ok(weeks.into_iter().skip(skip).map(CommitActivity::from).collect())
    }

    /// Bytes of code per language
    pub async fn languages(&self, name: &RepoName) -> Result<BTreeMap<String, u64>> {
        let languages: Option<BTreeMap<String, u64>> =
            self.get(&repo_path(name, "/languages"), &[]).await?;
        Ok(languages.unwrap_or_default())
    }

    pub async fn releases(&self, name: &RepoName) -> Result<Vec<ReleaseInfo>> {
        let query = [("per_page", MAX_RELEASES.to_string())];
        let releases: Option<Vec<ApiRelease>> =
            self.get(&repo_path(name, "/releases"), &query).await?;
        Ok(releases
            .unwrap_or_default()
            .into_iter()
            .map(ReleaseInfo::from)
            .collect())
    }

    /// Gather every section concurrently.
    ///
    /// The repository itself must resolve; a section that fails is logged
    /// and reported empty.
    pub async fn repo_stats(&self, name: &RepoName) -> Result<RepoStats> {
        info!("Fetching repository stats for {}", name);

        let (repository, contributors, pull_requests, issues, commit_activity, languages, releases) = tokio::join!(
            self.repo_info(name),
            self.contributors(name),
            self.pull_requests(name),
            self.issues(name),
            self.commit_activity(name),
            self.languages(name),
            self.releases(name),
        );

        let repository = repository?.ok_or_else(|| Error::UnknownRepository(name.full_name()))?;

        let mut stats = RepoStats {
            status: "success".to_string(),
            repo: name.full_name(),
            repository,
            contributors: or_empty("contributors", contributors),
            pull_requests: or_empty("pull requests", pull_requests),
            issues: or_empty("issues", issues),
            commit_activity: or_empty("commit activity", commit_activity),
            languages: or_empty("languages", languages),
            releases: or_empty("releases", releases),
            metrics: Metrics::default(),
        };
        stats.metrics = Metrics::of(&stats);
        Ok(stats)
    }
}

fn repo_path(name: &RepoName, rest: &str) -> String {
    format!("repos/{}/{}{}", name.owner, name.repo, rest)
}

fn recent_query(per_page: u32) -> [(&'static str, String); 4] {
    [
        ("state", "all".to_string()),
        ("per_page", per_page.to_string()),
        ("sort", "updated".to_string()),
        ("direction", "desc".to_string()),
    ]
}

fn or_empty<T: Default>(section: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        error!("Error fetching {}: {}", section, e);
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GitHubClient {
        let config = GitHubConfig {
            api_url: server.uri(),
            ..Default::default()
        };
        GitHubClient::new(&config, Some("secret".to_string())).unwrap()
    }

    fn name(input: &str) -> RepoName {
        RepoName::parse(input).unwrap()
    }

    async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn repo_body() -> serde_json::Value {
        json!({
            "name": "Example",
            "full_name": "OpenAI/Example",
            "description": "An example",
            "html_url": "https://github.com/OpenAI/Example",
            "stargazers_count": 42,
            "forks_count": 7,
            "watchers_count": 42,
            "open_issues_count": 3,
            "default_branch": "main",
            "topics": ["graphs"],
            "license": {"name": "MIT License"}
        })
    }

    #[tokio::test]
    async fn test_repo_info_found_and_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/openai/example"))
            .and(header("authorization", "token secret"))
            .and(header("accept", "application/vnd.github.v3+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_body()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let info = client.repo_info(&name("openai/example")).await.unwrap().unwrap();
        assert_eq!(info.full_name, "OpenAI/Example");
        assert_eq!(info.stars, 42);
        assert_eq!(info.license.as_deref(), Some("MIT License"));

        assert!(client.repo_info(&name("openai/missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .repo_info(&name("openai/example"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_repo_stats_aggregates_sections() {
        let server = MockServer::start().await;
        mount_json(&server, "/repos/OpenAI/Example", repo_body()).await;
        mount_json(
            &server,
            "/repos/OpenAI/Example/contributors",
            json!([
                {"login": "alice", "html_url": "https://github.com/alice", "contributions": 10, "type": "User"},
                {"login": "bot", "contributions": 2, "type": "Bot"}
            ]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/repos/OpenAI/Example/pulls"))
            .and(query_param("state", "all"))
            .and(query_param("per_page", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"number": 3, "title": "open", "state": "open", "user": {"login": "alice"}},
                {"number": 2, "title": "merged", "state": "closed", "merged_at": "2025-01-01T00:00:00Z"},
                {"number": 1, "title": "dropped", "state": "closed", "merged_at": null}
            ])))
            .mount(&server)
            .await;
        mount_json(
            &server,
            "/repos/OpenAI/Example/issues",
            json!([
                {"number": 5, "title": "bug", "state": "open", "labels": [{"name": "bug"}]},
                {"number": 4, "title": "old", "state": "closed"},
                {"number": 3, "title": "open", "state": "open", "pull_request": {"url": "x"}}
            ]),
        )
        .await;
        let weeks: Vec<serde_json::Value> = (0..14i64)
            .map(|i| json!({"week": 1_735_516_800 + i * 604_800, "total": i, "days": [i, 0, 0, 0, 0, 0, 0]}))
            .collect();
        mount_json(&server, "/repos/OpenAI/Example/stats/commit_activity", json!(weeks)).await;
        mount_json(
            &server,
            "/repos/OpenAI/Example/languages",
            json!({"Rust": 9000, "Shell": 120}),
        )
        .await;
        mount_json(
            &server,
            "/repos/OpenAI/Example/releases",
            json!([{"tag_name": "v1.0.0", "name": "One", "prerelease": false}]),
        )
        .await;

        let stats = client_for(&server)
            .repo_stats(&name("https://github.com/OpenAI/Example"))
            .await
            .unwrap();

        assert_eq!(stats.status, "success");
        assert_eq!(stats.repo, "OpenAI/Example");
        assert_eq!(stats.contributors.len(), 2);
        assert_eq!(stats.contributors[1].kind, "Bot");
        assert_eq!(stats.contributors[0].profile_url.as_deref(), Some("https://github.com/alice"));

        assert_eq!(
            (stats.pull_requests.open, stats.pull_requests.merged, stats.pull_requests.closed),
            (1, 1, 1)
        );
        assert_eq!(stats.pull_requests.details[0].author.login.as_deref(), Some("alice"));

        assert_eq!((stats.issues.open, stats.issues.closed, stats.issues.total), (1, 1, 2));
        assert_eq!(stats.issues.details[0].labels, ["bug"]);

        // Only the last twelve weeks are kept
        assert_eq!(stats.commit_activity.len(), ACTIVITY_WEEKS);
        assert_eq!(stats.commit_activity[0].total, 2);
        assert_eq!(stats.commit_activity[0].week, "2025-01-13");

        assert_eq!(stats.languages.get("Rust"), Some(&9000));
        assert_eq!(stats.releases[0].tag_name, "v1.0.0");

        assert_eq!(
            stats.metrics,
            Metrics {
                total_contributors: 2,
                total_commits_recent: (2..14u64).sum(),
                stars: 42,
                forks: 7,
                open_prs: 1,
                open_issues: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_repo_stats_unknown_repository() {
        let server = MockServer::start().await;

        let err = client_for(&server)
            .repo_stats(&name("openai/missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownRepository(_)));
        assert_eq!(err.to_string(), "Repository openai/missing not found");
    }

    #[tokio::test]
    async fn test_failed_sections_are_left_empty() {
        let server = MockServer::start().await;
        mount_json(&server, "/repos/openai/example", repo_body()).await;
        Mock::given(method("GET"))
            .and(path("/repos/openai/example/contributors"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/openai/example/stats/commit_activity"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let stats = client_for(&server)
            .repo_stats(&name("openai/example"))
            .await
            .unwrap();
        assert!(stats.contributors.is_empty());
        assert!(stats.commit_activity.is_empty());
        assert_eq!(stats.pull_requests, PullRequestStats::default());
        assert_eq!(stats.metrics.total_contributors, 0);
        assert_eq!(stats.metrics.stars, 42);
    }
}
