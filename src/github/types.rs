//! GitHub API payloads and the repository statistics report built from them

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ===== API payloads =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiUser {
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiLabel {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiLicense {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiRepository {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub watchers_count: u64,
    pub open_issues_count: u64,
    pub default_branch: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub pushed_at: Option<String>,
    pub topics: Vec<String>,
    pub license: Option<ApiLicense>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiContributor {
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub contributions: u64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiPullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub merged_at: Option<String>,
    pub user: Option<ApiUser>,
    pub labels: Vec<ApiLabel>,
    pub comments: u64,
    pub draft: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiIssue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    pub created_at: Option<String>,
    pub user: Option<ApiUser>,
    pub labels: Vec<ApiLabel>,
    pub comments: u64,
    /// Present when the issue is really a pull request
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCommitWeek {
    /// Unix timestamp of the start of the week
    #[serde(default)]
    pub week: i64,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "empty_week")]
    pub days: Vec<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiRelease {
    pub tag_name: String,
    pub name: Option<String>,
    pub published_at: Option<String>,
    pub html_url: Option<String>,
    pub prerelease: bool,
}

fn empty_week() -> Vec<u64> {
    vec![0; 7]
}

// ===== Report =====

/// Author of a pull request or issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorInfo {
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
    pub contributions: u64,
    /// `User` or `Bot`
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestDetail {
    pub number: u64,
    pub title: String,
    /// `open`, `merged` or `closed`
    pub state: String,
    pub url: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub author: AuthorInfo,
    pub labels: Vec<String>,
    pub comments: u64,
    pub draft: bool,
}

/// Counts over the most recently updated pull requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestStats {
    pub open: u64,
    pub closed: u64,
    pub merged: u64,
    pub total: u64,
    pub details: Vec<PullRequestDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueDetail {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub url: String,
    pub created_at: Option<String>,
    pub author: AuthorInfo,
    pub labels: Vec<String>,
    pub comments: u64,
}

/// Counts over the most recently updated issues, pull requests excluded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueStats {
    pub open: u64,
    pub closed: u64,
    pub total: u64,
    pub details: Vec<IssueDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitActivity {
    /// Week start as `YYYY-MM-DD` (UTC)
    pub week: String,
    pub total: u64,
    /// Commits per day, Sunday first
    pub days: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    pub name: Option<String>,
    pub published_at: Option<String>,
    pub url: Option<String>,
    pub prerelease: bool,
}

/// Basic repository information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    /// Canonical `owner/repo` as GitHub spells it
    pub full_name: String,
    pub description: Option<String>,
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues_count: u64,
    pub default_branch: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub pushed_at: Option<String>,
    pub topics: Vec<String>,
    pub license: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_contributors: u64,
    /// Commits over the weeks in `commit_activity`
    pub total_commits_recent: u64,
    pub stars: u64,
    pub forks: u64,
    pub open_prs: u64,
    pub open_issues: u64,
}

/// Everything `repograph stats` reports about one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoStats {
    pub status: String,
    pub repo: String,
    pub repository: RepositoryInfo,
    pub contributors: Vec<ContributorInfo>,
    pub pull_requests: PullRequestStats,
    pub issues: IssueStats,
    pub commit_activity: Vec<CommitActivity>,
    pub languages: BTreeMap<String, u64>,
    pub releases: Vec<ReleaseInfo>,
    pub metrics: Metrics,
}

// ===== Conversions =====

impl From<Option<ApiUser>> for AuthorInfo {
    fn from(user: Option<ApiUser>) -> Self {
        let user = user.unwrap_or_default();
        Self {
            login: user.login,
            avatar_url: user.avatar_url,
            profile_url: user.html_url,
        }
    }
}

impl From<ApiRepository> for RepositoryInfo {
    fn from(repo: ApiRepository) -> Self {
        Self {
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description,
            url: repo.html_url,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            watchers: repo.watchers_count,
            open_issues_count: repo.open_issues_count,
            default_branch: repo.default_branch,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            pushed_at: repo.pushed_at,
            topics: repo.topics,
            license: repo.license.and_then(|license| license.name),
        }
    }
}

impl From<ApiContributor> for ContributorInfo {
    fn from(c: ApiContributor) -> Self {
        Self {
            login: c.login,
            avatar_url: c.avatar_url,
            profile_url: c.html_url,
            contributions: c.contributions,
            kind: c.kind.unwrap_or_else(|| "User".to_string()),
        }
    }
}

impl From<ApiRelease> for ReleaseInfo {
    fn from(r: ApiRelease) -> Self {
        Self {
            tag_name: r.tag_name,
            name: r.name,
            published_at: r.published_at,
            url: r.html_url,
            prerelease: r.prerelease,
        }
    }
}

impl From<ApiCommitWeek> for CommitActivity {
    fn from(w: ApiCommitWeek) -> Self {
        let week = DateTime::from_timestamp(w.week, 0)
            .map(|start| start.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        Self {
            week,
            total: w.total,
            days: w.days,
        }
    }
}

fn label_names(labels: Vec<ApiLabel>) -> Vec<String> {
    labels.into_iter().filter_map(|label| label.name).collect()
}

impl PullRequestStats {
    /// Classify pull requests as open, merged or closed-unmerged
    pub(crate) fn from_api(prs: Vec<ApiPullRequest>) -> Self {
        let mut stats = Self {
            total: prs.len() as u64,
            ..Default::default()
        };

        for pr in prs {
            let state = if pr.state == "open" {
                stats.open += 1;
                "open"
            } else if pr.merged_at.is_some() {
                stats.merged += 1;
                "merged"
            } else {
                stats.closed += 1;
                "closed"
            };

            stats.details.push(PullRequestDetail {
                number: pr.number,
                title: pr.title,
                state: state.to_string(),
                url: pr.html_url,
                created_at: pr.created_at,
                updated_at: pr.updated_at,
                author: pr.user.into(),
                labels: label_names(pr.labels),
                comments: pr.comments,
                draft: pr.draft,
            });
        }
        stats
    }
}

impl IssueStats {
    /// Count issues, skipping the pull requests GitHub lists among them
    pub(crate) fn from_api(issues: Vec<ApiIssue>) -> Self {
        let details: Vec<IssueDetail> = issues
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .map(|issue| IssueDetail {
                number: issue.number,
                title: issue.title,
                state: issue.state,
                url: issue.html_url,
                created_at: issue.created_at,
                author: issue.user.into(),
                labels: label_names(issue.labels),
                comments: issue.comments,
            })
            .collect();

        Self {
            open: details.iter().filter(|i| i.state == "open").count() as u64,
            closed: details.iter().filter(|i| i.state == "closed").count() as u64,
            total: details.len() as u64,
            details,
        }
    }
}

impl Metrics {
    /// Summary figures derived from the rest of a report
    pub(crate) fn of(report: &RepoStats) -> Self {
        Self {
            total_contributors: report.contributors.len() as u64,
            total_commits_recent: report.commit_activity.iter().map(|w| w.total).sum(),
            stars: report.repository.stars,
            forks: report.repository.forks,
            open_prs: report.pull_requests.open,
            open_issues: report.issues.open,
        }
    }
}
