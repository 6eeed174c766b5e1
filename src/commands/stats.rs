//! Repository statistics command

use crate::config::Config;
use crate::error::Result;
use crate::github::{GitHubClient, RepoStats};
use crate::repo_name::RepoName;

const SHOWN_ITEMS: usize = 5;

/// Fetch the GitHub activity report for a repository
pub async fn cmd_stats(config: &Config, repo: &str) -> Result<RepoStats> {
    let name = RepoName::parse(repo)?;
    let client = GitHubClient::from_config(&config.github)?;
    client.repo_stats(&name).await
}

/// Print a repository report to console
pub fn print_repo_stats(stats: &RepoStats) {
    let repo = &stats.repository;
    println!("\n📊 {}\n", repo.full_name);
    if let Some(description) = &repo.description {
        println!("  {}", description);
    }
    println!("  URL: {}", repo.url);
    println!(
        "  ★ {}  Forks: {}  Watchers: {}",
        repo.stars, repo.forks, repo.watchers
    );
    if let Some(branch) = &repo.default_branch {
        println!("  Default branch: {}", branch);
    }
    if let Some(license) = &repo.license {
        println!("  License: {}", license);
    }
    if !repo.topics.is_empty() {
        println!("  Topics: {}", repo.topics.join(", "));
    }

    let m = &stats.metrics;
    println!("\nMetrics:");
    println!("  Contributors: {}", m.total_contributors);
    println!(
        "  Commits (last {} weeks): {}",
        stats.commit_activity.len(),
        m.total_commits_recent
    );
    println!("  Open PRs: {}  Open issues: {}", m.open_prs, m.open_issues);

    if !stats.languages.is_empty() {
        let total: u64 = stats.languages.values().sum();
        let mut languages: Vec<_> = stats.languages.iter().collect();
        languages.sort_by(|a, b| b.1.cmp(a.1));
        println!("\nLanguages:");
        for (language, bytes) in languages.into_iter().take(SHOWN_ITEMS) {
            let share = if total == 0 { 0.0 } else { *bytes as f64 * 100.0 / total as f64 };
            println!("  {:<16} {:>5.1}%", language, share);
        }
    }

    if !stats.contributors.is_empty() {
        println!("\nTop contributors:");
        for c in stats.contributors.iter().take(SHOWN_ITEMS) {
            println!(
                "  {} ({} contributions)",
                c.login.as_deref().unwrap_or("anonymous"),
                c.contributions
            );
        }
    }

    let prs = &stats.pull_requests;
    println!(
        "\nPull requests (recent {}): {} open, {} merged, {} closed",
        prs.total, prs.open, prs.merged, prs.closed
    );
    for pr in prs.details.iter().take(SHOWN_ITEMS) {
        println!("  #{} [{}] {}", pr.number, pr.state, pr.title);
    }

    let issues = &stats.issues;
    println!(
        "\nIssues (recent {}): {} open, {} closed",
        issues.total, issues.open, issues.closed
    );
    for issue in issues.details.iter().take(SHOWN_ITEMS) {
        println!("  #{} [{}] {}", issue.number, issue.state, issue.title);
    }

    if !stats.releases.is_empty() {
        println!("\nReleases:");
        for release in stats.releases.iter().take(SHOWN_ITEMS) {
            let pre = if release.prerelease { " (pre-release)" } else { "" };
            println!(
                "  {} {}{}",
                release.tag_name,
                release.published_at.as_deref().unwrap_or(""),
                pre
            );
        }
    }
}
