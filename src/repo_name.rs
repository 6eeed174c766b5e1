//! Repository name parsing
//!
//! Accepts the forms people paste into a request (`owner/repo`, GitHub web
//! URLs, SSH remotes) and reduces them to the canonical `owner/repo` key
//! used by the registry. GitHub treats names case-insensitively, and so do
//! the registry and the derived graph names.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use url::Url;

const GITHUB_HOST: &str = "github.com";

/// Hex digits of the name hash appended to derived graph names
const GRAPH_HASH_LEN: usize = 8;

fn owner_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9][-a-zA-Z0-9]*$").expect("valid owner regex"))
}

fn repo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("valid repo regex"))
}

/// A GitHub repository identified by owner and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoName {
    pub owner: String,
    pub repo: String,
}

impl RepoName {
    /// Parse `owner/repo`, `https://github.com/owner/repo[.git]`,
    /// `git@github.com:owner/repo.git`, or a scheme-less
    /// `[www.]github.com/owner/repo` / `github.com:owner/repo`
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        let pair = if trimmed.contains("://") {
            url_pair(trimmed)
        } else if let Some(path) = host_path(trimmed) {
            split_pair(path)
        } else {
            split_pair(trimmed)
        };
        let (owner, repo) = pair.ok_or_else(|| invalid(input))?;

        if !owner_re().is_match(&owner) || !repo_re().is_match(&repo) || repo == "." || repo == ".." {
            return Err(invalid(input));
        }

        Ok(Self { owner, repo })
    }

    /// Canonical `owner/repo` key
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Graph name derived from the repository, e.g.
    /// `repo_vercel__next_js_3f0c9a1e`.
    ///
    /// The readable part folds `.`/`-`/`_` together, so a hash of the
    /// lowercased full name is appended. Two names map to the same graph
    /// only if they differ in case alone.
    pub fn graph_name(&self, prefix: &str) -> String {
        let hash = blake3::hash(self.full_name().to_ascii_lowercase().as_bytes()).to_hex();
        format!(
            "{}{}__{}_{}",
            prefix,
            sanitize(&self.owner),
            sanitize(&self.repo),
            &hash.as_str()[..GRAPH_HASH_LEN]
        )
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn split_pair(path: &str) -> Option<(String, String)> {
    let (owner, repo) = path.split_once('/')?;
    if repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Path after a scheme-less GitHub host (`github.com/`, `www.github.com/`,
/// `github.com:`, `git@github.com:`)
fn host_path(input: &str) -> Option<&str> {
    let rest = input.strip_prefix("git@").unwrap_or(input);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let rest = rest.strip_prefix(GITHUB_HOST)?;
    rest.strip_prefix('/').or_else(|| rest.strip_prefix(':'))
}

fn url_pair(raw: &str) -> Option<(String, String)> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.host_str(), Some(GITHUB_HOST) | Some("www.github.com")) {
        return None;
    }
    let mut segments = url.path_segments()?;
    // Deeper paths (tree/main/src, pull/1) still identify the repository.
    match (segments.next(), segments.next()) {
        (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
            Some((owner.to_string(), repo.to_string()))
        }
        _ => None,
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn invalid(input: &str) -> Error {
    Error::InvalidRepository(format!(
        "Invalid repository format: '{}'. Expected: 'owner/repo' or 'https://github.com/owner/repo'",
        input.trim()
    ))
}
