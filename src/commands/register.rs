//! Register command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::github::GitHubClient;
use crate::meta::{IndexedRepository, MetaDb, NewIndexedRepository};
use crate::repo_name::RepoName;
use tracing::{debug, info};

/// Options for registering a repository
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Explicit graph name; derived from the repository name when absent
    pub graph_name: Option<String>,
    /// Discord ID of the requester
    pub requested_by: Option<String>,
    /// Look the repository up on GitHub first and store its canonical name
    pub verify: bool,
}

/// Queue a repository for graph indexing
pub async fn cmd_register(
    config: &Config,
    db: &MetaDb,
    repo: &str,
    options: RegisterOptions,
) -> Result<IndexedRepository> {
    let mut name = RepoName::parse(repo)?;
    if options.verify {
        name = verify_on_github(config, &name).await?;
    }
    let graph_name = options
        .graph_name
        .unwrap_or_else(|| name.graph_name(&config.graph.name_prefix));
    debug!("Registering {} with graph name '{}'", name, graph_name);

    let new = NewIndexedRepository::new(&name, graph_name).requested_by(options.requested_by);
    db.register(&new).await
}

/// Confirm the repository exists and return it as GitHub spells it
async fn verify_on_github(config: &Config, name: &RepoName) -> Result<RepoName> {
    let client = GitHubClient::from_config(&config.github)?;
    let info = client
        .repo_info(name)
        .await?
        .ok_or_else(|| Error::UnknownRepository(name.full_name()))?;

    let canonical = RepoName::parse(&info.full_name)?;
    if canonical != *name {
        info!("GitHub knows {} as {}", name, canonical);
    }
    Ok(canonical)
}
