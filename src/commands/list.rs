//! List and show commands

use crate::config::Config;
use crate::error::{Error, Result};
use crate::meta::{IndexedRepository, IndexingStatus, MetaDb, RepositoryFilter};
use crate::repo_name::RepoName;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Options for listing registry rows
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub status: Option<IndexingStatus>,
    pub requested_by: Option<String>,
    /// Include soft-deleted rows
    pub all: bool,
    /// Falls back to `list.default_limit`
    pub limit: Option<u32>,
}

/// Current row and full history for one repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryDetails {
    pub repository_full_name: String,
    pub current: Option<IndexedRepository>,
    pub history: Vec<IndexedRepository>,
}

/// List registry rows
pub async fn cmd_list(
    config: &Config,
    db: &MetaDb,
    options: ListOptions,
) -> Result<Vec<IndexedRepository>> {
    info!("Listing repositories");

    let filter = RepositoryFilter {
        status: options.status,
        indexed_by_discord_id: options.requested_by,
        include_deleted: options.all,
        limit: Some(options.limit.unwrap_or(config.list.default_limit)),
    };
    db.list(&filter).await
}

/// Show one repository, including deleted attempts
pub async fn cmd_show(db: &MetaDb, repo: &str) -> Result<RepositoryDetails> {
    let name = RepoName::parse(repo)?;
    let full_name = name.full_name();

    let history = db.history(&full_name).await?;
    if history.is_empty() {
        return Err(Error::NotFound(full_name));
    }
    let current = history.iter().find(|row| !row.is_deleted).cloned();

    Ok(RepositoryDetails {
        repository_full_name: full_name,
        current,
        history,
    })
}

fn status_marker(row: &IndexedRepository) -> &'static str {
    if row.is_deleted {
        return "✗";
    }
    match row.status() {
        Ok(IndexingStatus::Completed) => "✓",
        Ok(IndexingStatus::Failed) => "⚠",
        _ => "…",
    }
}

/// Print a single row to console
pub fn print_repository(row: &IndexedRepository) {
    let deleted = if row.is_deleted { " (deleted)" } else { "" };
    println!(
        "{} {} [{}]{}",
        status_marker(row),
        row.repository_full_name,
        row.indexing_status,
        deleted
    );
    println!("  ID: {}", row.id);
    println!("  Graph: {}", row.graph_name);
    if let Some(requester) = &row.indexed_by_discord_id {
        println!("  Requested by: {}", requester);
    }
    if let Some(indexed_at) = row.indexed_at {
        println!("  Indexed: {}", indexed_at.to_rfc3339());
        println!("  Nodes: {}, Edges: {}", row.node_count, row.edge_count);
    }
    if let Some(error) = &row.last_error {
        println!("  Last error: {}", error);
    }
    println!("  Created: {}", row.created_at.to_rfc3339());
    println!("  Updated: {}", row.updated_at.to_rfc3339());
}

/// Print a list of rows to console
pub fn print_repositories(rows: &[IndexedRepository]) {
    println!("\n📚 Indexed Repositories\n");

    if rows.is_empty() {
        println!("No repositories registered. Use 'repograph add owner/repo' to add one.");
        return;
    }

    for row in rows {
        print_repository(row);
        println!();
    }
}

/// Print details for one repository
pub fn print_details(details: &RepositoryDetails) {
    match &details.current {
        Some(row) => print_repository(row),
        None => println!("{} has no live entry", details.repository_full_name),
    }

    let previous: Vec<_> = details.history.iter().filter(|r| r.is_deleted).collect();
    if !previous.is_empty() {
        println!("\nPrevious attempts:");
        for row in previous {
            println!(
                "  {} [{}] created {}",
                row.id,
                row.indexing_status,
                row.created_at.to_rfc3339()
            );
        }
    }
}
