//! Lifecycle commands: complete, fail, requeue, remove

use super::live_row;
use crate::error::Result;
use crate::meta::{IndexedRepository, MetaDb};
use crate::repo_name::RepoName;

/// Record a finished graph build for a repository
pub async fn cmd_complete(
    db: &MetaDb,
    repo: &str,
    node_count: u64,
    edge_count: u64,
) -> Result<IndexedRepository> {
    let row = live_row(db, repo).await?;
    db.mark_completed(&row.id, node_count, edge_count).await
}

/// Record a failed graph build for a repository
pub async fn cmd_fail(db: &MetaDb, repo: &str, error: &str) -> Result<IndexedRepository> {
    let row = live_row(db, repo).await?;
    db.mark_failed(&row.id, error).await
}

/// Start over with a fresh pending row
pub async fn cmd_requeue(
    db: &MetaDb,
    repo: &str,
    requested_by: Option<String>,
) -> Result<IndexedRepository> {
    let name = RepoName::parse(repo)?;
    db.requeue(&name.full_name(), requested_by).await
}

/// Soft-delete a repository's live row
pub async fn cmd_remove(db: &MetaDb, repo: &str) -> Result<IndexedRepository> {
    let row = live_row(db, repo).await?;
    db.soft_delete(&row.id).await
}
