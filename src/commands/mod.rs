//! CLI commands implementation

pub mod init;
pub mod list;
pub mod register;
pub mod stats;
pub mod status;
pub mod transition;

pub use init::*;
pub use list::*;
pub use register::*;
pub use stats::*;
pub use status::*;
pub use transition::*;

use crate::error::{Error, Result};
use crate::meta::{IndexedRepository, MetaDb};
use crate::repo_name::RepoName;

/// Resolve user input (`owner/repo` or a GitHub URL) to its live row
pub(crate) async fn live_row(db: &MetaDb, repo: &str) -> Result<IndexedRepository> {
    let name = RepoName::parse(repo)?;
    db.get_active(&name.full_name())
        .await?
        .ok_or_else(|| Error::NotFound(name.full_name()))
}
