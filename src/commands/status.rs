//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::meta::{MetaDb, RegistryStats};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub graph_name_prefix: String,
    pub stats: RegistryStats,
}

/// Get registry status
pub async fn cmd_status(config: &Config, db: &MetaDb) -> Result<StatusInfo> {
    info!("Getting status");

    let stats = db.stats().await?;

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        graph_name_prefix: config.graph.name_prefix.clone(),
        stats,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 repograph Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!("Graph name prefix: {:?}", status.graph_name_prefix);
    println!("\nRegistry:");
    println!("  Repositories: {}", status.stats.total);
    println!("    Pending: {}", status.stats.pending);
    println!("    Completed: {}", status.stats.completed);
    println!("    Failed: {}", status.stats.failed);
    println!("  Removed: {}", status.stats.deleted);
    println!(
        "  Graph size: {} nodes, {} edges",
        status.stats.total_nodes, status.stats.total_edges
    );
}
