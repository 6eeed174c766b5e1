//! SQLite schema definition
//!
//! The DDL itself lives in `migrations/` and is embedded at compile time.

use sqlx::migrate::Migrator;

/// Embedded migrations for the registry database
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Registry table name
pub const TABLE: &str = "indexed_repositories";

/// Trigger that refreshes `updated_at` on every update
pub const UPDATED_AT_TRIGGER: &str = "update_indexed_repositories_updated_at";

/// Partial unique index: one live row per repository name, ignoring case
pub const ACTIVE_NAME_INDEX: &str = "idx_indexed_repositories_active_name";

/// Partial unique index: one live row per graph name
pub const ACTIVE_GRAPH_INDEX: &str = "idx_indexed_repositories_active_graph";

/// Lookup indexes created alongside the table
pub const LOOKUP_INDEXES: &[&str] = &[
    "idx_indexed_repositories_full_name",
    "idx_indexed_repositories_status",
    "idx_indexed_repositories_is_deleted",
    "idx_indexed_repositories_discord_id",
];

/// Columns in definition order
pub const COLUMNS: &[&str] = &[
    "id",
    "repository_full_name",
    "graph_name",
    "indexing_status",
    "indexed_by_discord_id",
    "indexed_at",
    "node_count",
    "edge_count",
    "last_error",
    "is_deleted",
    "created_at",
    "updated_at",
];
