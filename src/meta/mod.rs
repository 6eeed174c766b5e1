//! Registry storage using SQLite
//!
//! This module owns the `indexed_repositories` table:
//! - Registration of repositories queued for graph indexing
//! - Status transitions (pending -> completed / failed)
//! - Soft deletion and requeueing
//! - Aggregate statistics

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::repo_name::RepoName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle state of a repository's code graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexingStatus {
    Pending,
    Completed,
    Failed,
}

impl IndexingStatus {
    pub const ALL: [IndexingStatus; 3] = [
        IndexingStatus::Pending,
        IndexingStatus::Completed,
        IndexingStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndexingStatus::Pending => "pending",
            IndexingStatus::Completed => "completed",
            IndexingStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for IndexingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(IndexingStatus::Pending),
            "completed" => Ok(IndexingStatus::Completed),
            "failed" => Ok(IndexingStatus::Failed),
            _ => Err(Error::InvalidInput(format!("Unknown indexing status: {}", s))),
        }
    }
}

/// One row of `indexed_repositories`
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct IndexedRepository {
    pub id: String,
    pub repository_full_name: String,
    pub graph_name: String,
    pub indexing_status: String,
    pub indexed_by_discord_id: Option<String>,
    pub indexed_at: Option<DateTime<Utc>>,
    pub node_count: i64,
    pub edge_count: i64,
    pub last_error: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IndexedRepository {
    pub fn status(&self) -> Result<IndexingStatus> {
        self.indexing_status.parse()
    }
}

/// Fields supplied when registering a repository; everything else is
/// filled in by column defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIndexedRepository {
    pub repository_full_name: String,
    pub graph_name: String,
    pub indexed_by_discord_id: Option<String>,
}

impl NewIndexedRepository {
    pub fn new(name: &RepoName, graph_name: impl Into<String>) -> Self {
        Self {
            repository_full_name: name.full_name(),
            graph_name: graph_name.into(),
            indexed_by_discord_id: None,
        }
    }

    pub fn requested_by(mut self, discord_id: Option<String>) -> Self {
        self.indexed_by_discord_id = discord_id;
        self
    }
}

/// Filter for [`MetaDb::list`]
#[derive(Debug, Clone, Default)]
pub struct RepositoryFilter {
    pub status: Option<IndexingStatus>,
    pub indexed_by_discord_id: Option<String>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
}

/// Registry-wide counts
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Live (non-deleted) rows
    pub total: i64,
    pub pending: i64,
    pub completed: i64,
    pub failed: i64,
    /// Soft-deleted rows
    pub deleted: i64,
    /// Node/edge sums over live completed rows
    pub total_nodes: i64,
    pub total_edges: i64,
}

/// Registry database handle
#[derive(Clone)]
pub struct MetaDb {
    pool: SqlitePool,
}

impl MetaDb {
    /// Connect to the registry database described by `config`
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(
            &config.paths.db_file,
            config.database.max_connections,
            config.database.busy_timeout(),
        )
        .await
    }

    /// Open a database at `db_path` with default pool settings and apply
    /// any pending migrations
    pub async fn new(db_path: &Path) -> Result<Self> {
        let defaults = crate::config::DatabaseConfig::default();
        let db = Self::open(db_path, defaults.max_connections, defaults.busy_timeout()).await?;
        db.migrate().await?;
        Ok(db)
    }

    async fn open(db_path: &Path, max_connections: u32, busy_timeout: Duration) -> Result<Self> {
        // Create parent directory if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(busy_timeout);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Applying database migrations");
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    /// Check if the registry table exists
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(TABLE)
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    /// Underlying pool, for callers that need raw SQL
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ===== Registration =====

    /// Register a repository in `pending` state
    pub async fn register(&self, new: &NewIndexedRepository) -> Result<IndexedRepository> {
        if new.graph_name.trim().is_empty() {
            return Err(Error::InvalidInput("graph name must not be empty".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let inserted = sqlx::query(
            r#"
            INSERT INTO indexed_repositories (id, repository_full_name, graph_name, indexed_by_discord_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.repository_full_name)
        .bind(&new.graph_name)
        .bind(&new.indexed_by_discord_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = inserted {
            let err = Error::from_write(e, &new.repository_full_name, &new.graph_name);
            // Both live indexes can reject one insert; the name clash wins
            if matches!(err, Error::GraphNameTaken(_))
                && self.get_active(&new.repository_full_name).await?.is_some()
            {
                return Err(Error::AlreadyRegistered(new.repository_full_name.clone()));
            }
            return Err(err);
        }

        info!(
            "Registered {} as graph '{}'",
            new.repository_full_name, new.graph_name
        );
        self.get(&id)
            .await?
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    // ===== Lookups =====

    /// Get a row by ID, deleted or not
    pub async fn get(&self, id: &str) -> Result<Option<IndexedRepository>> {
        let row = sqlx::query_as::<_, IndexedRepository>(
            "SELECT * FROM indexed_repositories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Get the live row for a repository name (case-insensitive)
    pub async fn get_active(&self, full_name: &str) -> Result<Option<IndexedRepository>> {
        let row = sqlx::query_as::<_, IndexedRepository>(
            "SELECT * FROM indexed_repositories WHERE repository_full_name = ? COLLATE NOCASE AND is_deleted = 0",
        )
        .bind(full_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// All rows ever recorded for a repository name, newest first
    pub async fn history(&self, full_name: &str) -> Result<Vec<IndexedRepository>> {
        let rows = sqlx::query_as::<_, IndexedRepository>(
            r#"
            SELECT * FROM indexed_repositories
            WHERE repository_full_name = ? COLLATE NOCASE
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(full_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// List rows matching `filter`, newest first
    pub async fn list(&self, filter: &RepositoryFilter) -> Result<Vec<IndexedRepository>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM indexed_repositories WHERE 1 = 1");

        if !filter.include_deleted {
            qb.push(" AND is_deleted = 0");
        }
        if let Some(status) = filter.status {
            qb.push(" AND indexing_status = ").push_bind(status.as_str());
        }
        if let Some(discord_id) = &filter.indexed_by_discord_id {
            qb.push(" AND indexed_by_discord_id = ").push_bind(discord_id.clone());
        }
        qb.push(" ORDER BY created_at DESC, rowid DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = qb
            .build_query_as::<IndexedRepository>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ===== Transitions =====

    /// Record a successful indexing run
    pub async fn mark_completed(
        &self,
        id: &str,
        node_count: u64,
        edge_count: u64,
    ) -> Result<IndexedRepository> {
        let node_count = to_count("node_count", node_count)?;
        let edge_count = to_count("edge_count", edge_count)?;

        let result = sqlx::query(
            r#"
            UPDATE indexed_repositories SET
                indexing_status = 'completed',
                indexed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                node_count = ?,
                edge_count = ?,
                last_error = NULL
            WHERE id = ? AND indexing_status = 'pending' AND is_deleted = 0
            "#,
        )
        .bind(node_count)
        .bind(edge_count)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.rejected_transition(id, IndexingStatus::Completed).await);
        }

        let row = self.expect_row(id).await?;
        info!(
            "Indexed {} ({} nodes, {} edges)",
            row.repository_full_name, node_count, edge_count
        );
        Ok(row)
    }

    /// Record a failed indexing run
    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<IndexedRepository> {
        let result = sqlx::query(
            r#"
            UPDATE indexed_repositories SET
                indexing_status = 'failed',
                last_error = ?
            WHERE id = ? AND indexing_status = 'pending' AND is_deleted = 0
            "#,
        )
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.rejected_transition(id, IndexingStatus::Failed).await);
        }

        let row = self.expect_row(id).await?;
        info!("Indexing failed for {}: {}", row.repository_full_name, error);
        Ok(row)
    }

    /// Soft-delete a live row, freeing its repository name
    pub async fn soft_delete(&self, id: &str) -> Result<IndexedRepository> {
        let result =
            sqlx::query("UPDATE indexed_repositories SET is_deleted = 1 WHERE id = ? AND is_deleted = 0")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        let row = self.expect_row(id).await?;
        info!("Removed {} from the registry", row.repository_full_name);
        Ok(row)
    }

    /// Replace the live row for `full_name` with a fresh pending one.
    ///
    /// The old row is soft-deleted and kept as history. The new row reuses
    /// the graph name; the requester defaults to the previous one.
    ///
    /// The transaction opens with a write, so the write lock is taken (and
    /// waited for under the busy timeout) before any snapshot is read.
    pub async fn requeue(
        &self,
        full_name: &str,
        requested_by: Option<String>,
    ) -> Result<IndexedRepository> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, IndexedRepository>(
            r#"
            UPDATE indexed_repositories SET is_deleted = 1
            WHERE repository_full_name = ? COLLATE NOCASE AND is_deleted = 0
            RETURNING *
            "#,
        )
        .bind(full_name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(full_name.to_string()))?;

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO indexed_repositories (id, repository_full_name, graph_name, indexed_by_discord_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&current.repository_full_name)
        .bind(&current.graph_name)
        .bind(requested_by.or(current.indexed_by_discord_id))
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::from_write(e, &current.repository_full_name, &current.graph_name))?;

        tx.commit().await?;

        info!(
            "Requeued {} (previous status: {})",
            full_name, current.indexing_status
        );
        self.expect_row(&id).await
    }

    // ===== Statistics =====

    /// Counts per status over live rows
    pub async fn stats(&self) -> Result<RegistryStats> {
        let stats = sqlx::query_as::<_, RegistryStats>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN is_deleted = 0 THEN 1 ELSE 0 END), 0) AS total,
                COALESCE(SUM(CASE WHEN is_deleted = 0 AND indexing_status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN is_deleted = 0 AND indexing_status = 'completed' THEN 1 ELSE 0 END), 0) AS completed,
                COALESCE(SUM(CASE WHEN is_deleted = 0 AND indexing_status = 'failed' THEN 1 ELSE 0 END), 0) AS failed,
                COALESCE(SUM(CASE WHEN is_deleted = 1 THEN 1 ELSE 0 END), 0) AS deleted,
                COALESCE(SUM(CASE WHEN is_deleted = 0 AND indexing_status = 'completed' THEN node_count ELSE 0 END), 0) AS total_nodes,
                COALESCE(SUM(CASE WHEN is_deleted = 0 AND indexing_status = 'completed' THEN edge_count ELSE 0 END), 0) AS total_edges
            FROM indexed_repositories
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn expect_row(&self, id: &str) -> Result<IndexedRepository> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Explain why a guarded status update matched no row
    async fn rejected_transition(&self, id: &str, to: IndexingStatus) -> Error {
        let row = match self.get(id).await {
            Ok(Some(row)) if !row.is_deleted => row,
            Ok(_) => return Error::NotFound(id.to_string()),
            Err(e) => return e,
        };
        match row.status() {
            Ok(from) => {
                warn!(
                    "Rejected transition of {} from {} to {}",
                    row.repository_full_name, from, to
                );
                Error::InvalidTransition {
                    id: id.to_string(),
                    from,
                    to,
                }
            }
            Err(e) => e,
        }
    }
}

fn to_count(field: &str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::InvalidInput(format!("{} out of range: {}", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_test_db() -> (MetaDb, TempDir) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.db_file = tmp.path().join("test.db");

        let db = MetaDb::connect(&config).await.unwrap();
        db.migrate().await.unwrap();
        (db, tmp)
    }

    fn new_repo(full_name: &str, graph_name: &str) -> NewIndexedRepository {
        NewIndexedRepository::new(&RepoName::parse(full_name).unwrap(), graph_name)
    }

    async fn pause() {
        // Timestamps carry millisecond precision
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_schema_objects_exist() {
        let (db, _tmp) = setup_test_db().await;
        assert!(db.is_initialized().await.unwrap());

        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE tbl_name = ? AND type IN ('index', 'trigger')",
        )
        .bind(TABLE)
        .fetch_all(db.pool())
        .await
        .unwrap();

        assert!(names.iter().any(|n| n == ACTIVE_NAME_INDEX));
        assert!(names.iter().any(|n| n == ACTIVE_GRAPH_INDEX));
        assert!(names.iter().any(|n| n == UPDATED_AT_TRIGGER));
        for index in LOOKUP_INDEXES {
            assert!(names.iter().any(|n| n == index), "missing {index}");
        }

        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('indexed_repositories')")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(columns, COLUMNS);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let (db, _tmp) = setup_test_db().await;
        db.migrate().await.unwrap();
        assert!(db.is_initialized().await.unwrap());
    }

    #[tokio::test]
    async fn test_register_applies_defaults() {
        let (db, _tmp) = setup_test_db().await;

        let row = db
            .register(&new_repo("openai/example", "graph_123"))
            .await
            .unwrap();

        assert_eq!(row.repository_full_name, "openai/example");
        assert_eq!(row.graph_name, "graph_123");
        assert_eq!(row.status().unwrap(), IndexingStatus::Pending);
        assert_eq!(row.node_count, 0);
        assert_eq!(row.edge_count, 0);
        assert!(!row.is_deleted);
        assert!(row.indexed_at.is_none());
        assert!(row.last_error.is_none());
        assert!(row.indexed_by_discord_id.is_none());
        assert_eq!(row.created_at, row.updated_at);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_graph_name() {
        let (db, _tmp) = setup_test_db().await;
        let err = db.register(&new_repo("a/b", "  ")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_duplicate_live_name_rejected() {
        let (db, _tmp) = setup_test_db().await;

        db.register(&new_repo("openai/example", "g1")).await.unwrap();
        let err = db
            .register(&new_repo("openai/example", "g2"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(ref name) if name == "openai/example"));

        let live = db.list(&RepositoryFilter::default()).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].graph_name, "g1");
    }

    #[tokio::test]
    async fn test_soft_delete_frees_name() {
        let (db, _tmp) = setup_test_db().await;

        let first = db.register(&new_repo("openai/example", "g1")).await.unwrap();
        let deleted = db.soft_delete(&first.id).await.unwrap();
        assert!(deleted.is_deleted);
        assert!(db.get_active("openai/example").await.unwrap().is_none());

        let second = db.register(&new_repo("openai/example", "g2")).await.unwrap();
        assert_ne!(first.id, second.id);

        let history = db.history("openai/example").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert!(history[1].is_deleted);

        // Deleting twice is a miss
        let err = db.soft_delete(&first.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_status_rejected_by_storage() {
        let (db, _tmp) = setup_test_db().await;

        let err = sqlx::query(
            r#"
            INSERT INTO indexed_repositories (id, repository_full_name, graph_name, indexing_status)
            VALUES ('x', 'openai/example', 'g', 'archived')
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap_err();

        let err = Error::from_write(err, "openai/example", "g");
        assert!(matches!(err, Error::ConstraintViolation(_)), "{err:?}");
        assert!(db.get("x").await.unwrap().is_none());

        let row = db.register(&new_repo("openai/example", "g")).await.unwrap();
        let err = sqlx::query("UPDATE indexed_repositories SET indexing_status = 'archived' WHERE id = ?")
            .bind(&row.id)
            .execute(db.pool())
            .await
            .unwrap_err();
        assert!(matches!(
            Error::from_write(err, "openai/example", "g"),
            Error::ConstraintViolation(_)
        ));
    }

    #[tokio::test]
    async fn test_negative_counts_rejected_by_storage() {
        let (db, _tmp) = setup_test_db().await;
        let row = db.register(&new_repo("openai/example", "g")).await.unwrap();

        for column in ["node_count", "edge_count"] {
            let err = sqlx::query(&format!(
                "UPDATE indexed_repositories SET {column} = -1 WHERE id = ?"
            ))
            .bind(&row.id)
            .execute(db.pool())
            .await
            .unwrap_err();
            let err = Error::from_write(err, "openai/example", "g");
            assert!(matches!(err, Error::ConstraintViolation(_)), "{column}: {err:?}");
        }

        let unchanged = db.get(&row.id).await.unwrap().unwrap();
        assert_eq!(unchanged.node_count, 0);
        assert_eq!(unchanged.edge_count, 0);
    }

    #[tokio::test]
    async fn test_deleted_flag_rejects_other_values() {
        let (db, _tmp) = setup_test_db().await;
        let row = db.register(&new_repo("openai/example", "g")).await.unwrap();

        let err = sqlx::query("UPDATE indexed_repositories SET is_deleted = 2 WHERE id = ?")
            .bind(&row.id)
            .execute(db.pool())
            .await
            .unwrap_err();
        let err = Error::from_write(err, "openai/example", "g");
        assert!(matches!(err, Error::ConstraintViolation(_)), "{err:?}");

        let err = sqlx::query(
            r#"
            INSERT INTO indexed_repositories (id, repository_full_name, graph_name, is_deleted)
            VALUES ('x', 'other/repo', 'g2', -1)
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap_err();
        assert!(matches!(
            Error::from_write(err, "other/repo", "g2"),
            Error::ConstraintViolation(_)
        ));
        assert!(!db.get(&row.id).await.unwrap().unwrap().is_deleted);
    }

    #[tokio::test]
    async fn test_live_names_ignore_case() {
        let (db, _tmp) = setup_test_db().await;

        let first = db.register(&new_repo("OpenAI/Example", "g1")).await.unwrap();
        let err = db
            .register(&new_repo("openai/example", "g2"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(ref name) if name == "openai/example"));

        // Same name and same graph: still reported as a name clash
        let err = db
            .register(&new_repo("OPENAI/example", "g1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(_)), "{err:?}");

        // Lookups find the row whatever the spelling; the stored name keeps the first one
        let live = db.get_active("OPENAI/EXAMPLE").await.unwrap().unwrap();
        assert_eq!(live.id, first.id);
        assert_eq!(live.repository_full_name, "OpenAI/Example");

        let fresh = db.requeue("openai/Example", None).await.unwrap();
        assert_eq!(fresh.repository_full_name, "OpenAI/Example");
        assert_eq!(db.history("openai/example").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_live_graph_names_are_unique() {
        let (db, _tmp) = setup_test_db().await;

        let first = db.register(&new_repo("vercel/next.js", "shared")).await.unwrap();
        let err = db
            .register(&new_repo("vercel/next_js", "shared"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GraphNameTaken(ref graph) if graph == "shared"), "{err:?}");
        assert!(db.get_active("vercel/next_js").await.unwrap().is_none());

        // Requeue hands the graph to the replacement row
        let fresh = db.requeue("vercel/next.js", None).await.unwrap();
        assert_eq!(fresh.graph_name, "shared");

        // Once the holder is removed the graph name is free again
        db.soft_delete(&fresh.id).await.unwrap();
        let other = db
            .register(&new_repo("vercel/next_js", "shared"))
            .await
            .unwrap();
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn test_requeue_alongside_concurrent_writers() {
        let (db, _tmp) = setup_test_db().await;
        db.register(&new_repo("openai/example", "g")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    db.requeue("openai/example", None).await.map(|_| ())
                } else {
                    let name = format!("other/repo-{i}");
                    db.register(&new_repo(&name, &format!("g{i}")))
                        .await
                        .map(|_| ())
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = db.history("openai/example").await.unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history.iter().filter(|row| !row.is_deleted).count(), 1);

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.deleted, 4);
    }

    #[tokio::test]
    async fn test_complete_scenario() {
        let (db, _tmp) = setup_test_db().await;

        let row = db
            .register(&new_repo("openai/example", "graph_123"))
            .await
            .unwrap();
        assert_eq!(row.status().unwrap(), IndexingStatus::Pending);

        pause().await;
        let done = db.mark_completed(&row.id, 540, 1200).await.unwrap();

        assert_eq!(done.status().unwrap(), IndexingStatus::Completed);
        assert_eq!(done.node_count, 540);
        assert_eq!(done.edge_count, 1200);
        assert!(done.indexed_at.is_some());
        assert!(done.updated_at > row.updated_at);
        assert_eq!(done.created_at, row.created_at);
    }

    #[tokio::test]
    async fn test_updated_at_refreshed_on_raw_update() {
        let (db, _tmp) = setup_test_db().await;
        let row = db.register(&new_repo("openai/example", "g")).await.unwrap();

        pause().await;
        sqlx::query("UPDATE indexed_repositories SET indexed_by_discord_id = '42' WHERE id = ?")
            .bind(&row.id)
            .execute(db.pool())
            .await
            .unwrap();
        let after = db.get(&row.id).await.unwrap().unwrap();
        assert!(after.updated_at > row.updated_at);

        // An explicit older value does not move the column backwards
        sqlx::query(
            "UPDATE indexed_repositories SET updated_at = '2000-01-01T00:00:00.000Z' WHERE id = ?",
        )
        .bind(&row.id)
        .execute(db.pool())
        .await
        .unwrap();
        let rewound = db.get(&row.id).await.unwrap().unwrap();
        assert!(rewound.updated_at >= after.updated_at);
    }

    #[tokio::test]
    async fn test_mark_failed() {
        let (db, _tmp) = setup_test_db().await;
        let row = db.register(&new_repo("openai/example", "g")).await.unwrap();

        let failed = db.mark_failed(&row.id, "clone timed out").await.unwrap();
        assert_eq!(failed.status().unwrap(), IndexingStatus::Failed);
        assert_eq!(failed.last_error.as_deref(), Some("clone timed out"));
        assert!(failed.indexed_at.is_none());
        assert_eq!(failed.node_count, 0);
    }

    #[tokio::test]
    async fn test_transitions_happen_once() {
        let (db, _tmp) = setup_test_db().await;
        let row = db.register(&new_repo("openai/example", "g")).await.unwrap();
        db.mark_failed(&row.id, "boom").await.unwrap();

        let err = db.mark_completed(&row.id, 1, 1).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: IndexingStatus::Failed,
                to: IndexingStatus::Completed,
                ..
            }
        ));

        let err = db.mark_failed(&row.id, "again").await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let unchanged = db.get(&row.id).await.unwrap().unwrap();
        assert_eq!(unchanged.last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_transition_on_missing_or_deleted_row() {
        let (db, _tmp) = setup_test_db().await;

        let err = db.mark_completed("missing", 1, 1).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let row = db.register(&new_repo("openai/example", "g")).await.unwrap();
        db.soft_delete(&row.id).await.unwrap();
        let err = db.mark_failed(&row.id, "late").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_count_out_of_range() {
        let (db, _tmp) = setup_test_db().await;
        let row = db.register(&new_repo("openai/example", "g")).await.unwrap();
        let err = db.mark_completed(&row.id, u64::MAX, 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_requeue_replaces_live_row() {
        let (db, _tmp) = setup_test_db().await;
        let row = db
            .register(&new_repo("openai/example", "g").requested_by(Some("1001".to_string())))
            .await
            .unwrap();
        db.mark_failed(&row.id, "boom").await.unwrap();

        let fresh = db.requeue("openai/example", None).await.unwrap();
        assert_ne!(fresh.id, row.id);
        assert_eq!(fresh.status().unwrap(), IndexingStatus::Pending);
        assert_eq!(fresh.graph_name, "g");
        assert_eq!(fresh.indexed_by_discord_id.as_deref(), Some("1001"));
        assert!(fresh.last_error.is_none());

        let old = db.get(&row.id).await.unwrap().unwrap();
        assert!(old.is_deleted);
        assert_eq!(old.status().unwrap(), IndexingStatus::Failed);

        let again = db
            .requeue("openai/example", Some("2002".to_string()))
            .await
            .unwrap();
        assert_eq!(again.indexed_by_discord_id.as_deref(), Some("2002"));
        assert_eq!(db.history("openai/example").await.unwrap().len(), 3);

        let err = db.requeue("nobody/nothing", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_and_stats() {
        let (db, _tmp) = setup_test_db().await;

        let a = db
            .register(&new_repo("o/a", "ga").requested_by(Some("u1".to_string())))
            .await
            .unwrap();
        let b = db
            .register(&new_repo("o/b", "gb").requested_by(Some("u2".to_string())))
            .await
            .unwrap();
        let c = db
            .register(&new_repo("o/c", "gc").requested_by(Some("u1".to_string())))
            .await
            .unwrap();
        let d = db.register(&new_repo("o/d", "gd")).await.unwrap();

        db.mark_completed(&a.id, 10, 20).await.unwrap();
        db.mark_completed(&b.id, 5, 7).await.unwrap();
        db.mark_failed(&c.id, "nope").await.unwrap();
        db.soft_delete(&b.id).await.unwrap();

        let completed = db
            .list(&RepositoryFilter {
                status: Some(IndexingStatus::Completed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, a.id);

        let by_u1 = db
            .list(&RepositoryFilter {
                indexed_by_discord_id: Some("u1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_u1.len(), 2);

        let everything = db
            .list(&RepositoryFilter {
                include_deleted: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(everything.len(), 4);
        assert_eq!(everything[0].id, d.id);

        let limited = db
            .list(&RepositoryFilter {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);

        let stats = db.stats().await.unwrap();
        assert_eq!(
            stats,
            RegistryStats {
                total: 3,
                pending: 1,
                completed: 1,
                failed: 1,
                deleted: 1,
                total_nodes: 10,
                total_edges: 20,
            }
        );
    }

    #[tokio::test]
    async fn test_stats_on_empty_registry() {
        let (db, _tmp) = setup_test_db().await;
        assert_eq!(db.stats().await.unwrap(), RegistryStats::default());
    }

    #[test]
    fn test_status_round_trip() {
        for status in IndexingStatus::ALL {
            assert_eq!(status.to_string().parse::<IndexingStatus>().unwrap(), status);
        }
        assert_eq!(
            "COMPLETED".parse::<IndexingStatus>().unwrap(),
            IndexingStatus::Completed
        );
        assert!("archived".parse::<IndexingStatus>().is_err());
    }
}
