//! Custom error types for repograph

use crate::meta::{IndexingStatus, ACTIVE_GRAPH_INDEX};
use thiserror::Error;

/// Main error type for repograph operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    InvalidRepository(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Repository already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Graph name already in use by a live repository: {0}")]
    GraphNameTaken(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Cannot move {id} from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: IndexingStatus,
        to: IndexingStatus,
    },

    #[error("GitHub API error: {0}")]
    GitHub(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Repository {0} not found")]
    UnknownRepository(String),

    #[error("Not initialized: run 'repograph init' first")]
    NotInitialized,

    #[error("Already initialized at {0}")]
    AlreadyInitialized(String),
}

/// Result type alias for repograph
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Translate a storage-level constraint failure into a typed error.
    ///
    /// `name` and `graph_name` are the values the statement was writing,
    /// used for the uniqueness messages. Anything that is not a constraint
    /// failure is passed through as [`Error::Database`].
    pub(crate) fn from_write(err: sqlx::Error, name: &str, graph_name: &str) -> Self {
        use sqlx::error::ErrorKind;

        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    let message = db_err.message();
                    if message.contains(".graph_name") || message.contains(ACTIVE_GRAPH_INDEX) {
                        return Error::GraphNameTaken(graph_name.to_string());
                    }
                    return Error::AlreadyRegistered(name.to_string());
                }
                ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                    return Error::ConstraintViolation(db_err.message().to_string())
                }
                _ => {}
            }
        }
        Error::Database(err)
    }
}
