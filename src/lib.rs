//! repograph - a registry of repositories indexed into a code graph
//!
//! This crate provides:
//! - The `indexed_repositories` SQLite schema and its migrations
//! - A typed access layer for registering repositories and recording
//!   indexing outcomes
//! - A GitHub client for verifying repositories and reporting their activity
//! - CLI commands for inspecting and maintaining the registry

pub mod commands;
pub mod config;
pub mod error;
pub mod github;
pub mod meta;
pub mod repo_name;

pub use config::Config;
pub use error::{Error, Result};
pub use meta::{IndexedRepository, IndexingStatus, MetaDb};
pub use repo_name::RepoName;
