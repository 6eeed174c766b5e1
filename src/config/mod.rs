//! Configuration management for repograph
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// SQLite connection settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Graph naming settings
    #[serde(default)]
    pub graph: GraphConfig,

    /// Listing settings
    #[serde(default)]
    pub list: ListConfig,

    /// GitHub API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// SQLite connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

/// Graph naming settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Prefix used when a graph name is derived from the repository name
    #[serde(default = "default_graph_name_prefix")]
    pub name_prefix: String,
}

/// Listing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    /// Rows returned by `list` when no limit is given
    #[serde(default = "default_list_limit")]
    pub default_limit: u32,
}

/// GitHub API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API root (GitHub Enterprise: `https://host/api/v3`)
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Environment variable the token is read from
    #[serde(default = "default_github_token_env")]
    pub token_env: String,

    /// Whole-request timeout
    #[serde(default = "default_github_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_github_user_agent")]
    pub user_agent: String,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for repograph data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            name_prefix: default_graph_name_prefix(),
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_limit: default_list_limit(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            token_env: default_github_token_env(),
            timeout_secs: default_github_timeout_secs(),
            user_agent: default_github_user_agent(),
        }
    }
}

impl GitHubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Token from the configured environment variable, if set and non-empty
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

impl PathsConfig {
    /// Paths rooted at `base`
    pub fn under(base: PathBuf) -> Self {
        Self {
            config_file: base.join(CONFIG_FILE_NAME),
            db_file: base.join(DB_FILE_NAME),
            base_dir: base,
        }
    }
}

impl Config {
    /// Get the default base directory for repograph (~/.repograph)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".repograph")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join(CONFIG_FILE_NAME)
    }

    /// Initialize paths configuration
    pub(crate) fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig::under(base);
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Set up paths based on config file location
        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join(DB_FILE_NAME),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Check if repograph is initialized (config and DB exist)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists() && self.paths.db_file.exists()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        if !self
            .graph
            .name_prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(Error::Config(format!(
                "graph.name_prefix may only contain [a-z0-9_], got '{}'",
                self.graph.name_prefix
            )));
        }

        if self.list.default_limit == 0 {
            return Err(Error::Config(
                "list.default_limit must be at least 1".to_string(),
            ));
        }

        if let Err(e) = url::Url::parse(&self.github.api_url) {
            return Err(Error::Config(format!(
                "github.api_url is not a valid URL ('{}'): {}",
                self.github.api_url, e
            )));
        }

        if self.github.timeout_secs == 0 {
            return Err(Error::Config(
                "github.timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
