//! Default values for configuration

/// Default size of the SQLite connection pool
pub fn default_max_connections() -> u32 {
    5
}

/// Default time to wait on a locked database, in seconds
pub fn default_busy_timeout_secs() -> u64 {
    5
}

/// Default prefix for derived graph names
pub fn default_graph_name_prefix() -> String {
    std::env::var("REPOGRAPH_GRAPH_PREFIX").unwrap_or_else(|_| "repo_".to_string())
}

/// Default number of rows shown by `list`
pub fn default_list_limit() -> u32 {
    50
}

/// Default GitHub REST API root
pub fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

/// Default environment variable holding the GitHub token
pub fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

/// Default GitHub request timeout, in seconds
pub fn default_github_timeout_secs() -> u64 {
    60
}

/// Default User-Agent sent to GitHub
pub fn default_github_user_agent() -> String {
    format!("repograph/{}", env!("CARGO_PKG_VERSION"))
}

/// Database file name, kept next to the config file
pub const DB_FILE_NAME: &str = "registry.db";

/// Config file name inside the base directory
pub const CONFIG_FILE_NAME: &str = "config.toml";
