//! repograph CLI entry point

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use repograph::{
    commands::{
        cmd_complete, cmd_fail, cmd_init, cmd_list, cmd_register, cmd_remove, cmd_requeue,
        cmd_show, cmd_stats, cmd_status, print_details, print_repo_stats, print_repositories,
        print_repository, print_status, ListOptions, RegisterOptions,
    },
    config::Config,
    error::{Error, Result},
    meta::{IndexedRepository, IndexingStatus, MetaDb},
};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "repograph")]
#[command(version, about = "Registry of repositories indexed into a code graph", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "REPOGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize repograph configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Queue a repository for graph indexing
    Add {
        /// Repository as owner/repo or GitHub URL
        repo: String,

        /// Graph name (defaults to one derived from the repository)
        #[arg(short, long)]
        graph_name: Option<String>,

        /// Discord ID of the requester
        #[arg(long)]
        requested_by: Option<String>,

        /// Check the repository exists on GitHub and store its canonical name
        #[arg(long)]
        verify: bool,
    },

    /// Mark a pending repository as indexed
    Complete {
        /// Repository as owner/repo or GitHub URL
        repo: String,

        /// Number of nodes in the built graph
        #[arg(long)]
        nodes: u64,

        /// Number of edges in the built graph
        #[arg(long)]
        edges: u64,
    },

    /// Mark a pending repository as failed
    Fail {
        /// Repository as owner/repo or GitHub URL
        repo: String,

        /// Diagnostic message
        #[arg(short, long)]
        error: String,
    },

    /// Retire the current entry and queue the repository again
    Requeue {
        /// Repository as owner/repo or GitHub URL
        repo: String,

        /// Discord ID of the requester (defaults to the previous one)
        #[arg(long)]
        requested_by: Option<String>,
    },

    /// Remove a repository from the registry (soft delete)
    Remove {
        /// Repository as owner/repo or GitHub URL
        repo: String,
    },

    /// Show a repository and its previous attempts
    Show {
        /// Repository as owner/repo or GitHub URL
        repo: String,
    },

    /// List registered repositories
    List {
        /// Only show this status
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// Only show repositories requested by this Discord ID
        #[arg(long)]
        requested_by: Option<String>,

        /// Include removed entries
        #[arg(long)]
        all: bool,

        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Show registry status
    Status,

    /// Fetch GitHub activity statistics for a repository
    Stats {
        /// Repository as owner/repo or GitHub URL
        repo: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    Completed,
    Failed,
}

impl From<StatusArg> for IndexingStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => IndexingStatus::Pending,
            StatusArg::Completed => IndexingStatus::Completed,
            StatusArg::Failed => IndexingStatus::Failed,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so --json output on stdout stays parseable
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Handle init command specially (doesn't need existing config)
    if let Commands::Init { force } = cli.command {
        return handle_init(cli.config, force).await;
    }

    // Handle completions command (doesn't need config/db)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "repograph", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    // Stats talks to GitHub only
    if let Commands::Stats { repo } = &cli.command {
        let stats = cmd_stats(&config, repo).await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            print_repo_stats(&stats);
        }
        return Ok(());
    }

    let db = MetaDb::connect(&config).await?;
    db.migrate().await?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } | Commands::Stats { .. } => {
            unreachable!()
        }

        Commands::Add {
            repo,
            graph_name,
            requested_by,
            verify,
        } => {
            let options = RegisterOptions {
                graph_name,
                requested_by,
                verify,
            };
            let row = cmd_register(&config, &db, &repo, options).await?;
            emit(&row, cli.json, "Queued")?;
        }

        Commands::Complete { repo, nodes, edges } => {
            let row = cmd_complete(&db, &repo, nodes, edges).await?;
            emit(&row, cli.json, "Completed")?;
        }

        Commands::Fail { repo, error } => {
            let row = cmd_fail(&db, &repo, &error).await?;
            emit(&row, cli.json, "Marked failed")?;
        }

        Commands::Requeue { repo, requested_by } => {
            let row = cmd_requeue(&db, &repo, requested_by).await?;
            emit(&row, cli.json, "Requeued")?;
        }

        Commands::Remove { repo } => {
            let row = cmd_remove(&db, &repo).await?;
            emit(&row, cli.json, "Removed")?;
        }

        Commands::Show { repo } => {
            let details = cmd_show(&db, &repo).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&details)?);
            } else {
                print_details(&details);
            }
        }

        Commands::List {
            status,
            requested_by,
            all,
            limit,
        } => {
            let options = ListOptions {
                status: status.map(IndexingStatus::from),
                requested_by,
                all,
                limit,
            };
            let rows = cmd_list(&config, &db, options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_repositories(&rows);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config, &db).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

fn emit(row: &IndexedRepository, json: bool, verb: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(row)?);
    } else {
        println!("✓ {} {}", verb, row.repository_full_name);
        print_repository(row);
    }
    Ok(())
}

async fn handle_init(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    // A .toml path names the config file itself; anything else is a directory
    let base_dir = config_path.map(|path| {
        if path.extension().map_or(false, |e| e == "toml") {
            path.parent()
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_base_dir)
        } else {
            path
        }
    });

    let config = cmd_init(base_dir, force).await?;

    println!("✓ repograph initialized successfully");
    println!("  Config: {}", config.paths.config_file.display());
    println!("  Database: {}", config.paths.db_file.display());
    println!("\nNext steps:");
    println!("  repograph add owner/repo --verify    # Queue a repository");
    println!("  repograph complete owner/repo --nodes N --edges M");
    println!("  repograph status                     # Registry overview");
    println!("  repograph stats owner/repo           # GitHub activity (reads $GITHUB_TOKEN)");

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        return Err(Error::NotInitialized);
    }

    Config::load(&config_path)
}
