//! # issue-lens CLI (`ilens`)
//!
//! The `ilens` binary is the primary interface for issue-lens. It provides
//! commands for database initialization, issue scanning, cached-corpus
//! analysis, database statistics, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! ilens --config ./config/ilens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ilens init` | Create the SQLite database and schema |
//! | `ilens scan <repo>` | Cache a repository's open issues |
//! | `ilens analyze <repo> <question>` | Ask the local model about cached issues |
//! | `ilens stats` | Show cached repositories and counts |
//! | `ilens serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use issue_lens::store::IssueStore;
use issue_lens::{analyze, config, db, github, llm, migrate, scan, server, stats};

/// issue-lens CLI: a local-first GitHub issue cache with LLM-backed
/// analysis.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ilens.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ilens",
    about = "issue-lens — cache a repository's open issues locally and analyze them with a local LLM",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ilens.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the issues and scan_state
    /// tables. Idempotent; running it multiple times is safe.
    Init,

    /// Scan a repository's open issues into the local cache.
    ///
    /// The first scan walks upstream pages from the newest issue; later
    /// scans only fetch what changed since the previous one. A single
    /// invocation fetches at most 10 pages of 100 issues.
    Scan {
        /// Repository slug, e.g. `rust-lang/rust`.
        repo: String,
    },

    /// Ask the local language model a question about cached issues.
    ///
    /// Requires a prior `scan` of the repository. The newest cached issues
    /// are packed into a bounded context window and sent to the model with
    /// the question.
    Analyze {
        /// Repository slug, e.g. `rust-lang/rust`.
        repo: String,
        /// Free-text question about the cached issues.
        question: String,
    },

    /// Show database statistics.
    ///
    /// Prints total cached issues plus a per-repository breakdown with
    /// last-scan recency.
    Stats,

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// scan/analyze API plus the embedded UI.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
            pool.close().await;
        }
        Commands::Scan { repo } => {
            if !github::valid_repo_slug(&repo) {
                anyhow::bail!("repo must be an owner/name slug, got: '{}'", repo);
            }

            let pool = db::connect(&cfg.db.path).await?;
            let store = IssueStore::new(pool);
            let client = github::GithubClient::new(&cfg.github)?;

            let summary = scan::run_scan(&store, &client, &repo).await?;

            println!("scan {}", summary.repo);
            println!("  status:      {}", summary.status.as_str());
            println!("  fetched:     {} issues", summary.issues_fetched);
            println!("  new:         {}", summary.new_fetched);
            println!(
                "  scanned at:  {}",
                summary.last_scanned_at.format("%Y-%m-%dT%H:%M:%SZ")
            );
            println!("ok");

            store.pool().close().await;
        }
        Commands::Analyze { repo, question } => {
            if !github::valid_repo_slug(&repo) {
                anyhow::bail!("repo must be an owner/name slug, got: '{}'", repo);
            }

            let pool = db::connect(&cfg.db.path).await?;
            let store = IssueStore::new(pool);
            let client = llm::LlmClient::new(&cfg.llm)?;

            let answer = analyze::run_analyze(&store, &client, &repo, &question).await?;
            println!("{}", answer);

            store.pool().close().await;
        }
        Commands::Stats => {
            let pool = db::connect(&cfg.db.path).await?;
            let store = IssueStore::new(pool);
            stats::run_stats(&store, &cfg.db.path).await?;
            store.pool().close().await;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
