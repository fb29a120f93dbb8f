//! # VC Pipeline Chat CLI (`vcdb`)
//!
//! ## Usage
//!
//! ```bash
//! vcdb --config ./config/vcdb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vcdb sync` | Fetch records and report which table was used |
//! | `vcdb context` | Sync and print the context handed to the model |
//! | `vcdb ask "<question>"` | Answer one question |
//! | `vcdb search "<query>"` | Run the web search chain on its own |
//! | `vcdb serve` | Start the JSON HTTP API |
//!
//! Credentials are read from the environment (`AIRTABLE_BASE_ID`,
//! `AIRTABLE_API_KEY`, `CLAUDE_API_KEY`, `BRAVE_API_KEY`, `SERPAPI_KEY`).
//! Logs go to stderr; set `RUST_LOG` to change the level.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vc_pipeline_chat::config;
use vc_pipeline_chat::models::SearchOutcome;
use vc_pipeline_chat::search::{format_hits, SearchAggregator};
use vc_pipeline_chat::{build_orchestrator, server};

/// Chat with a venture deal-pipeline database, with live web search.
#[derive(Parser)]
#[command(name = "vcdb", version)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/vcdb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch records from the first non-empty candidate table.
    Sync,

    /// Sync, then print the context blob.
    Context,

    /// Answer a single question against the database.
    Ask {
        /// The question to ask.
        question: String,
    },

    /// Query the web search providers directly.
    Search {
        /// The search query string.
        query: String,
    },

    /// Start the HTTP API server.
    ///
    /// Binds to `[server].bind` (or `PORT`), syncs once, then serves.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Search { query } => {
            let search = SearchAggregator::from_config(&cfg)?;
            match search.search(&query).await {
                SearchOutcome::Found(hits) => println!("{}", format_hits(&hits)),
                SearchOutcome::NoResults => println!("No search results found."),
                SearchOutcome::Unavailable => println!("All search providers unavailable."),
            }
        }
        Commands::Sync => {
            let mut orchestrator = build_orchestrator(&cfg)?;
            let summary = orchestrator.sync().await?;
            println!(
                "Synced {} records from '{}'",
                summary.records, summary.table
            );
        }
        Commands::Context => {
            let mut orchestrator = build_orchestrator(&cfg)?;
            orchestrator.sync().await?;
            println!("{}", orchestrator.session().context());
        }
        Commands::Ask { question } => {
            let question = question.trim();
            if question.is_empty() {
                anyhow::bail!("No message");
            }
            let mut orchestrator = build_orchestrator(&cfg)?;
            println!("{}", orchestrator.ask(question).await);
        }
        Commands::Serve => {
            let orchestrator = build_orchestrator(&cfg)?;
            server::run_server(&cfg, orchestrator).await?;
        }
    }

    Ok(())
}
