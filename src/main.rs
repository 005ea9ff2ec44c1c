//! # stratdesk CLI (`sdesk`)
//!
//! The `sdesk` binary is the primary interface for stratdesk. It provides
//! commands for database initialization, document upload, question
//! answering, history review, and starting the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! sdesk --config ./config/sdesk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sdesk init` | Create the SQLite database and run schema migrations |
//! | `sdesk upload <path>` | Upload a document or a directory of documents |
//! | `sdesk documents` | List uploaded documents |
//! | `sdesk delete <id>` | Delete a document and its vectors |
//! | `sdesk ask "<question>"` | Answer a question from the indexed documents |
//! | `sdesk history` | Show recent queries |
//! | `sdesk stats` | Show database and index statistics |
//! | `sdesk serve api` | Start the JSON HTTP API server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! sdesk init --config ./config/sdesk.toml
//!
//! # Upload a quarterly report, classified automatically
//! sdesk upload reports/q3_financials.pdf
//!
//! # Upload a whole directory as internal documents
//! sdesk upload ./handbook --doc-type internal
//!
//! # Ask a question against financial documents only
//! sdesk ask "How did revenue develop this year?" --doc-type financial
//!
//! # Start the HTTP API for the dashboard
//! sdesk serve api
//! ```

mod answer;
mod chunk;
mod classify;
mod completion;
mod config;
mod db;
mod docs;
mod embedding;
mod extract;
mod history;
mod index;
mod ingest;
mod migrate;
mod models;
mod server;
mod stats;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// stratdesk CLI — a document-grounded strategic analysis service.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/sdesk.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "sdesk",
    about = "stratdesk — document-grounded question answering for business strategy",
    version,
    long_about = "stratdesk ingests business documents (PDF, DOCX, TXT), classifies and chunks \
    them, indexes chunk embeddings in SQLite, and answers questions grounded in the retrieved \
    chunks via a CLI and a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/sdesk.toml`. All database, chunking, retrieval,
    /// provider, and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/sdesk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, vectors, query_history). This command is idempotent —
    /// running it multiple times is safe.
    Init,

    /// Upload a document, or every supported document under a directory.
    ///
    /// Extracts text, classifies the document (unless --doc-type overrides),
    /// chunks it, and indexes chunk embeddings when an embedding provider
    /// is configured.
    Upload {
        /// Path to a .pdf, .docx, or .txt file, or a directory to walk.
        path: PathBuf,

        /// Document type: `auto`, `financial`, `market_research`,
        /// `internal`, or `general`. `auto` classifies from content.
        #[arg(long, default_value = "auto")]
        doc_type: String,
    },

    /// List uploaded documents.
    Documents,

    /// Delete a document and all of its indexed vectors.
    Delete {
        /// Document id (as shown by `sdesk documents`).
        id: i64,
    },

    /// Answer a question from the indexed documents.
    ///
    /// Retrieves the most similar chunks, assembles a cited prompt, and
    /// asks the configured completion provider. The answer, its sources,
    /// and a confidence score are printed and recorded in query history.
    Ask {
        /// The question to answer.
        query: String,

        /// Restrict retrieval to one document type, or `all`.
        #[arg(long, default_value = "all")]
        doc_type: String,
    },

    /// Show recent queries with their sources and confidence.
    History {
        /// Maximum number of queries to show.
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Show database and index statistics.
    Stats,

    /// Start the HTTP API server.
    ///
    /// Exposes upload, query, history, and stats endpoints as JSON over
    /// HTTP for dashboards and service integrations.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the JSON API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// the stratdesk API endpoints.
    Api,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&config).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized at {}", config.db.path.display());
        }
        Commands::Upload { path, doc_type } => {
            ingest::run_upload(&config, &path, &doc_type).await?;
        }
        Commands::Documents => {
            docs::run_documents(&config).await?;
        }
        Commands::Delete { id } => {
            docs::run_delete(&config, id).await?;
        }
        Commands::Ask { query, doc_type } => {
            answer::run_ask(&config, &query, &doc_type).await?;
        }
        Commands::History { limit } => {
            history::run_history(&config, limit).await?;
        }
        Commands::Stats => {
            stats::run_stats(&config).await?;
        }
        Commands::Serve {
            service: ServeService::Api,
        } => {
            server::run_server(&config).await?;
        }
    }

    Ok(())
}
