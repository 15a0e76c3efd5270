//! # DocuMind CLI (`docmind`)
//!
//! Upload documents into a local vector store, then ask questions that are
//! answered only from the uploaded content and audited for grounding.
//!
//! ## Usage
//!
//! ```bash
//! docmind --config ./config/docmind.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docmind init` | Create the SQLite database and fix the embedding dimension |
//! | `docmind upload <file>` | Extract, chunk, embed and store a PDF or text file |
//! | `docmind chat ["<question>"]` | Answer one question, or start an interactive session |
//! | `docmind stats` | Show record counts per source |
//!
//! ## Examples
//!
//! ```bash
//! docmind init
//! docmind upload ./manuals/washer.pdf
//! docmind chat "How often should the filter be cleaned?"
//! docmind chat --top-k 8 --threshold 0.3 --json "What voltage does it need?"
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docmind::chat::{self, ChatOptions};
use docmind::config::{self, Credentials};
use docmind::{db, logging, migrate, stats, upload};

/// DocuMind: grounded question answering over your own documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. API keys are read from `OPENAI_API_KEY` / `GEMINI_API_KEY`
/// (a `.env` file in the working directory is loaded first).
#[derive(Parser)]
#[command(
    name = "docmind",
    about = "DocuMind: grounded question answering over your own documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docmind.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and fix the store's embedding dimension.
    ///
    /// Idempotent while `embedding.dims` stays the same.
    Init,

    /// Upload a document (PDF or UTF-8 text).
    Upload {
        /// File to upload.
        file: PathBuf,

        /// Source identifier recorded on every chunk. Defaults to the file name.
        #[arg(long)]
        source: Option<String>,
    },

    /// Ask a question. Without a question, starts an interactive session.
    Chat {
        question: Option<String>,

        /// Number of chunks to retrieve (overrides `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Minimum similarity, exclusive (overrides `retrieval.similarity_threshold`).
        #[arg(long)]
        threshold: Option<f32>,

        /// Print each outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show store statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cfg = config::load_config(&cli.config)?;
    logging::init_tracing(&cfg.logging);
    let credentials = Credentials::from_env();

    match cli.command {
        Commands::Init => {
            let dims = cfg
                .embedding
                .dims
                .context("embedding.dims must be set to initialize the store")?;
            let pool = db::connect(&cfg.db.path).await?;
            migrate::init_store(&pool, dims, cfg.embedding.model.as_deref()).await?;
            pool.close().await;
            println!(
                "Database initialized successfully at {} ({} dimensions).",
                cfg.db.path.display(),
                dims
            );
        }
        Commands::Upload { file, source } => {
            upload::run_upload(&cfg, &credentials, &file, source.as_deref()).await?;
        }
        Commands::Chat {
            question,
            top_k,
            threshold,
            json,
        } => {
            let options = ChatOptions {
                top_k,
                threshold,
                json,
            };
            chat::run_chat(&cfg, &credentials, question.as_deref(), &options).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
