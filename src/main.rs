//! # Careline CLI (`careline`)
//!
//! The `careline` binary is the interface to the healthcare knowledge
//! assistant. It builds the local vector index from a folder of
//! patient-education documents and answers questions grounded in them.
//!
//! ## Usage
//!
//! ```bash
//! careline --config ./config.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `careline build` | Ingest documents, embed chunks, write the index |
//! | `careline search "<query>"` | Show the top matching chunks for a query |
//! | `careline ask "<question>"` | Answer one question and exit |
//! | `careline chat` | Interactive question shell |
//!
//! ## Examples
//!
//! ```bash
//! # Chunk documents and report counts without calling the API
//! careline build --dry-run
//!
//! # Build the index (requires OPENAI_API_KEY)
//! careline build
//!
//! # Inspect retrieval without generation
//! careline search "signs of dehydration"
//!
//! # One-shot answer with retrieval provenance
//! careline ask "How much water should I drink per day?" --debug
//!
//! # Interactive shell
//! careline chat
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use careline::config;
use careline::ingest;
use careline::retrieve;
use careline::shell;

/// Careline, a local retrieval-augmented generation assistant for
/// healthcare documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "careline",
    about = "A local retrieval-augmented question assistant for healthcare documents",
    version,
    long_about = "Careline ingests a folder of patient-education documents, embeds them with the \
    OpenAI embeddings API into a local flat vector index, and answers questions grounded in the \
    retrieved excerpts under a conservative healthcare safety prompt."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config.toml`. Model names, document and index paths,
    /// and retrieval settings are read from this file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from the configured documents directory.
    ///
    /// Loads every `.txt`/`.md` file, cuts them into overlapping chunks,
    /// embeds the chunks, and writes the index and metadata files
    /// atomically. Requires `OPENAI_API_KEY` unless `--dry-run` is given.
    Build {
        /// Chunk and report counts without embedding or writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the top matching chunks for a query, without generation.
    ///
    /// Useful for inspecting what the assistant would be grounded on.
    Search {
        /// The search query.
        query: String,

        /// Number of chunks to return (defaults to `rag.top_k` from config).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Answer a single question and exit.
    Ask {
        /// The question to answer.
        question: String,

        /// Show retrieved context chunks after the answer.
        #[arg(long)]
        debug: bool,
    },

    /// Start the interactive question shell.
    ///
    /// Reads questions from stdin until EOF, Ctrl-C, or `exit`/`quit`.
    Chat {
        /// Show retrieved context chunks after each answer.
        #[arg(long)]
        debug: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Build { dry_run } => {
            ingest::run_build(&cfg, dry_run).await?;
        }
        Commands::Search { query, top_k } => {
            retrieve::run_search(&cfg, &query, top_k).await?;
        }
        Commands::Ask { question, debug } => {
            shell::run_ask(&cfg, &question, debug).await?;
        }
        Commands::Chat { debug } => {
            shell::run_chat(&cfg, debug).await?;
        }
    }

    Ok(())
}
