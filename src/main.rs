//! # websift CLI
//!
//! The `websift` binary runs the extraction pipeline directly from the
//! command line or starts the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! websift [--config ./websift.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `websift serve` | Start the HTTP server with SSE streaming |
//! | `websift query "<query>" --output '<schema>'` | Run one extraction |
//!
//! ## Examples
//!
//! ```bash
//! # One-shot extraction; progress on stderr, result JSON on stdout
//! websift query "top rated espresso machines" \
//!     --output '{"name": "string", "price": "number"}' \
//!     --max-answers 10
//!
//! # Start the server on the configured bind address
//! websift serve --config ./websift.toml
//! ```
//!
//! Credentials come from the environment (or a `.env` file):
//! `GOOGLE_API_KEY`, `GOOGLE_SEARCH_ENGINE_ID`, and `GEMINI_API_KEY`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use websift::config::{load_config, Credentials};
use websift::models::ExtractionSchema;
use websift::pipeline::Pipeline;
use websift::progress::ProgressMode;
use websift::server::run_server;

/// websift: retrieval-augmented structured data extraction from the web.
#[derive(Parser)]
#[command(
    name = "websift",
    about = "Retrieval-augmented structured data extraction from the web",
    version,
    long_about = "websift searches the web for a query, scrapes the result pages, ranks the \
    content against the query with embeddings, and extracts schema-shaped records with an LLM. \
    Available as a one-shot CLI command or an HTTP server with SSE progress streaming."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Every setting has a working default, so the flag is optional.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// `POST /fetch` (SSE progress stream) and `GET /health`.
    Serve,

    /// Run one extraction and print the result record as JSON.
    ///
    /// Progress goes to stderr; stdout carries only the result, so the
    /// output can be piped into `jq` or a file.
    Query {
        /// The natural-language query to search for.
        query: String,

        /// Desired output schema as a JSON object, e.g.
        /// `'{"name": "string", "price": "number"}'`.
        #[arg(long)]
        output: String,

        /// Maximum number of records to return.
        #[arg(long, default_value_t = 50)]
        max_answers: usize,

        /// Progress reporting: `auto`, `off`, `human`, or `json`.
        #[arg(long, default_value = "auto")]
        progress: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let credentials = Credentials::from_env();

    match cli.command {
        Commands::Serve => {
            run_server(&config, &credentials).await?;
        }
        Commands::Query {
            query,
            output,
            max_answers,
            progress,
        } => {
            let schema: ExtractionSchema = serde_json::from_str(&output)
                .with_context(|| "Failed to parse --output: expected a JSON object")?;
            let mode = ProgressMode::parse(&progress).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid --progress value: '{}'. Must be auto, off, human, or json.",
                    progress
                )
            })?;

            let pipeline = Arc::new(Pipeline::from_config(&config, &credentials)?);
            let (tx, mut rx) = mpsc::channel(64);

            let run = tokio::spawn({
                let pipeline = pipeline.clone();
                async move { pipeline.run(&query, &schema, max_answers, &tx).await }
            });

            let reporter = mode.reporter();
            while let Some(event) = rx.recv().await {
                reporter.report(&event);
            }

            let record = run.await?;
            println!("{}", serde_json::to_string_pretty(&record)?);

            if record.error.is_some() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
