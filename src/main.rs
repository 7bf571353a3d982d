//! # pdf-rag CLI (`pdfrag`)
//!
//! ## Usage
//!
//! ```bash
//! pdfrag --config ./config/pdfrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfrag serve` | Start the HTTP server |
//! | `pdfrag ingest <file.pdf>` | Index a local PDF |
//! | `pdfrag ask <namespace> "<question>"` | Answer a question from one namespace |
//! | `pdfrag provision` | Create the index if needed and wait until ready |
//! | `pdfrag chunk <file.pdf>` | Dry run: extract and chunk without calling any provider |
//!
//! API keys are read from `OPENAI_API_KEY` and `PINECONE_API_KEY`; a `.env`
//! file in the working directory is loaded first if present.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pdf_rag::config::{load_config, Config};
use pdf_rag::extract::extract_pdf_text_blocking;
use pdf_rag::normalize::normalize_text;
use pdf_rag::pipeline::{PdfUpload, PipelineContext, QueryOverrides};
use pdf_rag::{chunk, server, telemetry};
use std::path::{Path, PathBuf};

/// pdf-rag: index PDFs into a vector database and answer questions
/// grounded in their text.
#[derive(Parser)]
#[command(
    name = "pdfrag",
    about = "Index PDFs into a vector database and answer questions grounded in their text",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Missing files are tolerated: every setting has a default.
    #[arg(long, global = true, default_value = "./config/pdfrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve,

    /// Extract, chunk, embed, and upsert a local PDF.
    Ingest {
        /// Path to the PDF file.
        path: PathBuf,

        /// Namespace to index into. Defaults to the generated document id.
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Answer a question using the chunks stored in a namespace.
    Ask {
        namespace: String,
        question: String,

        /// Number of chunks to retrieve.
        #[arg(long)]
        top_k: Option<usize>,

        /// Sampling temperature for the chat model.
        #[arg(long)]
        temperature: Option<f32>,
    },

    /// Create the vector index if absent and wait until it is ready.
    Provision,

    /// Dry run: extract and chunk a PDF, print counts, call no provider.
    Chunk {
        path: PathBuf,
    },
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::warn!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional: a missing .env is fine, the variables may already be set.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cli = Cli::parse();
    let cfg = read_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ingest { path, namespace } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let pipeline = PipelineContext::connect(&cfg).await?;
            let report = pipeline
                .ingest_pdf(PdfUpload {
                    bytes,
                    file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
                    content_type: None,
                    namespace,
                })
                .await?;
            println!("doc_id:    {}", report.doc_id);
            println!("namespace: {}", report.namespace);
            println!("chunks:    {}", report.chunks_indexed);
            println!("source:    {}", report.source);
        }
        Commands::Ask {
            namespace,
            question,
            top_k,
            temperature,
        } => {
            let pipeline = PipelineContext::connect(&cfg).await?;
            let answer = pipeline
                .answer(&question, &namespace, &QueryOverrides { top_k, temperature })
                .await?;
            println!("{}", answer.reply);
            if !answer.references.is_empty() {
                println!();
                println!("References:");
                for r in &answer.references {
                    println!("  {}. [{:.3}] {} - {}", r.rank, r.score, r.source, r.text_preview);
                }
            }
        }
        Commands::Provision => {
            let pipeline = PipelineContext::connect(&cfg).await?;
            let handle = pipeline.handle();
            println!("index:     {}", handle.name);
            println!("host:      {}", handle.host);
            println!("dimension: {}", handle.dimension);
            println!("metric:    {}", handle.metric.as_str());
        }
        Commands::Chunk { path } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let raw = extract_pdf_text_blocking(bytes).await?;
            let text = normalize_text(&raw)?;
            let chunks = chunk::chunk_text(&text, cfg.chunking.chunk_size, cfg.chunking.overlap)?;
            let longest = chunks.iter().map(|c| c.text.chars().count()).max().unwrap_or(0);
            println!("characters: {}", text.chars().count());
            println!("chunks:     {}", chunks.len());
            println!("longest:    {}", longest);
        }
    }

    Ok(())
}
