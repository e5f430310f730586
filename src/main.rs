use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docrag::Result;
use docrag::commands::{answer_query, ingest_document, init_config, show_config};
use docrag::config::Config;

#[derive(Parser)]
#[command(name = "docrag")]
#[command(about = "Document question answering over a token-chunked vector index")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize or inspect the configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Chunk, embed, and store a document in the vector index
    Ingest {
        /// Path to an extracted-text (.txt) or OCR result (.json) file
        file: PathBuf,
    },
    /// Ask a question against an ingested document
    Query {
        /// Document id the question is scoped to, e.g. "doc0"
        doc_id: String,
        /// The question text
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                let config = Config::load_default()?;
                show_config(&config)?;
            } else {
                init_config()?;
            }
        }
        Commands::Ingest { file } => {
            let config = Config::load_default()?;
            let receipt = ingest_document(&config, &file).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&receipt)
                    .map_err(|e| anyhow::anyhow!("Failed to render receipt: {e}"))?
            );
        }
        Commands::Query { doc_id, question } => {
            let config = Config::load_default()?;
            let answer = answer_query(&config, &doc_id, &question).await?;
            println!("{answer}");
        }
    }

    Ok(())
}
