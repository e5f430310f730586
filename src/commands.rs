use std::path::Path;

use anyhow::anyhow;
use tracing::info;

use crate::config::Config;
use crate::embeddings::openai::OpenAiClient;
use crate::embeddings::{batching, chunking};
use crate::ingest::{EmbeddingUploader, IngestReceipt};
use crate::query::{AnswerGenerator, PromptBuilder, Retriever};
use crate::registry::{DocKey, DocRegistry};
use crate::source;
use crate::tokenizer::Tokenizer;
use crate::vector_index::VectorIndexClient;
use crate::{RagError, Result};

/// Ingest one document file: chunk, embed in batches, and upsert into the
/// vector index. Returns a receipt describing what was stored.
#[inline]
pub async fn ingest_document(config: &Config, path: &Path) -> Result<IngestReceipt> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RagError::InvalidInput(format!("Invalid file path: {}", path.display())))?;

    if !source::allowed_extension(filename, &config.ingest.allowed_extensions) {
        return Err(RagError::InvalidInput(format!(
            "Unsupported file format: {filename} (allowed: {})",
            config.ingest.allowed_extensions.join(", ")
        )));
    }

    let doc_name = source::document_name(filename).to_string();
    let doc_id = match DocRegistry::builtin().resolve(&doc_name) {
        DocKey::Known(id) => id,
        DocKey::Unregistered => {
            return Err(RagError::InvalidInput(format!(
                "Document '{doc_name}' is not registered; only pre-registered documents can be \
                 ingested"
            )));
        }
    };

    let text = source::load_document_text(path)?;

    let tokenizer = Tokenizer::new()?;
    let chunk_size = config.ingest.chunk_size;
    let chunks = chunking::chunk_tokens(&tokenizer, &text, chunk_size)?;
    if chunks.is_empty() {
        return Err(RagError::EmptyDocument(format!(
            "Document '{doc_name}' produced no chunks"
        )));
    }
    let chunk_count = chunks.len();

    let batch_size =
        batching::embedding_batch_size(config.openai.embedding_max_input, chunk_size)?;
    let batches = batching::plan_batches(chunks, batch_size);

    let openai = OpenAiClient::new(&config.openai)?;
    let index_client = VectorIndexClient::new(&config.pinecone, config.openai.embedding_dimension)?;

    // ensure_index sleeps between readiness polls; keep it off the runtime.
    let index = tokio::task::spawn_blocking(move || index_client.ensure_index())
        .await
        .map_err(|e| RagError::Other(anyhow!("Index setup task failed: {e}")))??;

    let uploader = EmbeddingUploader::new(openai, index, config.ingest.upload_concurrency);
    uploader.upload(&doc_id, batches).await?;

    info!(
        "Ingested document '{}' as '{}' ({} chunks of {} tokens)",
        doc_name, doc_id, chunk_count, chunk_size
    );

    Ok(IngestReceipt {
        doc_name,
        doc_id,
        chunk_size,
        chunk_count,
    })
}

/// Answer a free-text question against one ingested document: retrieve the
/// relevant chunks, assemble a token-budgeted prompt, and ask the completion
/// model.
#[inline]
pub async fn answer_query(config: &Config, doc_id: &str, query_text: &str) -> Result<String> {
    let tokenizer = Tokenizer::new()?;
    let openai = OpenAiClient::new(&config.openai)?;
    let index_client = VectorIndexClient::new(&config.pinecone, config.openai.embedding_dimension)?;

    let max_query_tokens = config.openai.embedding_max_input;
    let top_k = config.query.top_k;
    let budget = config.openai.completion_max_tokens;
    let doc_id = doc_id.to_string();
    let task_doc_id = doc_id.clone();
    let query_text = query_text.to_string();

    let answer = tokio::task::spawn_blocking(move || -> Result<String> {
        let index = index_client.ensure_index()?;

        let retriever = Retriever::new(&tokenizer, &openai, &index, max_query_tokens, top_k);
        let matches = retriever.retrieve(&query_text, &task_doc_id)?;
        if matches.is_empty() {
            return Err(RagError::NotFound(format!(
                "No relevant context found for document '{task_doc_id}'"
            )));
        }

        let prompt = PromptBuilder::new(&tokenizer, budget).build(&matches, &query_text);
        AnswerGenerator::new(&openai).generate(&prompt)
    })
    .await
    .map_err(|e| RagError::Other(anyhow!("Query task failed: {e}")))??;

    info!("Answered query against document '{}'", doc_id);
    Ok(answer)
}

/// Print the active configuration as TOML.
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| RagError::Config(format!("Failed to render config: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// Write the default configuration file if none exists yet.
#[inline]
pub fn init_config() -> Result<()> {
    let config_dir = Config::config_dir().map_err(|e| RagError::Config(e.to_string()))?;
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        println!("Configuration already exists at {}", config_path.display());
        return Ok(());
    }

    Config::default().save(&config_dir)?;
    println!("Wrote default configuration to {}", config_path.display());
    Ok(())
}
