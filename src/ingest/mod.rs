#[cfg(test)]
mod tests;

use anyhow::anyhow;
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info};

use crate::embeddings::batching::PlannedBatch;
use crate::embeddings::openai::OpenAiClient;
use crate::registry::chunk_id;
use crate::vector_index::{IndexHandle, RecordMetadata, VectorRecord};
use crate::{RagError, Result};

/// Summary of a completed document ingest.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IngestReceipt {
    pub doc_name: String,
    pub doc_id: String,
    pub chunk_size: usize,
    pub chunk_count: usize,
}

/// Pipeline stage that embeds planned batches and upserts them into the index.
///
/// Batches are independent, so up to `concurrency` of them are in flight at
/// once; each batch is still upserted atomically only after its embeddings
/// return. The first failure aborts the ingest. Batches already upserted are
/// not rolled back, so a failed ingest can leave partial index state.
pub struct EmbeddingUploader {
    openai: OpenAiClient,
    index: IndexHandle,
    concurrency: usize,
}

impl EmbeddingUploader {
    #[inline]
    pub fn new(openai: OpenAiClient, index: IndexHandle, concurrency: usize) -> Self {
        Self {
            openai,
            index,
            concurrency: concurrency.max(1),
        }
    }

    /// Upload all batches for a document; returns the number of chunks stored.
    #[inline]
    pub async fn upload(&self, doc_id: &str, batches: Vec<PlannedBatch>) -> Result<usize> {
        let batch_count = batches.len();
        debug!(
            "Uploading {} batches for document '{}' with concurrency {}",
            batch_count, doc_id, self.concurrency
        );

        let mut uploads = futures::stream::iter(batches.into_iter().map(|batch| {
            let openai = self.openai.clone();
            let index = self.index.clone();
            let doc_id = doc_id.to_string();
            tokio::task::spawn_blocking(move || upload_batch(&openai, &index, &doc_id, &batch))
        }))
        .buffered(self.concurrency);

        let mut uploaded = 0;
        while let Some(joined) = uploads.next().await {
            uploaded += joined.map_err(|e| RagError::Other(anyhow!("Upload task failed: {e}")))??;
        }

        info!(
            "Uploaded {} chunks in {} batches for document '{}'",
            uploaded, batch_count, doc_id
        );

        Ok(uploaded)
    }
}

/// Embed one batch and upsert its records in a single call.
fn upload_batch(
    openai: &OpenAiClient,
    index: &IndexHandle,
    doc_id: &str,
    batch: &PlannedBatch,
) -> Result<usize> {
    let inputs: Vec<_> = batch.chunks.iter().map(|c| c.tokens.clone()).collect();
    let vectors = openai.embed_token_batch(&inputs)?;

    let records = batch_records(doc_id, batch, vectors)?;
    index.upsert(&records)?;

    Ok(records.len())
}

/// Pair each chunk with its embedding vector and deterministic id.
fn batch_records(
    doc_id: &str,
    batch: &PlannedBatch,
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<VectorRecord>> {
    if vectors.len() != batch.chunks.len() {
        return Err(RagError::Embedding(format!(
            "Expected {} vectors for batch starting at chunk {}, got {}",
            batch.chunks.len(),
            batch.start_index,
            vectors.len()
        )));
    }

    Ok(batch
        .chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, values)| VectorRecord {
            id: chunk_id(doc_id, chunk.index),
            values,
            metadata: RecordMetadata {
                text: chunk.text.clone(),
            },
        })
        .collect())
}
