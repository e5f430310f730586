// Embeddings module
// Token chunking, batch planning, and the OpenAI-compatible service client

pub mod batching;
pub mod chunking;
pub mod openai;

pub use batching::{BatchSize, PlannedBatch, embedding_batch_size, plan_batches};
pub use chunking::{TokenChunk, chunk_tokens};
pub use openai::OpenAiClient;
