
use crate::embeddings::chunking::TokenChunk;
use crate::{RagError, Result};

/// Validated embedding batch size: a positive whole number of chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(usize);

impl BatchSize {
    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<i64> for BatchSize {
    type Error = RagError;

    #[inline]
    fn try_from(value: i64) -> Result<Self> {
        if value < 1 {
            return Err(RagError::InvalidInput(format!(
                "batch size must be an integer greater than 0, got {value}"
            )));
        }
        Ok(Self(usize::try_from(value).map_err(|_| {
            RagError::InvalidInput(format!("batch size out of range: {value}"))
        })?))
    }
}

impl TryFrom<f64> for BatchSize {
    type Error = RagError;

    #[inline]
    fn try_from(value: f64) -> Result<Self> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(RagError::InvalidInput(format!(
                "batch size must be an integer greater than 0, got {value}"
            )));
        }
        Self::try_from(value as i64)
    }
}

/// Largest batch of `chunk_size`-token chunks safe for one embedding request:
/// `floor(max_input / chunk_size) - 1`.
///
/// The `- 1` is a fixed safety margin against per-request overhead. The
/// heuristic assumes uniformly sized chunks; a batch of irregular chunks can
/// still exceed the true limit.
#[inline]
pub fn embedding_batch_size(max_input_tokens: usize, chunk_size: usize) -> Result<BatchSize> {
    if chunk_size == 0 {
        return Err(RagError::InvalidInput(
            "chunk_size must be greater than 0".to_string(),
        ));
    }

    let size = (max_input_tokens / chunk_size).saturating_sub(1);
    if size == 0 {
        return Err(RagError::InvalidInput(format!(
            "max input of {max_input_tokens} tokens leaves no room for batches of \
             {chunk_size}-token chunks"
        )));
    }

    Ok(BatchSize(size))
}

/// One group of chunks destined for a single embedding call and upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBatch {
    /// Absolute index of the batch's first chunk within the document.
    pub start_index: usize,
    pub chunks: Vec<TokenChunk>,
}

/// Partition chunks into ordered groups of at most `batch_size` elements.
///
/// Order is preserved and the final group may be smaller. N chunks always plan
/// into `ceil(N / B)` batches covering every chunk exactly once.
#[inline]
pub fn plan_batches(chunks: Vec<TokenChunk>, batch_size: BatchSize) -> Vec<PlannedBatch> {
    let mut batches = Vec::with_capacity(chunks.len().div_ceil(batch_size.get()));
    let mut chunks = chunks.into_iter().peekable();
    let mut start_index = 0;

    while chunks.peek().is_some() {
        let group: Vec<TokenChunk> = chunks.by_ref().take(batch_size.get()).collect();
        let len = group.len();
        batches.push(PlannedBatch {
            start_index,
            chunks: group,
        });
        start_index += len;
    }

    batches
}
