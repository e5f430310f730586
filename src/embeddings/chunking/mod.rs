
use tracing::debug;

use crate::tokenizer::{Token, Tokenizer};
use crate::{RagError, Result};

/// One fixed-size token window of a document, with its decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenChunk {
    /// 0-based position of this chunk within the document.
    pub index: usize,
    /// The chunk's token window; at most `chunk_size` tokens.
    pub tokens: Vec<Token>,
    /// The window decoded back to text, carried as upsert metadata.
    pub text: String,
}

/// Split document text into contiguous token windows of `chunk_size`.
///
/// The full text is tokenized once and partitioned without overlap; the final
/// window may be shorter. Concatenating the decoded chunk texts re-tokenizes to
/// the same token count as the source.
#[inline]
pub fn chunk_tokens(
    tokenizer: &Tokenizer,
    text: &str,
    chunk_size: usize,
) -> Result<Vec<TokenChunk>> {
    if chunk_size == 0 {
        return Err(RagError::InvalidInput(
            "chunk_size must be greater than 0".to_string(),
        ));
    }

    let tokens = tokenizer.encode(text);

    let mut chunks = Vec::with_capacity(tokens.len().div_ceil(chunk_size));
    for (index, window) in tokens.chunks(chunk_size).enumerate() {
        let text = tokenizer.decode(window)?;
        chunks.push(TokenChunk {
            index,
            tokens: window.to_vec(),
            text,
        });
    }

    debug!(
        "Chunked {} tokens into {} chunks of up to {} tokens",
        tokens.len(),
        chunks.len(),
        chunk_size
    );

    Ok(chunks)
}
