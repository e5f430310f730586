
use anyhow::Context;
use tiktoken_rs::{CoreBPE, cl100k_base};

use crate::Result;

/// Token id in the fixed encoding shared by every sizing decision in the pipeline.
pub type Token = u32;

/// Identifier of the encoding used for all components.
pub const ENCODING_NAME: &str = "cl100k_base";

/// Shared encode/decode service over the cl100k_base BPE.
///
/// Constructed once and passed by reference; holds no mutable state, so a single
/// instance can size chunking, batching, and prompt budgets consistently.
pub struct Tokenizer {
    bpe: CoreBPE,
}

impl Tokenizer {
    /// Build the cl100k_base tokenizer.
    #[inline]
    pub fn new() -> Result<Self> {
        let bpe = cl100k_base().context("Failed to load cl100k_base encoding")?;
        Ok(Self { bpe })
    }

    /// Encode text into token ids. Infallible for valid UTF-8 input.
    #[inline]
    pub fn encode(&self, text: &str) -> Vec<Token> {
        self.bpe.encode_ordinary(text)
    }

    /// Decode token ids back into text.
    #[inline]
    pub fn decode(&self, tokens: &[Token]) -> Result<String> {
        let text = self
            .bpe
            .decode(tokens.to_vec())
            .context("Failed to decode token sequence")?;
        Ok(text)
    }

    /// Number of tokens `text` encodes to.
    #[inline]
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl std::fmt::Debug for Tokenizer {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("encoding", &ENCODING_NAME)
            .finish()
    }
}
