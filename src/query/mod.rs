
use tracing::{debug, warn};

use crate::embeddings::openai::{OpenAiClient, SYSTEM_INSTRUCTION};
use crate::tokenizer::Tokenizer;
use crate::vector_index::{IndexHandle, VectorMatch};
use crate::{RagError, Result};

/// Fixed prompt preamble preceding the retrieved context.
pub const PROMPT_PREAMBLE: &str = "Answer the question based on the context below.\n\nContext:\n";

fn prompt_suffix(query_text: &str) -> String {
    format!("\n\nQuestion: {query_text}\nAnswer:")
}

/// Embeds a query and fetches the most relevant chunks for one document.
pub struct Retriever<'a> {
    tokenizer: &'a Tokenizer,
    openai: &'a OpenAiClient,
    index: &'a IndexHandle,
    /// Embedding model's maximum input token count; longer queries are rejected.
    max_query_tokens: usize,
    top_k: usize,
}

impl<'a> Retriever<'a> {
    #[inline]
    pub fn new(
        tokenizer: &'a Tokenizer,
        openai: &'a OpenAiClient,
        index: &'a IndexHandle,
        max_query_tokens: usize,
        top_k: usize,
    ) -> Self {
        Self {
            tokenizer,
            openai,
            index,
            max_query_tokens,
            top_k,
        }
    }

    /// Retrieve the matched chunk texts for `doc_id`, in relevance order.
    ///
    /// The index query runs across the whole namespace; the document scope is
    /// applied client-side by id prefix. Over-fetching `top_k` neighbors
    /// compensates for the post-filter, but a document whose relevant chunks
    /// fall outside the global top-k is starved; the index has no per-document
    /// partition in this design.
    #[inline]
    pub fn retrieve(&self, query_text: &str, doc_id: &str) -> Result<Vec<String>> {
        let tokens = self.tokenizer.encode(query_text);
        if tokens.len() > self.max_query_tokens {
            return Err(RagError::InvalidInput(format!(
                "Query is {} tokens, exceeding the maximum of {}",
                tokens.len(),
                self.max_query_tokens
            )));
        }

        let vector = self.openai.embed_tokens(&tokens)?;
        let matches = self.index.query(&vector, self.top_k)?;

        let texts = filter_matches(matches, doc_id);
        debug!(
            "Kept {} of top-{} matches for document '{}'",
            texts.len(),
            self.top_k,
            doc_id
        );

        Ok(texts)
    }
}

/// Keep matches belonging to `doc_id` (by id prefix), preserving the relevance
/// order the index returned.
fn filter_matches(matches: Vec<VectorMatch>, doc_id: &str) -> Vec<String> {
    matches
        .into_iter()
        .filter(|m| m.id.starts_with(doc_id))
        .filter_map(|m| match m.metadata {
            Some(metadata) => Some(metadata.text),
            None => {
                warn!("Match '{}' has no stored text, skipping", m.id);
                None
            }
        })
        .collect()
}

/// Assembles a token-budgeted prompt from retrieved texts.
pub struct PromptBuilder<'a> {
    tokenizer: &'a Tokenizer,
    /// Completion model's maximum total context window, in tokens.
    max_total_tokens: usize,
}

impl<'a> PromptBuilder<'a> {
    #[inline]
    pub fn new(tokenizer: &'a Tokenizer, max_total_tokens: usize) -> Self {
        Self {
            tokenizer,
            max_total_tokens,
        }
    }

    /// Build `preamble + context + suffix` within the token budget.
    ///
    /// Matches are consumed greedily in relevance order: each match's rendered
    /// cost (its tokens plus the separator newline) is subtracted from the
    /// remaining budget first, and the match is appended only while the counter
    /// stays positive. The first match that drives it non-positive ends
    /// consumption; later, smaller matches are dropped too, even if they would
    /// have fit.
    #[inline]
    pub fn build(&self, matches: &[String], query_text: &str) -> String {
        let suffix = prompt_suffix(query_text);
        let separator_cost = self.tokenizer.count("\n") as i64;

        let mut available = self.max_total_tokens as i64
            - self.tokenizer.count(PROMPT_PREAMBLE) as i64
            - self.tokenizer.count(&suffix) as i64;

        let mut context = String::new();
        let mut used = 0;
        for text in matches {
            available -= self.tokenizer.count(text) as i64 + separator_cost;
            if available > 0 {
                context.push_str(text);
                context.push('\n');
                used += 1;
            } else {
                break;
            }
        }

        debug!(
            "Prompt uses {} of {} matches, {} budget tokens left",
            used,
            matches.len(),
            available.max(0)
        );

        format!("{PROMPT_PREAMBLE}{context}{suffix}")
    }
}

/// Obtains an answer for an assembled prompt from the completion service.
pub struct AnswerGenerator<'a> {
    openai: &'a OpenAiClient,
}

impl<'a> AnswerGenerator<'a> {
    #[inline]
    pub fn new(openai: &'a OpenAiClient) -> Self {
        Self { openai }
    }

    /// Send the fixed system instruction plus the prompt; returns the first
    /// choice's text.
    #[inline]
    pub fn generate(&self, prompt: &str) -> Result<String> {
        self.openai.chat_completion(SYSTEM_INSTRUCTION, prompt)
    }
}
