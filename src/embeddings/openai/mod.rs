
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::OpenAiConfig;
use crate::tokenizer::Token;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// System instruction sent with every completion request.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant knowing both English and \
    Japanese. You will be given some domain specific knowledge in Japanese, please answer \
    questions with the contextual information in both Japanese and English";

/// Client for an OpenAI-compatible embeddings and chat-completions API.
///
/// Failures surface immediately as typed errors; there is no retry layer, so a
/// single failed call aborts the operation that issued it.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    api_key: String,
    embedding_model: String,
    completion_model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [Vec<Token>],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let base_url = config
            .api_base_url()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            embedding_model: config.embedding_model.clone(),
            completion_model: config.completion_model.clone(),
            agent,
        })
    }

    /// Embed a batch of token sequences, one vector per input in input order.
    #[inline]
    pub fn embed_token_batch(&self, inputs: &[Vec<Token>]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting embeddings for {} token sequences", inputs.len());

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: inputs,
        };

        let response_text = self.post_json("/v1/embeddings", &request, RagError::Embedding)?;

        let mut response: EmbeddingResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Embedding(format!("Failed to parse response: {e}")))?;

        if response.data.len() != inputs.len() {
            return Err(RagError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                inputs.len(),
                response.data.len()
            )));
        }

        // The service tags each vector with its input position.
        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Embed a single token sequence.
    #[inline]
    pub fn embed_tokens(&self, input: &[Token]) -> Result<Vec<f32>> {
        let inputs = [input.to_vec()];
        let mut vectors = self.embed_token_batch(&inputs)?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("Empty embedding response".to_string()))
    }

    /// Run a two-message (system, user) chat completion and return the first
    /// choice's text.
    #[inline]
    pub fn chat_completion(&self, system: &str, user: &str) -> Result<String> {
        debug!(
            "Requesting completion from {} ({} prompt bytes)",
            self.completion_model,
            user.len()
        );

        let request = ChatRequest {
            model: &self.completion_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response_text =
            self.post_json("/v1/chat/completions", &request, RagError::Completion)?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Completion(format!("Failed to parse response: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::NotFound("No answer returned by completion model".to_string()))
    }

    fn post_json<T: Serialize>(
        &self,
        path: &str,
        request: &T,
        wrap: fn(String) -> RagError,
    ) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| wrap(format!("Failed to build URL for {path}: {e}")))?;

        let body = serde_json::to_string(request)
            .map_err(|e| wrap(format!("Failed to serialize request: {e}")))?;

        self.agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| wrap(e.to_string()))
    }
}
