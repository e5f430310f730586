#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::PineconeConfig;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
/// Fixed readiness poll interval after index creation.
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Bounded so a dead control plane cannot hang a request forever.
const READY_POLL_MAX_ATTEMPTS: u32 = 120;

/// Similarity metric used for the index.
pub const INDEX_METRIC: &str = "cosine";

/// Control-plane client for a Pinecone-style vector index service.
///
/// Handles index existence, creation, and readiness; data-plane operations go
/// through the [`IndexHandle`] returned by [`VectorIndexClient::ensure_index`].
#[derive(Debug, Clone)]
pub struct VectorIndexClient {
    api_base: Url,
    api_key: String,
    index_name: String,
    namespace: String,
    dimension: u32,
    cloud: String,
    region: String,
    agent: ureq::Agent,
}

/// Data-plane handle bound to a ready index host.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    base_url: Url,
    api_key: String,
    namespace: String,
    agent: ureq::Agent,
}

/// (id, vector, metadata) triple upserted into the index.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// Metadata stored alongside each vector: the chunk's original text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordMetadata {
    pub text: String,
}

/// One similarity match returned by a query, in the service's relevance order.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Option<RecordMetadata>,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    indexes: Vec<IndexListEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexListEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    status: IndexStatus,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    ready: bool,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: u32,
    metric: &'a str,
    spec: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    serverless: ServerlessDetails<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessDetails<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    matches: Vec<VectorMatch>,
}

fn build_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
        .build()
        .into()
}

impl VectorIndexClient {
    #[inline]
    pub fn new(config: &PineconeConfig, dimension: u32) -> Result<Self> {
        let api_base = config
            .api_base_url()
            .map_err(|e| RagError::Config(e.to_string()))?;

        Ok(Self {
            api_base,
            api_key: config.api_key.clone(),
            index_name: config.index_name.clone(),
            namespace: config.namespace.clone(),
            dimension,
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            agent: build_agent(),
        })
    }

    /// Whether the configured index already exists.
    #[inline]
    pub fn index_exists(&self) -> Result<bool> {
        let body = self.get("/indexes")?;
        let list: IndexList = serde_json::from_str(&body)
            .map_err(|e| RagError::VectorIndex(format!("Failed to parse index list: {e}")))?;

        Ok(list.indexes.iter().any(|i| i.name == self.index_name))
    }

    /// Create the index with the configured dimension and cosine metric.
    #[inline]
    pub fn create_index(&self) -> Result<()> {
        info!(
            "Creating vector index '{}' (dimension {}, metric {})",
            self.index_name, self.dimension, INDEX_METRIC
        );

        let request = CreateIndexRequest {
            name: &self.index_name,
            dimension: self.dimension,
            metric: INDEX_METRIC,
            spec: ServerlessSpec {
                serverless: ServerlessDetails {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        post_json(&self.agent, &self.api_base, "/indexes", &self.api_key, &request)?;
        Ok(())
    }

    /// Ensure the index exists and is ready, creating it lazily on first use.
    ///
    /// After creation, readiness is polled at a fixed 1-second interval (no
    /// backoff) until the service reports ready.
    #[inline]
    pub fn ensure_index(&self) -> Result<IndexHandle> {
        if !self.index_exists()? {
            self.create_index()?;
        }

        for attempt in 1..=READY_POLL_MAX_ATTEMPTS {
            let description = self.describe_index()?;
            if description.status.ready {
                debug!(
                    "Index '{}' ready at host {} (poll {})",
                    self.index_name, description.host, attempt
                );
                return self.handle_for_host(&description.host);
            }
            debug!(
                "Index '{}' not ready, poll {}/{}",
                self.index_name, attempt, READY_POLL_MAX_ATTEMPTS
            );
            std::thread::sleep(READY_POLL_INTERVAL);
        }

        Err(RagError::VectorIndex(format!(
            "Index '{}' did not become ready after {} polls",
            self.index_name, READY_POLL_MAX_ATTEMPTS
        )))
    }

    fn describe_index(&self) -> Result<IndexDescription> {
        let body = self.get(&format!("/indexes/{}", self.index_name))?;
        serde_json::from_str(&body)
            .map_err(|e| RagError::VectorIndex(format!("Failed to parse index description: {e}")))
    }

    fn handle_for_host(&self, host: &str) -> Result<IndexHandle> {
        let url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        let base_url = Url::parse(&url)
            .map_err(|e| RagError::VectorIndex(format!("Invalid index host '{host}': {e}")))?;

        Ok(IndexHandle {
            base_url,
            api_key: self.api_key.clone(),
            namespace: self.namespace.clone(),
            agent: self.agent.clone(),
        })
    }

    fn get(&self, path: &str) -> Result<String> {
        let url = self
            .api_base
            .join(path)
            .map_err(|e| RagError::VectorIndex(format!("Failed to build URL for {path}: {e}")))?;

        self.agent
            .get(url.as_str())
            .header("Api-Key", &self.api_key)
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| RagError::VectorIndex(e.to_string()))
    }
}

impl IndexHandle {
    /// Build a handle directly from a data-plane URL, bypassing the control
    /// plane. Used by tests and fixed-host deployments.
    #[inline]
    pub fn from_url(url: &str, api_key: &str, namespace: &str) -> Result<Self> {
        let base_url = Url::parse(url)
            .map_err(|e| RagError::VectorIndex(format!("Invalid index URL '{url}': {e}")))?;

        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
            namespace: namespace.to_string(),
            agent: build_agent(),
        })
    }

    /// Upsert a set of records into the configured namespace in one call.
    #[inline]
    pub fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        debug!(
            "Upserting {} vectors into namespace '{}'",
            records.len(),
            self.namespace
        );

        let request = UpsertRequest {
            vectors: records,
            namespace: &self.namespace,
        };

        post_json(
            &self.agent,
            &self.base_url,
            "/vectors/upsert",
            &self.api_key,
            &request,
        )?;
        Ok(())
    }

    /// Query the namespace for the `top_k` nearest neighbors of `vector`,
    /// returning matches with their stored text in relevance order.
    #[inline]
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let request = QueryRequest {
            namespace: &self.namespace,
            vector,
            top_k,
            include_metadata: true,
        };

        let body = post_json(
            &self.agent,
            &self.base_url,
            "/query",
            &self.api_key,
            &request,
        )?;

        let response: QueryResponse = serde_json::from_str(&body)
            .map_err(|e| RagError::VectorIndex(format!("Failed to parse query response: {e}")))?;

        debug!(
            "Query returned {} matches from namespace '{}'",
            response.matches.len(),
            self.namespace
        );

        Ok(response.matches)
    }
}

fn post_json<T: Serialize>(
    agent: &ureq::Agent,
    base: &Url,
    path: &str,
    api_key: &str,
    request: &T,
) -> Result<String> {
    let url = base
        .join(path)
        .map_err(|e| RagError::VectorIndex(format!("Failed to build URL for {path}: {e}")))?;

    let body = serde_json::to_string(request)
        .map_err(|e| RagError::VectorIndex(format!("Failed to serialize request: {e}")))?;

    agent
        .post(url.as_str())
        .header("Api-Key", api_key)
        .header("Content-Type", "application/json")
        .send(&body)
        .and_then(|mut resp| resp.body_mut().read_to_string())
        .map_err(|e| RagError::VectorIndex(e.to_string()))
}
