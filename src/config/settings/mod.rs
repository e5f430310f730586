
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub pinecone: PineconeConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub api_key: String,
    pub embedding_model: String,
    /// Maximum number of input tokens the embedding model accepts per request.
    pub embedding_max_input: usize,
    pub embedding_dimension: u32,
    pub completion_model: String,
    /// Maximum total context window of the completion model, in tokens.
    pub completion_max_tokens: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com".to_string(),
            api_key: String::new(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_max_input: 8191,
            embedding_dimension: 1536,
            completion_model: "gpt-4o-mini".to_string(),
            completion_max_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PineconeConfig {
    pub api_base: String,
    pub api_key: String,
    pub index_name: String,
    pub namespace: String,
    pub cloud: String,
    pub region: String,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.pinecone.io".to_string(),
            api_key: String::new(),
            index_name: "docrag".to_string(),
            namespace: "default".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// Token window size for document chunking.
    pub chunk_size: usize,
    /// Maximum number of batches embedded and upserted concurrently.
    pub upload_concurrency: usize,
    /// Closed set of accepted file extensions, lowercase, without dots.
    pub allowed_extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            upload_concurrency: 4,
            allowed_extensions: vec!["txt".to_string(), "json".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    /// Neighbors fetched per index query, before document post-filtering.
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { top_k: 15 }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding max input: {0} (must be between 2 and 1000000 tokens)")]
    InvalidEmbeddingMaxInput(usize),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid completion max tokens: {0} (must be between 16 and 1000000)")]
    InvalidCompletionMaxTokens(usize),
    #[error("Invalid chunk size: {0} (must be between 1 and 8192 tokens)")]
    InvalidChunkSize(usize),
    #[error("Chunk size ({0}) must not exceed the embedding max input ({1})")]
    ChunkSizeTooLarge(usize, usize),
    #[error("Invalid upload concurrency: {0} (must be between 1 and 64)")]
    InvalidUploadConcurrency(usize),
    #[error("Invalid allowed extensions (cannot be empty)")]
    EmptyAllowedExtensions,
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid index name: {0} (cannot be empty)")]
    InvalidIndexName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    /// Load from the platform config directory (`<config dir>/docrag`).
    #[inline]
    pub fn load_default() -> Result<Self> {
        Self::load(Self::config_dir()?)
    }

    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("docrag"))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(config_dir.as_ref()).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.as_ref().display()
            )
        })?;

        let config_path = config_dir.as_ref().join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// API keys may come from the environment instead of the config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.openai.api_key = key;
            }
        }
        if let Ok(key) = std::env::var("PINECONE_API_KEY") {
            if !key.is_empty() {
                self.pinecone.api_key = key;
            }
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.openai.validate()?;
        self.pinecone.validate()?;

        if !(1..=8192).contains(&self.ingest.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(self.ingest.chunk_size));
        }

        if self.ingest.chunk_size > self.openai.embedding_max_input {
            return Err(ConfigError::ChunkSizeTooLarge(
                self.ingest.chunk_size,
                self.openai.embedding_max_input,
            ));
        }

        if !(1..=64).contains(&self.ingest.upload_concurrency) {
            return Err(ConfigError::InvalidUploadConcurrency(
                self.ingest.upload_concurrency,
            ));
        }

        if self.ingest.allowed_extensions.is_empty() {
            return Err(ConfigError::EmptyAllowedExtensions);
        }

        if !(1..=100).contains(&self.query.top_k) {
            return Err(ConfigError::InvalidTopK(self.query.top_k));
        }

        Ok(())
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            openai: OpenAiConfig::default(),
            pinecone: PineconeConfig::default(),
            ingest: IngestConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl OpenAiConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_base_url()?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.completion_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.completion_model.clone()));
        }

        if !(2..=1_000_000).contains(&self.embedding_max_input) {
            return Err(ConfigError::InvalidEmbeddingMaxInput(
                self.embedding_max_input,
            ));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        if !(16..=1_000_000).contains(&self.completion_max_tokens) {
            return Err(ConfigError::InvalidCompletionMaxTokens(
                self.completion_max_tokens,
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn api_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_base).map_err(|_| ConfigError::InvalidUrl(self.api_base.clone()))
    }
}

impl PineconeConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_base_url()?;

        if self.index_name.trim().is_empty() {
            return Err(ConfigError::InvalidIndexName(self.index_name.clone()));
        }

        Ok(())
    }

    #[inline]
    pub fn api_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_base).map_err(|_| ConfigError::InvalidUrl(self.api_base.clone()))
    }
}
