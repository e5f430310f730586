// Configuration management module
// TOML-backed settings for the embedding, completion, and vector index services

pub mod settings;

pub use settings::{Config, ConfigError, IngestConfig, OpenAiConfig, PineconeConfig, QueryConfig};
