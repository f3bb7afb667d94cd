//! Configuration management for the search and answering system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use secrecy::{Secret, ExposeSecret};

use crate::vector_db::models::{IndexParams, IndexSpec, IndexType, MetricType};

pub mod loader;
pub mod validation;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub vector_db: VectorDbConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub answering: AnsweringConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for the embedding service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible embeddings endpoint URL
    pub api_url: String,

    /// API authentication token (secured)
    #[serde(serialize_with = "serialize_secret", deserialize_with = "deserialize_secret")]
    pub api_token: Secret<String>,

    /// Model name sent with each request
    #[serde(default)]
    pub model: Option<String>,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Enable caching
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Cache maximum size
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

/// Configuration for the chat generation model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// OpenAI-compatible chat completions endpoint URL
    pub api_url: String,

    /// API authentication token (secured)
    #[serde(serialize_with = "serialize_secret", deserialize_with = "deserialize_secret")]
    pub api_token: Secret<String>,

    /// Model identifier
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the generated answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

/// Which vector store backend to connect to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// In-process store, lost on restart
    #[default]
    Memory,
    Qdrant,
}

/// Configuration for the vector store and the query similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Backend selection
    #[serde(default)]
    pub backend: VectorBackend,

    /// Qdrant server URL
    #[serde(default = "default_vector_db_url")]
    pub url: String,

    /// API key (optional, secured)
    #[serde(default, serialize_with = "serialize_optional_secret", deserialize_with = "deserialize_optional_secret")]
    pub api_key: Option<Secret<String>>,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Collection used by the query similarity search
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Index built over the query collection
    #[serde(default = "default_query_index")]
    pub index: IndexSpec,

    /// IVF partitions probed per search
    #[serde(default = "default_nprobe")]
    pub nprobe: usize,

    /// Number of hits returned per search
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Copies of the query embedding seeded into a fresh collection
    #[serde(default = "default_seed_copies")]
    pub seed_copies: usize,
}

/// Configuration for the document source and its index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Folder holding the documents (PDF, text, markdown)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Chunk size in estimated tokens
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in estimated tokens
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Prefix for document collections (one per source)
    #[serde(default = "default_document_prefix")]
    pub collection_prefix: String,

    /// Index built over document chunks
    #[serde(default = "default_document_index")]
    pub index: IndexSpec,
}

/// Configuration for the answering service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnsweringConfig {
    /// Optional JSON file with static answers (built-in answers otherwise)
    #[serde(default)]
    pub static_answers_path: Option<PathBuf>,

    /// Chunks retrieved per query
    #[serde(default = "default_similarity_top_k")]
    pub similarity_top_k: usize,

    /// Token budget for retrieved context
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Token budget of the conversation memory
    #[serde(default = "default_memory_token_limit")]
    pub memory_token_limit: usize,

    /// Persona instructions given to the model
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Token estimation method
    #[serde(default)]
    pub token_estimator: TokenEstimator,
}

/// Token estimation methods
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TokenEstimator {
    CharacterBased { chars_per_token: f32 },
    WordBased { words_per_token: f32 },
}

impl Default for TokenEstimator {
    fn default() -> Self {
        TokenEstimator::CharacterBased { chars_per_token: 4.0 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            path: None,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            collection_prefix: default_document_prefix(),
            index: default_document_index(),
        }
    }
}

impl Default for AnsweringConfig {
    fn default() -> Self {
        Self {
            static_answers_path: None,
            similarity_top_k: default_similarity_top_k(),
            max_context_tokens: default_max_context_tokens(),
            memory_token_limit: default_memory_token_limit(),
            system_prompt: default_system_prompt(),
            token_estimator: TokenEstimator::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_batch_size() -> usize { 32 }
fn default_timeout() -> u64 { 30 }
fn default_cache_enabled() -> bool { true }
fn default_cache_ttl() -> u64 { 3600 }
fn default_cache_size() -> usize { 1000 }
fn default_generation_model() -> String { "mistralai/Mistral-7B-Instruct-v0.3".to_string() }
fn default_temperature() -> f32 { 0.1 }
fn default_max_tokens() -> u32 { 512 }
fn default_generation_timeout() -> u64 { 120 }
fn default_vector_db_url() -> String { "http://localhost:6334".to_string() }
fn default_collection_name() -> String { "query_embeddings".to_string() }
fn default_nprobe() -> usize { 10 }
fn default_search_limit() -> usize { 5 }
fn default_seed_copies() -> usize { 10 }
fn default_chunk_size() -> usize { 512 }
fn default_chunk_overlap() -> usize { 20 }
fn default_document_prefix() -> String { "documents".to_string() }
fn default_similarity_top_k() -> usize { 2 }
fn default_max_context_tokens() -> usize { 3000 }
fn default_memory_token_limit() -> usize { 3000 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

fn default_query_index() -> IndexSpec {
    IndexSpec {
        index_type: IndexType::IvfFlat,
        metric_type: MetricType::Ip,
        params: IndexParams { nlist: 128 },
    }
}

fn default_document_index() -> IndexSpec {
    IndexSpec {
        index_type: IndexType::Flat,
        metric_type: MetricType::Cosine,
        params: IndexParams::default(),
    }
}

pub(crate) fn default_system_prompt() -> String {
    "You are a professional career and personal development coach. \
     Provide clear, actionable advice with empathy and practical insights. \
     If a query is unclear, ask clarifying questions."
        .to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let config = loader::load_config(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let config = loader::load_config_with_env(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Validate this configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        validation::validate_config(self)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self {
            embedding: EmbeddingConfig {
                api_url: "https://api.openai.com/v1/embeddings".to_string(),
                api_token: Secret::new(std::env::var("EMBEDDING_API_TOKEN").unwrap_or_default()),
                model: Some("text-embedding-3-small".to_string()),
                batch_size: default_batch_size(),
                timeout_secs: default_timeout(),
                cache_enabled: default_cache_enabled(),
                cache_ttl_secs: default_cache_ttl(),
                cache_size: default_cache_size(),
            },
            generation: GenerationConfig {
                api_url: "https://router.huggingface.co/v1/chat/completions".to_string(),
                api_token: Secret::new(std::env::var("HF_API_KEY").unwrap_or_default()),
                model: default_generation_model(),
                temperature: default_temperature(),
                max_tokens: default_max_tokens(),
                timeout_secs: default_generation_timeout(),
            },
            vector_db: VectorDbConfig {
                backend: VectorBackend::default(),
                url: default_vector_db_url(),
                api_key: None,
                timeout_secs: default_timeout(),
                collection_name: default_collection_name(),
                index: default_query_index(),
                nprobe: default_nprobe(),
                search_limit: default_search_limit(),
                seed_copies: default_seed_copies(),
            },
            documents: DocumentsConfig::default(),
            answering: AnsweringConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Custom serializer for Secret<String>
fn serialize_secret<S>(secret: &Secret<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}

/// Custom deserializer for Secret<String>
fn deserialize_secret<'de, D>(deserializer: D) -> Result<Secret<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(Secret::new(s))
}

fn serialize_optional_secret<S>(secret: &Option<Secret<String>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.map(Secret::new))
}
