//! Embedding service for turning text into vectors via an OpenAI-compatible API

pub mod cache;
pub mod client;
pub mod models;

pub use cache::EmbeddingCache;
pub use client::{EmbeddingClient, MAX_TEXT_LEN};
pub use models::{EmbeddingInput, EmbeddingRequest, EmbeddingResponse};

use async_trait::async_trait;
use crate::error::Result;

/// Trait for embedding providers.
///
/// An embedding is never substituted: an empty response surfaces as
/// `EmbeddingError::Unavailable` and the caller aborts.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
