//! Chat generation against an OpenAI-compatible completions endpoint

pub mod client;
pub mod models;

pub use client::GenerationClient;
pub use models::{ChatMessage, GenerationRequest, Role};

use async_trait::async_trait;
use crate::error::Result;

/// Trait for chat models
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Produce an answer for `request`
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}
