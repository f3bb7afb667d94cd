//! Document loading, chunking and the document index used for retrieval

pub mod chunker;
pub mod index;
pub mod loader;

pub use chunker::TextChunker;
pub use index::{DocumentIndex, DocumentIndexCache, DocumentIndexer, RetrievedChunk};
pub use loader::FolderSource;

use async_trait::async_trait;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Text extracted from one file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// File name the text came from
    pub source: String,
    pub text: String,
}

/// A piece of a document small enough to embed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub source: String,
    pub text: String,
    /// Position of the chunk within its document
    pub position: usize,
}

/// Where documents come from
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load every readable document under `path`
    async fn load_documents(&self, path: &Path) -> Result<Vec<Document>>;
}
