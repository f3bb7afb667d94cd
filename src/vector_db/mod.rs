//! Vector collections: backends, lifecycle, ingestion and similarity search

pub mod client;
pub mod collection;
pub mod index;
pub mod ingestion;
pub mod memory;
pub mod models;
pub mod search;

pub use client::VectorDbClient;
pub use collection::CollectionManager;
pub use ingestion::IngestionPipeline;
pub use memory::InMemoryVectorStore;
pub use models::{
    Collection, CollectionInfo, CollectionSchema, CollectionState, IndexParams, IndexSpec,
    IndexType, InsertOutcome, MetricType, SearchHit, SearchParams, VectorId,
};
pub use search::{SearchEngine, SearchQueryBuilder};

use async_trait::async_trait;
use crate::config::{VectorBackend, VectorDbConfig};
use crate::error::Result;
use std::sync::Arc;

/// Primitive operations a vector store backend exposes.
///
/// Backends keep the collection lifecycle (`Unindexed → Indexed → Loaded`) and
/// reject operations that skip a step. Dimension checks are also enforced here
/// so that a batch is never partially written.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check whether a collection exists
    async fn has_collection(&self, name: &str) -> Result<bool>;

    /// Create a new, unindexed collection
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()>;

    /// Drop a collection and everything stored in it
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Describe a collection, `None` if it does not exist
    async fn describe_collection(&self, name: &str) -> Result<Option<CollectionInfo>>;

    /// Insert vectors, returning the ids assigned in input order
    async fn insert(&self, collection: &str, vectors: Vec<Vec<f32>>) -> Result<Vec<VectorId>>;

    /// Delete vectors by id, returning how many existed
    async fn delete(&self, collection: &str, ids: &[VectorId]) -> Result<usize>;

    /// Build (or replace) the collection index
    async fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<()>;

    /// Make an indexed collection searchable
    async fn load_collection(&self, collection: &str) -> Result<()>;

    /// Rank stored vectors against a query
    async fn search(&self, collection: &str, params: SearchParams) -> Result<Vec<SearchHit>>;
}

/// Connect to the backend selected in configuration
pub async fn connect(config: &VectorDbConfig) -> Result<Arc<dyn VectorStore>> {
    match config.backend {
        VectorBackend::Memory => Ok(Arc::new(InMemoryVectorStore::new())),
        VectorBackend::Qdrant => Ok(Arc::new(VectorDbClient::new(config.clone()).await?)),
    }
}
