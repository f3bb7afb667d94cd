//! Similarity search over loaded collections

use super::index::DEFAULT_NPROBE;
use super::models::*;
use super::VectorStore;
use crate::error::{Result, VectorDbError};
use std::sync::Arc;
use tracing::debug;

/// Builder for constructing search queries
pub struct SearchQueryBuilder {
    vector: Vec<f32>,
    limit: usize,
    nprobe: Option<usize>,
}

impl SearchQueryBuilder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            limit: 10,
            nprobe: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = Some(nprobe);
        self
    }

    pub fn build(self) -> SearchParams {
        SearchParams {
            vector: self.vector,
            limit: self.limit,
            nprobe: self.nprobe,
        }
    }
}

/// Read-only nearest-neighbour queries
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn VectorStore>,
    default_nprobe: usize,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            default_nprobe: DEFAULT_NPROBE,
        }
    }

    /// Override the number of IVF partitions scanned when a query leaves it unset
    pub fn with_default_nprobe(mut self, nprobe: usize) -> Self {
        self.default_nprobe = nprobe.max(1);
        self
    }

    /// Top `limit` hits for `query`, best first
    pub async fn search(&self, collection: &Collection, query: Vec<f32>, limit: usize) -> Result<Vec<SearchHit>> {
        self.search_with(collection, SearchParams::new(query, limit)).await
    }

    /// Search with explicit parameters
    pub async fn search_with(&self, collection: &Collection, mut params: SearchParams) -> Result<Vec<SearchHit>> {
        let info = self
            .store
            .describe_collection(&collection.name)
            .await?
            .ok_or_else(|| VectorDbError::CollectionNotFound(collection.name.clone()))?;

        if info.state != CollectionState::Loaded {
            return Err(VectorDbError::NotLoaded(collection.name.clone()).into());
        }

        if params.vector.len() != info.schema.dimension {
            return Err(VectorDbError::DimensionMismatch {
                expected: info.schema.dimension,
                actual: params.vector.len(),
            }
            .into());
        }

        if params.limit == 0 {
            return Err(VectorDbError::InvalidLimit.into());
        }

        if params.nprobe.is_none() {
            params.nprobe = Some(self.default_nprobe);
        }

        let limit = params.limit;
        let hits = self.store.search(&collection.name, params).await?;

        debug!(
            "Search on '{}' returned {} hits (limit {})",
            collection.name,
            hits.len(),
            limit
        );
        Ok(hits)
    }
}
