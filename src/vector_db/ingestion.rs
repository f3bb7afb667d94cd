//! Vector ingestion with dimensional checks

use super::models::*;
use super::VectorStore;
use crate::error::{Result, VectorDbError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Inserts batches of vectors into a collection
#[derive(Clone)]
pub struct IngestionPipeline {
    store: Arc<dyn VectorStore>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Insert a non-empty batch. Any vector of the wrong dimension rejects the batch.
    pub async fn insert(&self, collection: &Collection, vectors: Vec<Vec<f32>>) -> Result<InsertOutcome> {
        if vectors.is_empty() {
            return Err(VectorDbError::EmptyBatch.into());
        }

        if let Some((position, bad)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != collection.dimension)
        {
            warn!(
                "Rejecting batch of {} for '{}': vector {} has dimension {}",
                vectors.len(),
                collection.name,
                position,
                bad.len()
            );
            return Err(VectorDbError::DimensionMismatch {
                expected: collection.dimension,
                actual: bad.len(),
            }
            .into());
        }

        let ids = self.store.insert(&collection.name, vectors).await?;
        debug!("Inserted {} embeddings into '{}'", ids.len(), collection.name);

        Ok(InsertOutcome {
            inserted: ids.len(),
            ids,
        })
    }

    /// Delete vectors by id; returns how many were present
    pub async fn delete(&self, collection: &Collection, ids: &[VectorId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.store.delete(&collection.name, ids).await
    }
}
