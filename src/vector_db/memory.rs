//! In-process vector store backend

use super::index::{self, VectorIndex, DEFAULT_NPROBE};
use super::models::*;
use super::VectorStore;
use crate::error::{Result, VectorDbError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

struct StoredCollection {
    schema: CollectionSchema,
    state: CollectionState,
    rows: BTreeMap<VectorId, Vec<f32>>,
    spec: Option<IndexSpec>,
    index: Option<VectorIndex>,
}

impl StoredCollection {
    fn info(&self) -> CollectionInfo {
        CollectionInfo {
            schema: self.schema.clone(),
            state: self.state,
            row_count: self.rows.len(),
            index: self.spec,
        }
    }
}

/// Vector store that keeps every collection in memory.
///
/// Ids come from one store-wide counter, so they are never reused, not even
/// after a collection is dropped and recreated.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, StoredCollection>>,
    next_id: AtomicU64,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        info!("Initializing in-memory vector store");
        Self {
            collections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn not_found(name: &str) -> VectorDbError {
        VectorDbError::CollectionNotFound(name.to_string())
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        if schema.dimension == 0 {
            return Err(VectorDbError::Schema("dimension must be greater than 0".to_string()).into());
        }

        let mut collections = self.collections.write().await;
        if collections.contains_key(&schema.name) {
            return Err(VectorDbError::Schema(format!(
                "collection already exists: {}",
                schema.name
            ))
            .into());
        }

        collections.insert(
            schema.name.clone(),
            StoredCollection {
                schema: schema.clone(),
                state: CollectionState::Unindexed,
                rows: BTreeMap::new(),
                spec: None,
                index: None,
            },
        );

        debug!("Collection created: {} (dim={})", schema.name, schema.dimension);
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections
            .write()
            .await
            .remove(name)
            .ok_or_else(|| Self::not_found(name))?;

        debug!("Collection dropped: {}", name);
        Ok(())
    }

    async fn describe_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        Ok(self.collections.read().await.get(name).map(StoredCollection::info))
    }

    async fn insert(&self, collection: &str, vectors: Vec<Vec<f32>>) -> Result<Vec<VectorId>> {
        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| Self::not_found(collection))?;

        let expected = stored.schema.dimension;
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(VectorDbError::DimensionMismatch {
                expected,
                actual: bad.len(),
            }
            .into());
        }

        let mut ids = Vec::with_capacity(vectors.len());
        for vector in vectors {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if let Some(index) = stored.index.as_mut() {
                index.add(id, &vector);
            }
            stored.rows.insert(id, vector);
            ids.push(id);
        }

        debug!("Inserted {} vectors into collection: {}", ids.len(), collection);
        Ok(ids)
    }

    async fn delete(&self, collection: &str, ids: &[VectorId]) -> Result<usize> {
        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| Self::not_found(collection))?;

        let mut removed = 0;
        for id in ids {
            if stored.rows.remove(id).is_some() {
                if let Some(index) = stored.index.as_mut() {
                    index.remove(*id);
                }
                removed += 1;
            }
        }

        debug!("Deleted {} vectors from collection: {}", removed, collection);
        Ok(removed)
    }

    async fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<()> {
        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| Self::not_found(collection))?;

        let index = VectorIndex::build(spec, &stored.rows)?;
        stored.index = Some(index);
        stored.spec = Some(*spec);
        // A replaced index has to be loaded again
        stored.state = CollectionState::Indexed;

        debug!(
            "Index {} ({}) built on collection: {}",
            spec.index_type.as_str(),
            spec.metric_type,
            collection
        );
        Ok(())
    }

    async fn load_collection(&self, collection: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| Self::not_found(collection))?;

        match stored.state {
            CollectionState::Unindexed => {
                Err(VectorDbError::NotIndexed(collection.to_string()).into())
            }
            CollectionState::Indexed => {
                stored.state = CollectionState::Loaded;
                debug!("Collection loaded: {}", collection);
                Ok(())
            }
            CollectionState::Loaded => Ok(()),
        }
    }

    async fn search(&self, collection: &str, params: SearchParams) -> Result<Vec<SearchHit>> {
        let collections = self.collections.read().await;
        let stored = collections
            .get(collection)
            .ok_or_else(|| Self::not_found(collection))?;

        let (vector_index, spec) = match (stored.state, stored.index.as_ref(), stored.spec.as_ref()) {
            (CollectionState::Loaded, Some(built), Some(spec)) => (built, spec),
            _ => return Err(VectorDbError::NotLoaded(collection.to_string()).into()),
        };

        if params.vector.len() != stored.schema.dimension {
            return Err(VectorDbError::DimensionMismatch {
                expected: stored.schema.dimension,
                actual: params.vector.len(),
            }
            .into());
        }

        if params.limit == 0 {
            return Err(VectorDbError::InvalidLimit.into());
        }

        let nprobe = params.nprobe.unwrap_or(DEFAULT_NPROBE);
        let mut hits: Vec<SearchHit> = vector_index
            .candidates(&params.vector, nprobe, &stored.rows)
            .into_iter()
            .filter_map(|id| {
                stored.rows.get(&id).map(|vector| SearchHit {
                    id,
                    distance: index::score(spec.metric_type, &params.vector, vector),
                })
            })
            .collect();

        rank_hits(&mut hits, spec.metric_type);
        hits.truncate(params.limit);

        debug!("Found {} results in collection: {}", hits.len(), collection);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn loaded_store(spec: IndexSpec, vectors: Vec<Vec<f32>>) -> (InMemoryVectorStore, Vec<VectorId>) {
        let store = InMemoryVectorStore::new();
        store.create_collection(&CollectionSchema::new("c", 2)).await.unwrap();
        let ids = store.insert("c", vectors).await.unwrap();
        store.create_index("c", &spec).await.unwrap();
        store.load_collection("c").await.unwrap();
        (store, ids)
    }

    #[tokio::test]
    async fn test_insert_rejects_whole_batch() {
        let store = InMemoryVectorStore::new();
        store.create_collection(&CollectionSchema::new("c", 2)).await.unwrap();

        let result = store.insert("c", vec![vec![1.0, 2.0], vec![1.0]]).await;
        assert!(result.is_err());

        let info = store.describe_collection("c").await.unwrap().unwrap();
        assert_eq!(info.row_count, 0);
    }

    #[tokio::test]
    async fn test_ids_never_reused_after_recreate() {
        let store = InMemoryVectorStore::new();
        let schema = CollectionSchema::new("c", 1);
        store.create_collection(&schema).await.unwrap();
        let first = store.insert("c", vec![vec![1.0]]).await.unwrap();

        store.drop_collection("c").await.unwrap();
        store.create_collection(&schema).await.unwrap();
        let second = store.insert("c", vec![vec![1.0]]).await.unwrap();

        assert!(second[0] > first[0]);
    }

    #[tokio::test]
    async fn test_load_requires_index() {
        let store = InMemoryVectorStore::new();
        store.create_collection(&CollectionSchema::new("c", 2)).await.unwrap();

        let err = store.load_collection("c").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoachError::VectorDb(VectorDbError::NotIndexed(_))
        ));
    }

    #[tokio::test]
    async fn test_search_orders_by_metric_then_id() {
        let (store, ids) = loaded_store(
            IndexSpec::flat(MetricType::Ip),
            vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![2.0, 0.0]],
        )
        .await;

        let hits = store.search("c", SearchParams::new(vec![1.0, 0.0], 10)).await.unwrap();
        let ranked: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ranked, vec![ids[1], ids[2], ids[0]]);
        assert_eq!(hits[0].distance, 2.0);
    }

    #[tokio::test]
    async fn test_rebuilding_index_requires_reload() {
        let (store, _) = loaded_store(IndexSpec::flat(MetricType::L2), vec![vec![1.0, 0.0]]).await;
        store.create_index("c", &IndexSpec::flat(MetricType::Ip)).await.unwrap();

        let info = store.describe_collection("c").await.unwrap().unwrap();
        assert_eq!(info.state, CollectionState::Indexed);
        assert_eq!(info.index, Some(IndexSpec::flat(MetricType::Ip)));
        assert!(store.search("c", SearchParams::new(vec![1.0, 0.0], 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_removes_from_index() {
        let (store, ids) = loaded_store(
            IndexSpec::ivf_flat(MetricType::L2, 2),
            vec![vec![0.0, 0.0], vec![5.0, 5.0]],
        )
        .await;

        assert_eq!(store.delete("c", &[ids[0], 999]).await.unwrap(), 1);

        let hits = store
            .search("c", SearchParams::new(vec![0.0, 0.0], 5).with_nprobe(2))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, ids[1]);
    }
}
