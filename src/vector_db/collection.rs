//! Collection lifecycle: create/recreate, index, load

use super::models::*;
use super::VectorStore;
use crate::error::{Result, VectorDbError};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Owns creation, indexing and loading of collections.
///
/// `ensure_collection` is destructive. Callers that run the
/// ensure → insert → index → load sequence hold [`CollectionManager::lock`]
/// for the collection name across the whole sequence.
#[derive(Clone)]
pub struct CollectionManager {
    store: Arc<dyn VectorStore>,
    write_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl CollectionManager {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            write_locks: Arc::new(DashMap::new()),
        }
    }

    /// Backend this manager drives
    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Acquire the write lock for a collection name
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .write_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    fn validate_schema(name: &str, dimension: usize) -> Result<()> {
        if name.trim().is_empty() {
            return Err(VectorDbError::Schema("collection name cannot be empty".to_string()).into());
        }
        if dimension == 0 {
            return Err(VectorDbError::Schema(format!(
                "dimension must be greater than 0 for collection {}",
                name
            ))
            .into());
        }
        Ok(())
    }

    /// Drop any collection called `name` and create it again bound to `dimension`.
    ///
    /// Everything previously stored under the name is discarded.
    pub async fn ensure_collection(&self, name: &str, dimension: usize) -> Result<Collection> {
        Self::validate_schema(name, dimension)?;

        if self.store.has_collection(name).await? {
            self.store.drop_collection(name).await?;
            info!("Dropped existing collection '{}'", name);
        }

        let schema = CollectionSchema::new(name, dimension)
            .with_description(format!("auto-id embeddings of dimension {}", dimension));
        self.store.create_collection(&schema).await?;

        info!("Created collection '{}' with dimension {}", name, dimension);
        Ok(Collection::from(&schema))
    }

    /// Keep an existing collection whose dimension already matches, rebuild otherwise
    pub async fn reset_if_schema_changed(&self, name: &str, dimension: usize) -> Result<Collection> {
        Self::validate_schema(name, dimension)?;

        if let Some(info) = self.store.describe_collection(name).await? {
            if info.schema.dimension == dimension {
                debug!(
                    "Collection '{}' already has dimension {} ({} rows, {}), keeping it",
                    name,
                    dimension,
                    info.row_count,
                    info.state.as_str()
                );
                return Ok(Collection::from(&info.schema));
            }

            info!(
                "Collection '{}' dimension changed from {} to {}, rebuilding",
                name, info.schema.dimension, dimension
            );
        }

        self.ensure_collection(name, dimension).await
    }

    /// Build (or replace) the index of a collection
    pub async fn build_index(&self, collection: &Collection, spec: &IndexSpec) -> Result<()> {
        if spec.index_type == IndexType::IvfFlat && spec.params.nlist == 0 {
            return Err(VectorDbError::InvalidIndexParams(
                "nlist must be greater than 0".to_string(),
            )
            .into());
        }

        self.store.create_index(&collection.name, spec).await?;
        info!(
            "Index {} ({}) created on collection '{}'",
            spec.index_type.as_str(),
            spec.metric_type,
            collection.name
        );
        Ok(())
    }

    /// Make an indexed collection searchable
    pub async fn load(&self, collection: &Collection) -> Result<()> {
        let info = self.describe(&collection.name).await?;
        if info.state == CollectionState::Unindexed {
            return Err(VectorDbError::NotIndexed(collection.name.clone()).into());
        }

        self.store.load_collection(&collection.name).await?;
        info!("Collection '{}' loaded into memory", collection.name);
        Ok(())
    }

    /// Describe an existing collection
    pub async fn describe(&self, name: &str) -> Result<CollectionInfo> {
        self.store
            .describe_collection(name)
            .await?
            .ok_or_else(|| VectorDbError::CollectionNotFound(name.to_string()).into())
    }

    /// Drop a collection if it exists; returns whether it existed
    pub async fn drop_collection(&self, name: &str) -> Result<bool> {
        if !self.store.has_collection(name).await? {
            return Ok(false);
        }
        self.store.drop_collection(name).await?;
        info!("Dropped collection '{}'", name);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoachError;
    use crate::vector_db::InMemoryVectorStore;

    fn manager() -> CollectionManager {
        CollectionManager::new(Arc::new(InMemoryVectorStore::new()))
    }

    #[tokio::test]
    async fn test_ensure_rejects_zero_dimension() {
        let err = manager().ensure_collection("c", 0).await.unwrap_err();
        assert!(matches!(err, CoachError::VectorDb(VectorDbError::Schema(_))));
    }

    #[tokio::test]
    async fn test_ensure_always_rebuilds() {
        let manager = manager();
        let collection = manager.ensure_collection("c", 3).await.unwrap();
        manager.store().insert("c", vec![vec![1.0, 2.0, 3.0]]).await.unwrap();

        let again = manager.ensure_collection("c", 3).await.unwrap();
        assert_eq!(again, collection);

        let info = manager.describe("c").await.unwrap();
        assert_eq!(info.row_count, 0);
        assert_eq!(info.state, CollectionState::Unindexed);
    }

    #[tokio::test]
    async fn test_reset_keeps_matching_schema() {
        let manager = manager();
        manager.ensure_collection("c", 2).await.unwrap();
        manager.store().insert("c", vec![vec![1.0, 2.0]]).await.unwrap();

        manager.reset_if_schema_changed("c", 2).await.unwrap();
        assert_eq!(manager.describe("c").await.unwrap().row_count, 1);

        let rebuilt = manager.reset_if_schema_changed("c", 4).await.unwrap();
        assert_eq!(rebuilt.dimension, 4);
        assert_eq!(manager.describe("c").await.unwrap().row_count, 0);
    }

    #[tokio::test]
    async fn test_load_before_index_fails() {
        let manager = manager();
        let collection = manager.ensure_collection("c", 2).await.unwrap();

        let err = manager.load(&collection).await.unwrap_err();
        assert!(matches!(err, CoachError::VectorDb(VectorDbError::NotIndexed(_))));
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let manager = manager();
        let collection = manager.ensure_collection("c", 2).await.unwrap();

        manager
            .build_index(&collection, &IndexSpec::ivf_flat(MetricType::Ip, 128))
            .await
            .unwrap();
        assert_eq!(manager.describe("c").await.unwrap().state, CollectionState::Indexed);

        manager.load(&collection).await.unwrap();
        assert_eq!(manager.describe("c").await.unwrap().state, CollectionState::Loaded);
    }

    #[tokio::test]
    async fn test_lock_serializes_same_name() {
        let manager = manager();
        let guard = manager.lock("c").await;

        let contender = manager.clone();
        let handle = tokio::spawn(async move {
            let _guard = contender.lock("c").await;
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        drop(guard);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_missing_collection() {
        assert!(!manager().drop_collection("missing").await.unwrap());
    }
}
