//! Qdrant client implementation

use super::models::*;
use super::VectorStore;
use crate::config::VectorDbConfig;
use crate::error::{Result, VectorDbError};
use async_trait::async_trait;
use dashmap::DashMap;
use qdrant_client::qdrant::vectors_config::Config;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, PointId, PointStruct,
    PointsIdsList, SearchParams as QdrantSearchParams, SearchPoints, UpsertPointsBuilder,
    VectorParamsBuilder, VectorsConfig,
};
use qdrant_client::{Qdrant, QdrantError};
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// gRPC status codes that mean the server was not reached or did not answer
const GRPC_CANCELLED: i32 = 1;
const GRPC_DEADLINE_EXCEEDED: i32 = 4;
const GRPC_UNAVAILABLE: i32 = 14;

/// Lifecycle bookkeeping Qdrant does not model itself
#[derive(Debug, Clone)]
struct CollectionMeta {
    schema: CollectionSchema,
    state: CollectionState,
    spec: Option<IndexSpec>,
}

/// Client for Qdrant vector database.
///
/// Qdrant indexes continuously and fixes the distance function when a
/// collection is created, so the distance comes from `vector_db.index` and the
/// `Unindexed → Indexed → Loaded` states are tracked here.
pub struct VectorDbClient {
    config: VectorDbConfig,
    client: Qdrant,
    collections: DashMap<String, CollectionMeta>,
    next_id: AtomicU64,
}

impl VectorDbClient {
    /// Create a new vector database client
    pub async fn new(config: VectorDbConfig) -> Result<Self> {
        info!("Connecting to Qdrant at {}", config.url);

        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.as_ref().map(|k| k.expose_secret().clone()))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorDbError::BackendUnavailable(e.to_string()))?;

        // Ids must not collide with points written by an earlier process
        let first_id = chrono::Utc::now().timestamp_micros().max(1) as u64;

        Ok(Self {
            config,
            client,
            collections: DashMap::new(),
            next_id: AtomicU64::new(first_id),
        })
    }

    fn to_qdrant_distance(metric: MetricType) -> qdrant_client::qdrant::Distance {
        match metric {
            MetricType::Ip => qdrant_client::qdrant::Distance::Dot,
            MetricType::L2 => qdrant_client::qdrant::Distance::Euclid,
            MetricType::Cosine => qdrant_client::qdrant::Distance::Cosine,
        }
    }

    fn metric(&self) -> MetricType {
        self.config.index.metric_type
    }

    fn is_unreachable(e: &QdrantError) -> bool {
        match e {
            QdrantError::ResponseError { status } => matches!(
                status.code() as i32,
                GRPC_CANCELLED | GRPC_DEADLINE_EXCEEDED | GRPC_UNAVAILABLE
            ),
            QdrantError::Io(_) | QdrantError::InvalidUri(_) => true,
            _ => false,
        }
    }

    /// Transport failures become `BackendUnavailable`, the rest go through `rejected`
    fn classify(e: QdrantError, rejected: fn(String) -> VectorDbError) -> VectorDbError {
        if Self::is_unreachable(&e) {
            VectorDbError::BackendUnavailable(e.to_string())
        } else {
            rejected(e.to_string())
        }
    }

    fn backend_error(e: QdrantError) -> VectorDbError {
        Self::classify(e, VectorDbError::Backend)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| VectorDbError::BackendUnavailable(e.to_string()).into())
    }

    async fn row_count(&self, name: &str) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(name).exact(true))
            .await
            .map_err(Self::backend_error)?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    fn meta(&self, name: &str) -> Result<CollectionMeta> {
        self.collections
            .get(name)
            .map(|m| m.clone())
            .ok_or_else(|| VectorDbError::CollectionNotFound(name.to_string()).into())
    }
}

#[async_trait]
impl VectorStore for VectorDbClient {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        self.exists(name).await
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        if schema.dimension == 0 {
            return Err(VectorDbError::Schema("dimension must be greater than 0".to_string()).into());
        }

        debug!("Creating collection: {}", schema.name);

        let vector_params =
            VectorParamsBuilder::new(schema.dimension as u64, Self::to_qdrant_distance(self.metric()))
                .build();

        self.client
            .create_collection(CreateCollectionBuilder::new(schema.name.clone()).vectors_config(
                VectorsConfig {
                    config: Some(Config::Params(vector_params)),
                },
            ))
            .await
            .map_err(|e| Self::classify(e, VectorDbError::Schema))?;

        self.collections.insert(
            schema.name.clone(),
            CollectionMeta {
                schema: schema.clone(),
                state: CollectionState::Unindexed,
                spec: None,
            },
        );

        info!("Collection created: {}", schema.name);
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        debug!("Deleting collection: {}", name);

        self.client
            .delete_collection(name)
            .await
            .map_err(Self::backend_error)?;
        self.collections.remove(name);

        info!("Collection deleted: {}", name);
        Ok(())
    }

    async fn describe_collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        if !self.exists(name).await? {
            self.collections.remove(name);
            return Ok(None);
        }

        let row_count = self.row_count(name).await?;
        let info = match self.collections.get(name) {
            Some(meta) => CollectionInfo {
                schema: meta.schema.clone(),
                state: meta.state,
                row_count,
                index: meta.spec,
            },
            None => {
                // Created by another process: read the dimension back from Qdrant
                let remote = self
                    .client
                    .collection_info(name)
                    .await
                    .map_err(Self::backend_error)?;
                let dimension = remote
                    .result
                    .and_then(|r| r.config)
                    .and_then(|c| c.params)
                    .and_then(|p| p.vectors_config)
                    .and_then(|v| v.config)
                    .and_then(|c| match c {
                        Config::Params(params) => Some(params.size as usize),
                        Config::ParamsMap(_) => None,
                    })
                    .ok_or_else(|| {
                        VectorDbError::Schema(format!("collection {} has no single vector field", name))
                    })?;

                let schema = CollectionSchema::new(name, dimension);
                self.collections.insert(
                    name.to_string(),
                    CollectionMeta {
                        schema: schema.clone(),
                        state: CollectionState::Unindexed,
                        spec: None,
                    },
                );
                CollectionInfo {
                    schema,
                    state: CollectionState::Unindexed,
                    row_count,
                    index: None,
                }
            }
        };

        Ok(Some(info))
    }

    async fn insert(&self, collection: &str, vectors: Vec<Vec<f32>>) -> Result<Vec<VectorId>> {
        let meta = self.meta(collection)?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != meta.schema.dimension) {
            return Err(VectorDbError::DimensionMismatch {
                expected: meta.schema.dimension,
                actual: bad.len(),
            }
            .into());
        }

        debug!("Inserting {} points into collection: {}", vectors.len(), collection);

        let mut ids = Vec::with_capacity(vectors.len());
        let points: Vec<PointStruct> = vectors
            .into_iter()
            .map(|vector| {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                ids.push(id);
                PointStruct::new(id, vector, HashMap::<String, qdrant_client::qdrant::Value>::new())
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::backend_error)?;

        debug!("Points inserted successfully");
        Ok(ids)
    }

    async fn delete(&self, collection: &str, ids: &[VectorId]) -> Result<usize> {
        self.meta(collection)?;
        if ids.is_empty() {
            return Ok(0);
        }

        debug!("Deleting {} points from collection: {}", ids.len(), collection);

        let before = self.row_count(collection).await?;
        let point_ids: Vec<PointId> = ids.iter().map(|id| PointId::from(*id)).collect();

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList { ids: point_ids })
                    .wait(true),
            )
            .await
            .map_err(Self::backend_error)?;

        let after = self.row_count(collection).await?;
        Ok(before.saturating_sub(after))
    }

    async fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<()> {
        if spec.metric_type != self.metric() {
            return Err(VectorDbError::InvalidIndexParams(format!(
                "qdrant collections use the {} metric, {} requested",
                self.metric(),
                spec.metric_type
            ))
            .into());
        }

        let mut meta = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| VectorDbError::CollectionNotFound(collection.to_string()))?;
        meta.spec = Some(*spec);
        meta.state = CollectionState::Indexed;

        debug!("Index {} recorded for collection: {}", spec.index_type.as_str(), collection);
        Ok(())
    }

    async fn load_collection(&self, collection: &str) -> Result<()> {
        let mut meta = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| VectorDbError::CollectionNotFound(collection.to_string()))?;

        match meta.state {
            CollectionState::Unindexed => Err(VectorDbError::NotIndexed(collection.to_string()).into()),
            _ => {
                meta.state = CollectionState::Loaded;
                Ok(())
            }
        }
    }

    async fn search(&self, collection: &str, params: SearchParams) -> Result<Vec<SearchHit>> {
        let meta = self.meta(collection)?;
        if meta.state != CollectionState::Loaded {
            return Err(VectorDbError::NotLoaded(collection.to_string()).into());
        }
        if params.vector.len() != meta.schema.dimension {
            return Err(VectorDbError::DimensionMismatch {
                expected: meta.schema.dimension,
                actual: params.vector.len(),
            }
            .into());
        }
        if params.limit == 0 {
            return Err(VectorDbError::InvalidLimit.into());
        }

        debug!("Searching in collection: {} with limit: {}", collection, params.limit);

        let exact = meta
            .spec
            .map(|s| s.index_type == IndexType::Flat)
            .unwrap_or(true);

        let search_points = SearchPoints {
            collection_name: collection.to_string(),
            vector: params.vector,
            limit: params.limit as u64,
            params: Some(QdrantSearchParams {
                exact: Some(exact),
                ..Default::default()
            }),
            ..Default::default()
        };

        let response = self
            .client
            .search_points(search_points)
            .await
            .map_err(Self::backend_error)?;

        let metric = self.metric();
        let mut hits: Vec<SearchHit> = response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = match point.id?.point_id_options? {
                    qdrant_client::qdrant::point_id::PointIdOptions::Num(num) => num,
                    qdrant_client::qdrant::point_id::PointIdOptions::Uuid(_) => return None,
                };
                // Qdrant reports the Euclidean distance itself, not its square
                let distance = match metric {
                    MetricType::L2 => point.score * point.score,
                    _ => point.score,
                };
                Some(SearchHit { id, distance })
            })
            .collect();

        rank_hits(&mut hits, metric);
        debug!("Found {} results", hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::CoachError;

    fn qdrant_config() -> VectorDbConfig {
        let mut config = Config::default_config().vector_db;
        config.backend = crate::config::VectorBackend::Qdrant;
        config
    }

    #[test]
    fn test_distance_mapping() {
        assert_eq!(
            VectorDbClient::to_qdrant_distance(MetricType::Ip),
            qdrant_client::qdrant::Distance::Dot
        );
        assert_eq!(
            VectorDbClient::to_qdrant_distance(MetricType::L2),
            qdrant_client::qdrant::Distance::Euclid
        );
    }

    #[test]
    fn test_transport_failures_are_unavailable() {
        let io = QdrantError::Io(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"));
        assert!(matches!(
            VectorDbClient::classify(io, VectorDbError::Schema),
            VectorDbError::BackendUnavailable(_)
        ));

        let rejected = QdrantError::ConversionError("bad vector".to_string());
        assert!(matches!(
            VectorDbClient::classify(rejected, VectorDbError::Schema),
            VectorDbError::Schema(_)
        ));
    }

    #[tokio::test]
    #[ignore] // Connects to a closed local port
    async fn test_create_collection_on_unreachable_server() {
        let mut config = qdrant_config();
        config.url = "http://127.0.0.1:1".to_string();
        config.timeout_secs = 2;
        let client = VectorDbClient::new(config).await.unwrap();

        let err = client
            .create_collection(&CollectionSchema::new("unreachable", 3))
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert!(matches!(err, CoachError::VectorDb(VectorDbError::BackendUnavailable(_))));
    }

    #[tokio::test]
    #[ignore] // Requires Qdrant to be running
    async fn test_qdrant_lifecycle() {
        let client = VectorDbClient::new(qdrant_config()).await.unwrap();
        let schema = CollectionSchema::new("coach_rag_lifecycle_test", 3);

        if client.has_collection(&schema.name).await.unwrap() {
            client.drop_collection(&schema.name).await.unwrap();
        }
        client.create_collection(&schema).await.unwrap();

        let ids = client
            .insert(&schema.name, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]])
            .await
            .unwrap();
        assert!(client
            .search(&schema.name, SearchParams::new(vec![1.0, 0.0, 0.0], 1))
            .await
            .is_err());

        client
            .create_index(&schema.name, &IndexSpec::ivf_flat(MetricType::Ip, 128))
            .await
            .unwrap();
        client.load_collection(&schema.name).await.unwrap();

        let hits = client
            .search(&schema.name, SearchParams::new(vec![1.0, 0.0, 0.0], 2))
            .await
            .unwrap();
        assert_eq!(hits[0].id, ids[0]);

        client.drop_collection(&schema.name).await.unwrap();
    }
}
