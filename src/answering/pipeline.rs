//! Embed-then-stage pipelines
//!
//! Both the query similarity search and document retrieval start by embedding
//! the query text; what happens to the embedding is the final stage.

use crate::config::VectorDbConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{AnswerError, Result};
use crate::observability::MetricsCollector;
use crate::vector_db::{
    CollectionManager, IngestionPipeline, SearchEngine, SearchHit, SearchQueryBuilder, VectorStore,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// What a pipeline does with a query embedding
#[async_trait]
pub trait FinalStage: Send + Sync {
    type Output: Send;

    async fn run(&self, embedding: Vec<f32>) -> Result<Self::Output>;
}

#[async_trait]
impl<S: FinalStage + ?Sized> FinalStage for Arc<S> {
    type Output = S::Output;

    async fn run(&self, embedding: Vec<f32>) -> Result<S::Output> {
        self.as_ref().run(embedding).await
    }
}

/// `embed → stage`
pub struct AnsweringPipeline<S: FinalStage> {
    embedder: Arc<dyn EmbeddingProvider>,
    stage: S,
    metrics: Option<Arc<MetricsCollector>>,
}

impl<S: FinalStage> AnsweringPipeline<S> {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, stage: S) -> Self {
        Self {
            embedder,
            stage,
            metrics: None,
        }
    }

    /// Record embedding and stage latencies
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    /// Embed `query` and hand the vector to the final stage.
    ///
    /// An embedding failure stops the pipeline; no fallback vector is used.
    pub async fn run(&self, query: &str) -> Result<S::Output> {
        if query.trim().is_empty() {
            return Err(AnswerError::EmptyQuery.into());
        }

        let started = Instant::now();
        let embedding = self.embedder.embed_single(query).await?;
        let embedded_in = started.elapsed();
        debug!(
            "Embedded query into {} dimensions in {:?}",
            embedding.len(),
            embedded_in
        );

        let started = Instant::now();
        let output = self.stage.run(embedding).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_embedding_latency(embedded_in);
            metrics.record_search_latency(started.elapsed());
        }
        output
    }
}

/// Rebuilds the query collection around the query embedding and ranks it.
///
/// Runs `ensure → insert copies → index → load → search` under the
/// collection's write lock. Every run replaces whatever the collection held.
pub struct RankStage {
    manager: CollectionManager,
    ingestion: IngestionPipeline,
    engine: SearchEngine,
    config: VectorDbConfig,
}

impl RankStage {
    pub fn new(store: Arc<dyn VectorStore>, config: VectorDbConfig) -> Self {
        Self {
            manager: CollectionManager::new(store.clone()),
            ingestion: IngestionPipeline::new(store.clone()),
            engine: SearchEngine::new(store).with_default_nprobe(config.nprobe),
            config,
        }
    }

    pub fn manager(&self) -> &CollectionManager {
        &self.manager
    }
}

#[async_trait]
impl FinalStage for RankStage {
    type Output = Vec<SearchHit>;

    async fn run(&self, embedding: Vec<f32>) -> Result<Vec<SearchHit>> {
        let name = self.config.collection_name.as_str();
        let _guard = self.manager.lock(name).await;

        let collection = self.manager.ensure_collection(name, embedding.len()).await?;

        let seed = vec![embedding.clone(); self.config.seed_copies.max(1)];
        let outcome = self.ingestion.insert(&collection, seed).await?;
        info!("Inserted {} copies of the query embedding into '{}'", outcome.inserted, name);

        self.manager.build_index(&collection, &self.config.index).await?;
        self.manager.load(&collection).await?;

        let params = SearchQueryBuilder::new(embedding)
            .limit(self.config.search_limit)
            .nprobe(self.config.nprobe)
            .build();
        self.engine.search_with(&collection, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::{CoachError, EmbeddingError};
    use crate::vector_db::InMemoryVectorStore;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed_single(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }
    }

    struct EmptyEmbedder;

    #[async_trait]
    impl EmbeddingProvider for EmptyEmbedder {
        async fn embed_single(&self, _text: &str) -> Result<Vec<f32>> {
            Err(EmbeddingError::Unavailable("no segment".to_string()).into())
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(EmbeddingError::Unavailable("no segment".to_string()).into())
        }
    }

    fn rank_stage() -> RankStage {
        RankStage::new(
            Arc::new(InMemoryVectorStore::new()),
            Config::default_config().vector_db,
        )
    }

    #[tokio::test]
    async fn test_rank_stage_returns_seeded_copies() {
        let embedding = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        let pipeline = AnsweringPipeline::new(Arc::new(FixedEmbedder(embedding.clone())), rank_stage());

        let hits = pipeline.run("How do I grow?").await.unwrap();
        let expected: f32 = embedding.iter().map(|x| x * x).sum();

        assert_eq!(hits.len(), 5);
        assert!(hits.iter().all(|h| (h.distance - expected).abs() < 1e-6));
        assert!(hits.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_rank_stage_replaces_previous_query() {
        let stage = rank_stage();
        stage.run(vec![1.0, 0.0]).await.unwrap();
        stage.run(vec![0.0, 1.0, 0.0]).await.unwrap();

        let info = stage.manager().describe("query_embeddings").await.unwrap();
        assert_eq!(info.schema.dimension, 3);
        assert_eq!(info.row_count, 10);
    }

    #[tokio::test]
    async fn test_embedding_failure_stops_pipeline() {
        let stage = rank_stage();
        let pipeline = AnsweringPipeline::new(Arc::new(EmptyEmbedder), stage);

        let err = pipeline.run("hello").await.unwrap_err();
        assert!(matches!(err, CoachError::Embedding(EmbeddingError::Unavailable(_))));
        assert!(pipeline
            .stage()
            .manager()
            .describe("query_embeddings")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let pipeline = AnsweringPipeline::new(Arc::new(FixedEmbedder(vec![1.0])), rank_stage());
        let err = pipeline.run("  ").await.unwrap_err();
        assert!(matches!(err, CoachError::Answer(AnswerError::EmptyQuery)));
    }
}
