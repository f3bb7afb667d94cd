//! Vector index over document chunks

use super::{Chunk, DocumentSource, TextChunker};
use crate::answering::pipeline::FinalStage;
use crate::answering::token_estimator::TokenEstimator;
use crate::config::DocumentsConfig;
use crate::embedding::{EmbeddingProvider, MAX_TEXT_LEN};
use crate::error::{CoachError, Result};
use crate::vector_db::{
    Collection, CollectionManager, IngestionPipeline, SearchEngine, VectorId, VectorStore,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Texts embedded per provider call while building
const EMBED_BATCH: usize = 64;

/// Embedding calls in flight while building
const EMBED_CONCURRENCY: usize = 4;

/// A chunk returned by retrieval, with its raw similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Searchable chunks of one document source.
///
/// An index built from zero documents has no collection and retrieves nothing.
pub struct DocumentIndex {
    collection: Option<Collection>,
    chunks: HashMap<VectorId, Chunk>,
    engine: SearchEngine,
    top_k: usize,
}

impl DocumentIndex {
    pub fn is_empty(&self) -> bool {
        self.collection.is_none()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn collection(&self) -> Option<&Collection> {
        self.collection.as_ref()
    }

    /// Top `top_k` chunks for a query embedding
    pub async fn retrieve(&self, embedding: Vec<f32>, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let collection = match &self.collection {
            Some(collection) => collection,
            None => return Ok(Vec::new()),
        };

        let hits = self.engine.search(collection, embedding, top_k).await?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                self.chunks.get(&hit.id).map(|chunk| RetrievedChunk {
                    chunk: chunk.clone(),
                    score: hit.distance,
                })
            })
            .collect())
    }
}

#[async_trait]
impl FinalStage for DocumentIndex {
    type Output = Vec<RetrievedChunk>;

    async fn run(&self, embedding: Vec<f32>) -> Result<Vec<RetrievedChunk>> {
        self.retrieve(embedding, self.top_k).await
    }
}

/// Builds document indexes: load → chunk → embed → insert → index → load
#[derive(Clone)]
pub struct DocumentIndexer {
    source: Arc<dyn DocumentSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    manager: CollectionManager,
    ingestion: IngestionPipeline,
    engine: SearchEngine,
    chunker: TextChunker,
    config: DocumentsConfig,
    top_k: usize,
}

impl DocumentIndexer {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: DocumentsConfig,
        estimator: TokenEstimator,
        top_k: usize,
    ) -> Self {
        Self {
            source,
            embedder,
            manager: CollectionManager::new(store.clone()),
            ingestion: IngestionPipeline::new(store.clone()),
            engine: SearchEngine::new(store),
            chunker: TextChunker::new(config.chunk_size, config.chunk_overlap, estimator),
            config,
            top_k,
        }
    }

    /// Collection name for a source path
    pub fn collection_name(&self, path: &Path) -> String {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        format!("{}_{:016x}", self.config.collection_prefix, hasher.finish())
    }

    fn empty_index(&self) -> DocumentIndex {
        DocumentIndex {
            collection: None,
            chunks: HashMap::new(),
            engine: self.engine.clone(),
            top_k: self.top_k,
        }
    }

    pub async fn build(&self, path: &Path) -> Result<DocumentIndex> {
        let documents = self.source.load_documents(path).await?;
        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|d| self.chunker.chunk_document(d))
            .filter(|chunk| {
                let fits = chunk.text.len() <= MAX_TEXT_LEN;
                if !fits {
                    warn!(
                        "Skipping chunk {} of {}: {} bytes exceeds the embedding limit",
                        chunk.position,
                        chunk.source,
                        chunk.text.len()
                    );
                }
                fits
            })
            .collect();

        if chunks.is_empty() {
            info!("No documents found in {}, document index is empty", path.display());
            return Ok(self.empty_index());
        }

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(chunks.chunks(EMBED_BATCH))
            .map(|batch| {
                let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
                let embedder = self.embedder.clone();
                async move { embedder.embed_batch(&texts).await }
            })
            .buffered(EMBED_CONCURRENCY)
            .try_collect()
            .await?;
        let embeddings: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        debug!("Embedded {} chunks", embeddings.len());

        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        let name = self.collection_name(path);

        let _guard = self.manager.lock(&name).await;
        let collection = self.manager.ensure_collection(&name, dimension).await?;
        let outcome = self.ingestion.insert(&collection, embeddings).await?;
        self.manager.build_index(&collection, &self.config.index).await?;
        self.manager.load(&collection).await?;

        let chunks: HashMap<VectorId, Chunk> = outcome.ids.into_iter().zip(chunks).collect();
        info!(
            "Indexed {} chunks from {} documents into '{}'",
            chunks.len(),
            documents.len(),
            name
        );

        Ok(DocumentIndex {
            collection: Some(collection),
            chunks,
            engine: self.engine.clone(),
            top_k: self.top_k,
        })
    }
}

/// Document indexes built once per source path and reused afterwards
pub struct DocumentIndexCache {
    indexer: DocumentIndexer,
    cache: Cache<PathBuf, Arc<DocumentIndex>>,
}

impl DocumentIndexCache {
    pub fn new(indexer: DocumentIndexer) -> Self {
        Self {
            indexer,
            cache: Cache::builder().max_capacity(64).build(),
        }
    }

    /// Cached index for `path`, building it on first use.
    ///
    /// Concurrent callers for the same path share one build. Failed builds
    /// are not cached.
    pub async fn get_or_build(&self, path: &Path) -> Result<Arc<DocumentIndex>> {
        let key = path.to_path_buf();
        let indexer = self.indexer.clone();

        self.cache
            .try_get_with(key, async move { indexer.build(path).await.map(Arc::new) })
            .await
            .map_err(|shared: Arc<CoachError>| {
                Arc::try_unwrap(shared)
                    .unwrap_or_else(|e| CoachError::Internal(format!("document index build failed: {}", e)))
            })
    }

    pub async fn contains(&self, path: &Path) -> bool {
        self.cache.get(path).await.is_some()
    }
}
