//! Coach RAG - Query Similarity Search and Retrieval-Augmented Answering
//!
//! Embeds a user query, runs a nearest-neighbour search over an indexed vector
//! collection and answers coaching questions from a static answer map or by
//! retrieval-augmented generation over a folder of documents.
//!
//! ## Features
//!
//! - **Collection Lifecycle**: `Unindexed → Indexed → Loaded`, enforced by every backend
//! - **Indexes**: exhaustive FLAT and partitioned IVF_FLAT, with IP, L2 and COSINE metrics
//! - **Backends**: in-process store or Qdrant
//! - **Answering**: static answers first, then retrieval plus an OpenAI-compatible chat model
//! - **Observability**: structured logging and Prometheus-style counters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coach_rag::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_file("config.toml")?;
//!
//!     let embedder: Arc<dyn EmbeddingProvider> = Arc::new(EmbeddingClient::new(config.embedding.clone())?);
//!     let store = coach_rag::vector_db::connect(&config.vector_db).await?;
//!
//!     let pipeline = AnsweringPipeline::new(embedder, RankStage::new(store, config.vector_db.clone()));
//!     for hit in pipeline.run("How do I stay motivated?").await? {
//!         println!("{} {}", hit.id, hit.distance);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod answering;
pub mod config;
pub mod documents;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod observability;
pub mod vector_db;

pub use config::Config;
pub use error::{CoachError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::answering::{
        Answer, AnsweringPipeline, ChatSession, FinalStage, RankStage, RetrievalAnsweringService,
        StaticAnswers,
    };
    pub use crate::config::Config;
    pub use crate::documents::{DocumentIndexCache, DocumentIndexer, FolderSource};
    pub use crate::embedding::{EmbeddingClient, EmbeddingProvider};
    pub use crate::error::{CoachError, Result};
    pub use crate::generation::{GenerationClient, GenerationProvider};
    pub use crate::observability::MetricsCollector;
    pub use crate::vector_db::{
        CollectionManager, IndexSpec, IngestionPipeline, MetricType, SearchEngine, SearchHit,
        VectorStore,
    };
}
