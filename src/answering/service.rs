//! Static-first, retrieval-augmented answering

use super::models::{Answer, AnswerOrigin, AnswerStage, ChatMessage};
use super::pipeline::AnsweringPipeline;
use super::prompt::{collect_sources, context_passages, pack_context};
use super::session::ChatSession;
use super::static_answers::StaticAnswers;
use super::token_estimator::TokenEstimator;
use crate::config::{AnsweringConfig, GenerationConfig};
use crate::documents::DocumentIndex;
use crate::embedding::EmbeddingProvider;
use crate::error::{AnswerError, Result};
use crate::generation::{GenerationProvider, GenerationRequest};
use crate::observability::MetricsCollector;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Answers queries from static answers first, then from documents plus the model.
///
/// Per query: `CHECK_CACHE → CACHE_HIT | RETRIEVE → GENERATE → DONE`.
pub struct RetrievalAnsweringService {
    static_answers: Arc<StaticAnswers>,
    retrieval: Option<AnsweringPipeline<Arc<DocumentIndex>>>,
    generator: Arc<dyn GenerationProvider>,
    config: AnsweringConfig,
    temperature: f32,
    max_tokens: u32,
    estimator: TokenEstimator,
    metrics: Arc<MetricsCollector>,
}

impl RetrievalAnsweringService {
    /// `index` is `None` (or empty) when no documents were loaded; the service
    /// then serves static answers only.
    pub fn new(
        static_answers: Arc<StaticAnswers>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        index: Option<Arc<DocumentIndex>>,
        config: AnsweringConfig,
        generation: &GenerationConfig,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new());
        let retrieval = index.filter(|i| !i.is_empty()).map(|index| {
            AnsweringPipeline::new(embedder, index).with_metrics(metrics.clone())
        });

        if retrieval.is_none() {
            warn!("No documents indexed; serving static answers only");
        }

        Self {
            static_answers,
            retrieval,
            generator,
            estimator: TokenEstimator::new(config.token_estimator),
            config,
            temperature: generation.temperature,
            max_tokens: generation.max_tokens,
            metrics,
        }
    }

    /// New session sized for this service's memory budget
    pub fn new_session(&self) -> ChatSession {
        ChatSession::new(self.config.memory_token_limit, self.estimator)
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn has_index(&self) -> bool {
        self.retrieval.is_some()
    }

    fn enter(session: &ChatSession, stage: AnswerStage) {
        debug!("Session {} entering {}", session.id, stage);
    }

    /// Answer one query within `session`.
    ///
    /// On embedding or generation failure the user turn stays in the log
    /// without an assistant turn, and memory is left as it was.
    pub async fn answer(&self, session: &mut ChatSession, query: &str) -> Result<Answer> {
        if query.trim().is_empty() {
            return Err(AnswerError::EmptyQuery.into());
        }
        self.metrics.record_query();

        Self::enter(session, AnswerStage::CheckCache);
        if let Some(entry) = self.static_answers.get(query) {
            Self::enter(session, AnswerStage::CacheHit);
            self.metrics.record_cache_hit();

            session.record(ChatMessage::user(query));
            session.record(ChatMessage::assistant(entry.answer.clone()));

            info!("Answered from static answers");
            Self::enter(session, AnswerStage::Done);
            return Ok(Answer {
                text: entry.answer.clone(),
                sources: entry.sources.clone(),
                origin: AnswerOrigin::Static,
            });
        }
        self.metrics.record_cache_miss();

        let retrieval = match &self.retrieval {
            Some(retrieval) => retrieval,
            None => {
                warn!("Query needs retrieval but no document index is available");
                return Err(AnswerError::NoIndexAvailable.into());
            }
        };

        Self::enter(session, AnswerStage::Retrieve);
        session.record(ChatMessage::user(query));

        let chunks = retrieval.run(query).await.map_err(|e| {
            error!("Retrieval failed: {}", e);
            e
        })?;
        let packed = pack_context(&chunks, self.config.max_context_tokens, &self.estimator);
        debug!("Retrieved {} chunks, {} used as context", chunks.len(), packed.len());

        Self::enter(session, AnswerStage::Generate);
        let request = GenerationRequest {
            system_prompt: self.config.system_prompt.clone(),
            history: session.memory().turns(),
            prompt: query.to_string(),
            context: context_passages(packed),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let text = match self.generator.generate(request).await {
            Ok(text) => text,
            Err(e) => {
                self.metrics.record_generation_failure();
                error!("Generation failed: {}", e);
                return Err(e);
            }
        };

        session.record(ChatMessage::assistant(text.clone()));
        session.remember(ChatMessage::user(query));
        session.remember(ChatMessage::assistant(text.clone()));

        Self::enter(session, AnswerStage::Done);
        Ok(Answer {
            text,
            sources: collect_sources(packed),
            origin: AnswerOrigin::Generated,
        })
    }
}
