//! Context packing for generation prompts

use super::token_estimator::TokenEstimator;
use crate::documents::RetrievedChunk;
use tracing::debug;

/// The leading chunks that fit in `max_tokens`, best first.
///
/// Stops at the first chunk that would exceed the budget.
pub fn pack_context<'a>(
    chunks: &'a [RetrievedChunk],
    max_tokens: usize,
    estimator: &TokenEstimator,
) -> &'a [RetrievedChunk] {
    let mut used = 0;

    for (packed, retrieved) in chunks.iter().enumerate() {
        let tokens = estimator.estimate(&retrieved.chunk.text);
        if used + tokens > max_tokens {
            debug!(
                "Context budget reached: {} of {} tokens used, {} passages dropped",
                used,
                max_tokens,
                chunks.len() - packed
            );
            return &chunks[..packed];
        }
        used += tokens;
    }

    chunks
}

/// Passage texts to send as context
pub fn context_passages(chunks: &[RetrievedChunk]) -> Vec<String> {
    chunks.iter().map(|r| r.chunk.text.clone()).collect()
}

/// Sources of the retrieved chunks, deduplicated in retrieval order
pub fn collect_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for retrieved in chunks {
        if !sources.contains(&retrieved.chunk.source) {
            sources.push(retrieved.chunk.source.clone());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenEstimator as TokenEstimatorConfig;
    use crate::documents::Chunk;

    fn retrieved(source: &str, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                source: source.to_string(),
                text: text.to_string(),
                position: 0,
            },
            score: 1.0,
        }
    }

    #[test]
    fn test_pack_context_respects_budget() {
        let estimator = TokenEstimator::new(TokenEstimatorConfig::WordBased { words_per_token: 1.0 });
        let chunks = vec![
            retrieved("a.txt", "one two three"),
            retrieved("b.txt", "four five six"),
            retrieved("c.txt", "seven"),
        ];

        assert_eq!(context_passages(pack_context(&chunks, 4, &estimator)), vec!["one two three"]);
        assert_eq!(pack_context(&chunks, 100, &estimator).len(), 3);
        assert!(pack_context(&chunks, 2, &estimator).is_empty());
    }

    #[test]
    fn test_sources_follow_packed_chunks() {
        let estimator = TokenEstimator::new(TokenEstimatorConfig::WordBased { words_per_token: 1.0 });
        let chunks = vec![retrieved("short.md", "tiny"), retrieved("long.md", "a b c d e f")];

        let packed = pack_context(&chunks, 3, &estimator);
        assert_eq!(collect_sources(packed), vec!["short.md"]);
    }

    #[test]
    fn test_sources_deduplicated_in_order() {
        let chunks = vec![
            retrieved("b.pdf", "x"),
            retrieved("a.pdf", "y"),
            retrieved("b.pdf", "z"),
        ];

        assert_eq!(collect_sources(&chunks), vec!["b.pdf", "a.pdf"]);
    }
}
