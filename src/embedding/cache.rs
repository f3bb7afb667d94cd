//! In-memory cache of computed embeddings, keyed by text hash

use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Statistics about cache performance
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Async embedding cache backed by moka
pub struct EmbeddingCache {
    cache: Cache<String, Vec<f32>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    /// Create a new cache with specified capacity and TTL
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        info!("Initializing embedding cache with max_size={}, ttl={:?}", max_size, ttl);

        let cache = Cache::builder()
            .max_capacity(max_size as u64)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache key for a text (the text itself is never stored as key)
    pub fn key_for(text: &str) -> String {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        format!("emb_{:x}", hasher.finish())
    }

    /// Get embedding from cache
    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = Self::key_for(text);
        let result = self.cache.get(&key).await;

        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Embedding cache hit for key: {}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        result
    }

    /// Store embedding in cache
    pub async fn put(&self, text: &str, embedding: Vec<f32>) {
        self.cache.insert(Self::key_for(text), embedding).await;
    }

    /// Clear all entries
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        info!("Embedding cache cleared");
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks().await;

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            size: self.cache.entry_count() as usize,
            hits,
            misses,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_put_get() {
        let cache = EmbeddingCache::new(10, Duration::from_secs(60));
        let embedding = vec![1.0, 2.0, 3.0];

        cache.put("test", embedding.clone()).await;
        assert_eq!(cache.get("test").await, Some(embedding));
        assert_eq!(cache.get("Test").await, None);
    }

    #[tokio::test]
    async fn test_cache_ttl() {
        let cache = EmbeddingCache::new(10, Duration::from_millis(100));

        cache.put("test", vec![1.0]).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        cache.cache.run_pending_tasks().await;

        assert_eq!(cache.get("test").await, None);
    }

    #[tokio::test]
    async fn test_cache_stats() {
        let cache = EmbeddingCache::new(10, Duration::from_secs(60));

        cache.put("test", vec![1.0]).await;
        cache.get("test").await;
        cache.get("nonexistent").await;

        let stats = cache.stats().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_key_is_stable() {
        assert_eq!(EmbeddingCache::key_for("a"), EmbeddingCache::key_for("a"));
        assert_ne!(EmbeddingCache::key_for("a"), EmbeddingCache::key_for("b"));
    }
}
