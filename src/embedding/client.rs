//! Embedding client for OpenAI-compatible embedding endpoints

use super::{models::*, EmbeddingCache, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Longest text accepted for a single embedding, in bytes
pub const MAX_TEXT_LEN: usize = 32_768;

/// Client for generating embeddings over HTTP
pub struct EmbeddingClient {
    config: EmbeddingConfig,
    http_client: Client,
    cache: Option<Arc<EmbeddingCache>>,
}

impl EmbeddingClient {
    /// Create a new embedding client
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(EmbeddingError::NetworkError)?;

        Self::with_http_client(config, http_client)
    }

    /// Create client with custom HTTP client
    pub fn with_http_client(config: EmbeddingConfig, http_client: Client) -> Result<Self> {
        let cache = if config.cache_enabled {
            Some(Arc::new(EmbeddingCache::new(
                config.cache_size,
                Duration::from_secs(config.cache_ttl_secs),
            )))
        } else {
            None
        };

        info!(
            "Initialized embedding client for {} with cache_enabled={}",
            config.api_url, config.cache_enabled
        );

        Ok(Self {
            config,
            http_client,
            cache,
        })
    }

    /// Share an existing cache
    pub fn with_cache(mut self, cache: Arc<EmbeddingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn validate_text(text: &str) -> Result<()> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Text cannot be empty".to_string()).into());
        }
        if text.len() > MAX_TEXT_LEN {
            return Err(EmbeddingError::InvalidInput(format!(
                "Text too long: {} bytes (max {})",
                text.len(),
                MAX_TEXT_LEN
            ))
            .into());
        }
        Ok(())
    }

    /// Single request, no retries
    async fn send(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        debug!("Making embedding API request");

        let response = self
            .http_client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_token.expose_secret()))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(EmbeddingError::NetworkError)?;

        let status = response.status();

        match status {
            StatusCode::OK => {
                let embedding_response: EmbeddingResponse = response
                    .json()
                    .await
                    .map_err(EmbeddingError::NetworkError)?;

                debug!("Received {} embeddings", embedding_response.data.len());
                Ok(embedding_response)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("Embedding API authentication failed");
                Err(EmbeddingError::AuthenticationFailed.into())
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Embedding API rate limit exceeded");
                Err(EmbeddingError::RateLimitExceeded.into())
            }
            _ => {
                let error_text = response.text().await.unwrap_or_default();
                error!("Embedding request failed with status {}: {}", status, error_text);
                Err(EmbeddingError::ApiError(format!("Status {}: {}", status, error_text)).into())
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        Self::validate_text(text)?;

        if let Some(cache) = &self.cache {
            if let Some(embedding) = cache.get(text).await {
                return Ok(embedding);
            }
        }

        let request = EmbeddingRequest::single(text, self.config.model.clone());
        let embedding = self
            .send(&request)
            .await?
            .into_ordered()
            .into_iter()
            .next()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| EmbeddingError::Unavailable("no embedding returned".to_string()))?;

        if let Some(cache) = &self.cache {
            cache.put(text, embedding.clone()).await;
        }

        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(EmbeddingError::InvalidInput("Texts cannot be empty".to_string()).into());
        }
        for text in texts {
            Self::validate_text(text)?;
        }

        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut pending: Vec<usize> = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let cached = match &self.cache {
                Some(cache) => cache.get(text).await,
                None => None,
            };
            match cached {
                Some(embedding) => results[i] = Some(embedding),
                None => pending.push(i),
            }
        }

        for chunk in pending.chunks(self.config.batch_size.max(1)) {
            let batch: Vec<String> = chunk.iter().map(|&i| texts[i].clone()).collect();
            debug!("Fetching {} uncached embeddings", batch.len());

            let embeddings = self
                .send(&EmbeddingRequest::batch(batch, self.config.model.clone()))
                .await?
                .into_ordered();

            if embeddings.len() != chunk.len() || embeddings.iter().any(|e| e.is_empty()) {
                return Err(EmbeddingError::Unavailable(format!(
                    "expected {} embeddings, received {}",
                    chunk.len(),
                    embeddings.iter().filter(|e| !e.is_empty()).count()
                ))
                .into());
            }

            for (&i, embedding) in chunk.iter().zip(embeddings) {
                if let Some(cache) = &self.cache {
                    cache.put(&texts[i], embedding.clone()).await;
                }
                results[i] = Some(embedding);
            }
        }

        results
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| EmbeddingError::Unavailable("missing embedding".to_string()).into())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoachError;

    fn config(url: String) -> EmbeddingConfig {
        EmbeddingConfig {
            api_url: url,
            api_token: secrecy::Secret::new("test-token".to_string()),
            model: Some("test-model".to_string()),
            batch_size: 2,
            timeout_secs: 5,
            cache_enabled: true,
            cache_ttl_secs: 60,
            cache_size: 100,
        }
    }

    #[tokio::test]
    async fn test_embed_single_uses_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[0.1,0.2,0.3],"index":0}],"model":"test-model"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = EmbeddingClient::new(config(format!("{}/v1/embeddings", server.url()))).unwrap();

        let first = client.embed_single("hello").await.unwrap();
        let second = client.embed_single("hello").await.unwrap();

        assert_eq!(first, vec![0.1, 0.2, 0.3]);
        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_response_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let client = EmbeddingClient::new(config(server.url())).unwrap();
        let err = client.embed_single("hello").await.unwrap_err();

        assert!(matches!(err, CoachError::Embedding(EmbeddingError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/auth").with_status(401).create_async().await;
        server.mock("POST", "/busy").with_status(429).create_async().await;

        let client = EmbeddingClient::new(config(format!("{}/auth", server.url()))).unwrap();
        let err = client.embed_single("hello").await.unwrap_err();
        assert!(matches!(err, CoachError::Embedding(EmbeddingError::AuthenticationFailed)));

        let client = EmbeddingClient::new(config(format!("{}/busy", server.url()))).unwrap();
        let err = client.embed_single("hello").await.unwrap_err();
        assert!(matches!(err, CoachError::Embedding(EmbeddingError::RateLimitExceeded)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_embed_batch_splits_requests() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[1.0],"index":0},{"embedding":[2.0],"index":1}]}"#)
            .expect(2)
            .create_async()
            .await;

        let client = EmbeddingClient::new(config(server.url())).unwrap();
        let texts: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let embeddings = client.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 4);
        assert_eq!(embeddings[2], vec![1.0]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let client = EmbeddingClient::new(config("http://localhost:1".to_string())).unwrap();
        let err = client.embed_single("").await.unwrap_err();
        assert!(matches!(err, CoachError::Embedding(EmbeddingError::InvalidInput(_))));
    }
}
