//! Wire models for embedding requests and responses

use serde::{Deserialize, Serialize};

/// Request to generate embeddings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Input text(s) to embed
    pub input: EmbeddingInput,

    /// Model name, omitted when the endpoint serves a single model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Input variants for embedding requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

/// Response from embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// Generated embeddings
    #[serde(default)]
    pub data: Vec<EmbeddingData>,

    /// Model used for generation
    #[serde(default)]
    pub model: Option<String>,
}

/// Individual embedding data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingData {
    /// Embedding vector
    pub embedding: Vec<f32>,

    /// Index in the batch
    #[serde(default)]
    pub index: usize,
}

impl EmbeddingRequest {
    /// Create a request for a single text
    pub fn single(text: impl Into<String>, model: Option<String>) -> Self {
        Self {
            input: EmbeddingInput::Single(text.into()),
            model,
        }
    }

    /// Create a request for multiple texts
    pub fn batch(texts: Vec<String>, model: Option<String>) -> Self {
        Self {
            input: EmbeddingInput::Batch(texts),
            model,
        }
    }
}

impl EmbeddingResponse {
    /// Embeddings ordered by their batch index
    pub fn into_ordered(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|d| d.index);
        self.data.into_iter().map(|d| d.embedding).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_request_shape() {
        let request = EmbeddingRequest::single("hello", None);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["input"], "hello");
        assert!(json.get("model").is_none());
    }

    #[test]
    fn test_response_reordered_by_index() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"embedding":[2.0],"index":1},{"embedding":[1.0],"index":0}]}"#,
        )
        .unwrap();

        assert_eq!(response.into_ordered(), vec![vec![1.0], vec![2.0]]);
    }
}
