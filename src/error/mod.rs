//! Error types for the search and answering system

use thiserror::Error;

/// Result type alias for coach-rag operations
pub type Result<T> = std::result::Result<T, CoachError>;

/// Main error type for the search and answering system
#[derive(Error, Debug)]
pub enum CoachError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector database error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Answering error: {0}")]
    Answer(#[from] AnswerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoachError {
    /// Whether the failure came from an unreachable or misbehaving collaborator
    /// rather than from a skipped lifecycle step.
    pub fn is_transient(&self) -> bool {
        match self {
            CoachError::Embedding(e) => !matches!(e, EmbeddingError::InvalidInput(_)),
            CoachError::Generation(_) => true,
            CoachError::VectorDb(e) => matches!(
                e,
                VectorDbError::BackendUnavailable(_) | VectorDbError::Backend(_)
            ),
            CoachError::Document(e) => matches!(e, DocumentError::Io(_)),
            _ => false,
        }
    }
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding unavailable: {0}")]
    Unavailable(String),

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication failed")]
    AuthenticationFailed,
}

/// Errors related to vector collections, ingestion and search
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Collection is not indexed: {0}")]
    NotIndexed(String),

    #[error("Collection is not loaded: {0}")]
    NotLoaded(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Insert batch is empty")]
    EmptyBatch,

    #[error("Search limit must be greater than 0")]
    InvalidLimit,

    #[error("Invalid index parameters: {0}")]
    InvalidIndexParams(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Errors related to the chat generation model
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation failed: {0}")]
    Failure(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Model returned an empty response")]
    EmptyResponse,
}

/// Errors related to loading documents
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Text extraction failed for {path}: {reason}")]
    Extraction { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the answering service
#[derive(Error, Debug)]
pub enum AnswerError {
    #[error("No document index available; only static answers can be served")]
    NoIndexAvailable,

    #[error("Query cannot be empty")]
    EmptyQuery,
}

impl From<config::ConfigError> for CoachError {
    fn from(err: config::ConfigError) -> Self {
        CoachError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let backend: CoachError = VectorDbError::BackendUnavailable("down".to_string()).into();
        let schema: CoachError = VectorDbError::Schema("dim 0".to_string()).into();
        let generation: CoachError = GenerationError::Failure("boom".to_string()).into();

        assert!(backend.is_transient());
        assert!(!schema.is_transient());
        assert!(generation.is_transient());
        assert!(!CoachError::from(AnswerError::NoIndexAvailable).is_transient());
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = VectorDbError::DimensionMismatch { expected: 5, actual: 3 };
        assert_eq!(err.to_string(), "Invalid vector dimension: expected 5, got 3");
    }
}
