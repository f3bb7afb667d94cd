//! Configuration validation

use super::*;
use crate::error::{CoachError, Result};

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_embedding_config(&config.embedding)?;
    validate_generation_config(&config.generation)?;
    validate_vector_db_config(&config.vector_db)?;
    validate_documents_config(&config.documents)?;
    validate_answering_config(&config.answering)?;

    // Qdrant fixes the distance per collection at creation time
    if config.vector_db.backend == VectorBackend::Qdrant
        && config.documents.index.metric_type != config.vector_db.index.metric_type
    {
        return Err(CoachError::Config(format!(
            "documents index metric {} must match vector_db index metric {} on the qdrant backend",
            config.documents.index.metric_type, config.vector_db.index.metric_type
        )));
    }

    Ok(())
}

fn validate_url(name: &str, url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(CoachError::Config(format!("{} URL cannot be empty", name)));
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(CoachError::Config(format!(
            "{} URL must start with http:// or https://",
            name
        )));
    }

    Ok(())
}

fn validate_timeout(name: &str, timeout_secs: u64) -> Result<()> {
    if timeout_secs == 0 {
        return Err(CoachError::Config(format!("{} timeout must be greater than 0", name)));
    }

    if timeout_secs > 600 {
        return Err(CoachError::Config(format!(
            "{} timeout too large (max: 600 seconds)",
            name
        )));
    }

    Ok(())
}

fn validate_index(name: &str, index: &IndexSpec) -> Result<()> {
    if index.index_type == IndexType::IvfFlat && index.params.nlist == 0 {
        return Err(CoachError::Config(format!(
            "{} index: nlist must be greater than 0 for IVF_FLAT",
            name
        )));
    }
    Ok(())
}

/// Validate embedding configuration
fn validate_embedding_config(config: &EmbeddingConfig) -> Result<()> {
    validate_url("Embedding API", &config.api_url)?;

    if config.api_token.expose_secret().is_empty() {
        return Err(CoachError::Config(
            "Embedding API token is required".to_string()
        ));
    }

    if config.batch_size == 0 {
        return Err(CoachError::Config(
            "Embedding batch size must be greater than 0".to_string()
        ));
    }

    if config.batch_size > 1000 {
        return Err(CoachError::Config(
            "Embedding batch size too large (max: 1000)".to_string()
        ));
    }

    validate_timeout("Embedding", config.timeout_secs)?;

    if config.cache_enabled {
        if config.cache_size == 0 {
            return Err(CoachError::Config(
                "Cache size must be greater than 0 when cache is enabled".to_string()
            ));
        }

        if config.cache_ttl_secs == 0 {
            return Err(CoachError::Config(
                "Cache TTL must be greater than 0 when cache is enabled".to_string()
            ));
        }
    }

    Ok(())
}

/// Validate generation configuration
fn validate_generation_config(config: &GenerationConfig) -> Result<()> {
    validate_url("Generation API", &config.api_url)?;

    if config.api_token.expose_secret().is_empty() {
        return Err(CoachError::Config(
            "Generation API token is required".to_string()
        ));
    }

    if config.model.trim().is_empty() {
        return Err(CoachError::Config("Generation model cannot be empty".to_string()));
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(CoachError::Config(format!(
            "Temperature must be between 0.0 and 2.0, got {}",
            config.temperature
        )));
    }

    if config.max_tokens == 0 {
        return Err(CoachError::Config(
            "Generation max_tokens must be greater than 0".to_string()
        ));
    }

    validate_timeout("Generation", config.timeout_secs)
}

/// Validate vector database configuration
fn validate_vector_db_config(config: &VectorDbConfig) -> Result<()> {
    if config.backend == VectorBackend::Qdrant {
        validate_url("Vector database", &config.url)?;
    }

    validate_timeout("Vector database", config.timeout_secs)?;

    if config.collection_name.trim().is_empty() {
        return Err(CoachError::Config(
            "Collection name cannot be empty".to_string()
        ));
    }

    validate_index("Query collection", &config.index)?;

    if config.nprobe == 0 {
        return Err(CoachError::Config("nprobe must be greater than 0".to_string()));
    }

    if config.search_limit == 0 {
        return Err(CoachError::Config(
            "Search limit must be greater than 0".to_string()
        ));
    }

    if config.seed_copies == 0 {
        return Err(CoachError::Config(
            "Seed copies must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate document configuration
fn validate_documents_config(config: &DocumentsConfig) -> Result<()> {
    if config.chunk_size == 0 {
        return Err(CoachError::Config("Chunk size must be greater than 0".to_string()));
    }

    if config.chunk_overlap >= config.chunk_size {
        return Err(CoachError::Config(format!(
            "Chunk overlap ({}) must be smaller than chunk size ({})",
            config.chunk_overlap, config.chunk_size
        )));
    }

    if config.collection_prefix.trim().is_empty() {
        return Err(CoachError::Config(
            "Document collection prefix cannot be empty".to_string()
        ));
    }

    validate_index("Document collection", &config.index)
}

/// Validate answering configuration
fn validate_answering_config(config: &AnsweringConfig) -> Result<()> {
    if config.similarity_top_k == 0 {
        return Err(CoachError::Config(
            "similarity_top_k must be greater than 0".to_string()
        ));
    }

    if config.max_context_tokens == 0 {
        return Err(CoachError::Config(
            "Max context tokens must be greater than 0".to_string()
        ));
    }

    if config.memory_token_limit == 0 {
        return Err(CoachError::Config(
            "Memory token limit must be greater than 0".to_string()
        ));
    }

    match config.token_estimator {
        TokenEstimator::CharacterBased { chars_per_token } if chars_per_token <= 0.0 => {
            return Err(CoachError::Config(
                "chars_per_token must be positive".to_string()
            ));
        }
        TokenEstimator::WordBased { words_per_token } if words_per_token <= 0.0 => {
            return Err(CoachError::Config(
                "words_per_token must be positive".to_string()
            ));
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default_config();
        config.embedding.api_token = Secret::new("embed".to_string());
        config.generation.api_token = Secret::new("generate".to_string());
        config
    }

    #[test]
    fn test_validate_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_empty_token() {
        let mut config = valid_config();
        config.generation.api_token = Secret::new(String::new());

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_overlap_larger_than_chunk() {
        let mut config = valid_config();
        config.documents.chunk_size = 20;
        config.documents.chunk_overlap = 20;

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_ivf_without_partitions() {
        let mut config = valid_config();
        config.vector_db.index.params.nlist = 0;

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_qdrant_requires_http_url() {
        let mut config = valid_config();
        config.vector_db.backend = VectorBackend::Qdrant;
        config.vector_db.url = "localhost:6334".to_string();

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_qdrant_requires_single_metric() {
        let mut config = valid_config();
        config.vector_db.backend = VectorBackend::Qdrant;
        config.vector_db.index.metric_type = MetricType::Ip;
        config.documents.index.metric_type = MetricType::Cosine;
        assert!(validate_config(&config).is_err());

        config.documents.index.metric_type = MetricType::Ip;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_temperature_range() {
        let mut config = valid_config();
        config.generation.temperature = 3.5;

        assert!(validate_config(&config).is_err());
    }
}
