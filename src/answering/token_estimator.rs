//! Token estimation utilities

use crate::config::TokenEstimator as TokenEstimatorConfig;

/// Approximate token counts without a tokenizer
#[derive(Debug, Clone, Copy)]
pub struct TokenEstimator {
    config: TokenEstimatorConfig,
}

impl TokenEstimator {
    pub fn new(config: TokenEstimatorConfig) -> Self {
        Self { config }
    }

    /// Estimate token count for text
    pub fn estimate(&self, text: &str) -> usize {
        match self.config {
            TokenEstimatorConfig::CharacterBased { chars_per_token } => {
                let char_count = text.chars().count();
                (char_count as f32 / chars_per_token).ceil() as usize
            }
            TokenEstimatorConfig::WordBased { words_per_token } => {
                let word_count = text.split_whitespace().count();
                (word_count as f32 / words_per_token).ceil() as usize
            }
        }
    }

    /// Estimate a single word, never less than one token
    pub fn estimate_word(&self, word: &str) -> usize {
        match self.config {
            TokenEstimatorConfig::CharacterBased { .. } => self.estimate(word).max(1),
            TokenEstimatorConfig::WordBased { words_per_token } => {
                (1.0 / words_per_token).ceil().max(1.0) as usize
            }
        }
    }

    /// Characters that fit in `tokens`, when estimation is character-based
    pub fn chars_for_tokens(&self, tokens: usize) -> Option<usize> {
        match self.config {
            TokenEstimatorConfig::CharacterBased { chars_per_token } => {
                Some((tokens as f32 * chars_per_token).floor() as usize)
            }
            TokenEstimatorConfig::WordBased { .. } => None,
        }
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(TokenEstimatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_based_estimation() {
        let estimator = TokenEstimator::new(TokenEstimatorConfig::CharacterBased { chars_per_token: 4.0 });

        // 11 chars / 4 = 2.75
        assert_eq!(estimator.estimate("Hello world"), 3);
        assert_eq!(estimator.estimate(""), 0);
    }

    #[test]
    fn test_word_based_estimation() {
        let estimator = TokenEstimator::new(TokenEstimatorConfig::WordBased { words_per_token: 1.3 });

        assert_eq!(estimator.estimate("Hello world test"), 3);
        assert_eq!(estimator.estimate_word("Hello"), 1);
        assert_eq!(estimator.chars_for_tokens(10), None);
    }

    #[test]
    fn test_chars_for_tokens() {
        let estimator = TokenEstimator::new(TokenEstimatorConfig::CharacterBased { chars_per_token: 4.0 });

        assert_eq!(estimator.chars_for_tokens(512), Some(2048));
    }
}
