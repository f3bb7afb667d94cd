//! Token-bounded conversation memory

use super::models::{ChatMessage, Role};
use super::token_estimator::TokenEstimator;
use std::collections::VecDeque;
use tracing::debug;

/// Recent conversation turns, bounded by an estimated token budget.
///
/// The oldest turns are evicted first, and the window never starts with an
/// assistant turn. A single turn larger than the budget empties the window.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    turns: VecDeque<ChatMessage>,
    token_limit: usize,
    estimator: TokenEstimator,
    tokens: usize,
}

impl ConversationMemory {
    pub fn new(token_limit: usize, estimator: TokenEstimator) -> Self {
        Self {
            turns: VecDeque::new(),
            token_limit,
            estimator,
            tokens: 0,
        }
    }

    /// Append a turn, then evict from the front until the budget holds
    pub fn push(&mut self, message: ChatMessage) {
        self.tokens += self.estimator.estimate(&message.content);
        self.turns.push_back(message);

        let mut evicted = 0;
        while self.tokens > self.token_limit
            || self.turns.front().map(|m| m.role == Role::Assistant).unwrap_or(false)
        {
            match self.turns.pop_front() {
                Some(oldest) => {
                    self.tokens -= self.estimator.estimate(&oldest.content);
                    evicted += 1;
                }
                None => break,
            }
        }

        if evicted > 0 {
            debug!("Evicted {} turns from conversation memory", evicted);
        }
    }

    /// Turns in the window, oldest first
    pub fn turns(&self) -> Vec<ChatMessage> {
        self.turns.iter().cloned().collect()
    }

    pub fn token_count(&self) -> usize {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.tokens = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenEstimator as TokenEstimatorConfig;

    fn memory(limit: usize) -> ConversationMemory {
        ConversationMemory::new(
            limit,
            TokenEstimator::new(TokenEstimatorConfig::WordBased { words_per_token: 1.0 }),
        )
    }

    #[test]
    fn test_keeps_turns_within_budget() {
        let mut memory = memory(10);
        memory.push(ChatMessage::user("one two"));
        memory.push(ChatMessage::assistant("three four"));

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.token_count(), 4);
    }

    #[test]
    fn test_evicts_oldest_pair_first() {
        let mut memory = memory(5);
        memory.push(ChatMessage::user("a b"));
        memory.push(ChatMessage::assistant("c d"));
        memory.push(ChatMessage::user("e f"));

        // dropping the user turn would leave an assistant turn in front
        let turns = memory.turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "e f");
        assert_eq!(memory.token_count(), 2);
    }

    #[test]
    fn test_oversized_turn_empties_window() {
        let mut memory = memory(2);
        memory.push(ChatMessage::user("far too many words here"));

        assert!(memory.is_empty());
        assert_eq!(memory.token_count(), 0);
    }
}
