//! Per-user chat session

use super::memory::ConversationMemory;
use super::models::ChatMessage;
use super::token_estimator::TokenEstimator;
use uuid::Uuid;

/// The visible message log plus the memory window fed to the model
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: Uuid,
    messages: Vec<ChatMessage>,
    memory: ConversationMemory,
}

impl ChatSession {
    pub fn new(memory_token_limit: usize, estimator: TokenEstimator) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            memory: ConversationMemory::new(memory_token_limit, estimator),
        }
    }

    /// Full message log, oldest first
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub(crate) fn record(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub(crate) fn remember(&mut self, message: ChatMessage) {
        self.memory.push(message);
    }

    /// Forget everything, keeping the session id
    pub fn reset(&mut self) {
        self.messages.clear();
        self.memory.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_and_memory_are_separate() {
        let mut session = ChatSession::new(100, TokenEstimator::default());
        session.record(ChatMessage::user("hi"));
        session.record(ChatMessage::assistant("hello"));
        session.remember(ChatMessage::user("hi"));

        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.memory().len(), 1);

        let id = session.id;
        session.reset();
        assert!(session.messages().is_empty());
        assert!(session.memory().is_empty());
        assert_eq!(session.id, id);
    }
}
